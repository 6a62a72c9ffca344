//! consent-store: Consent state store with pluggable cookie persistence
//!
//! This crate provides the state store behind a cookie consent widget:
//! per-category permissions, the global acceptance decision, derived UI
//! attributes, and persistence through an injected key-value backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         ConsentStore                             │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────────────────┐  │
//! │  │   Backend    │ │ Environment  │ │          Audit           │  │
//! │  │              │ │              │ │                          │  │
//! │  │ - Memory     │ │ - Static     │ │ - File (JSONL)           │  │
//! │  │ - File       │ │ - EnvVar     │ │ - Memory                 │  │
//! │  │              │ │              │ │ - Null                   │  │
//! │  └──────────────┘ └──────────────┘ └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use consent_store::{ConsentPresets, StoreUpdate, PermissionUpdate};
//!
//! let store = ConsentPresets::persistent("myapp")?;
//! store.configure(
//!     StoreUpdate::new().permission("marketing", PermissionUpdate::new()),
//! );
//! store.initialize_cookies()?;
//!
//! if store.should_open_basic_modal() {
//!     // render the banner; wire its buttons to store.set_all_true(),
//!     // store.set_all_false(), store.open_extend_in_basic(), ...
//! }
//! ```
//!
//! # Components
//!
//! ## Backend
//!
//! Persists consent cookies behind the [`CookieBackend`] trait:
//!
//! - [`MemoryCookieBackend`]: in-memory (testing, session only)
//! - [`FileCookieBackend`]: JSON file in the config directory
//!
//! ## Environment
//!
//! Supplies the opaque host settings blob via [`HostEnvironment`]:
//!
//! - [`StaticEnvironment`]: fixed blob
//! - [`EnvSettings`]: JSON read from a process environment variable
//!
//! ## Audit
//!
//! Records consent decisions via [`AuditSink`]:
//!
//! - [`FileAuditSink`]: JSON Lines log
//! - [`MemoryAuditSink`]: in-memory (testing)
//! - [`NullAuditSink`]: discards events

pub mod audit;
pub mod backend;
pub mod builder;
pub mod environment;
pub mod store;

// Re-exports for convenience
pub use audit::{AuditError, AuditSink, ConsentEvent, ConsentEventType};
pub use audit::{FileAuditSink, MemoryAuditSink, NullAuditSink};
pub use backend::{
    basic_consent, consent_value, has_consent, is_consent_accepted, set_accepted_consent,
    set_declined_consent,
};
pub use backend::{BackendError, CookieBackend, FileCookieBackend, MemoryCookieBackend};
pub use builder::{BuildError, ConsentPresets, ConsentStoreBuilder};
pub use environment::{EnvSettings, HostEnvironment, StaticEnvironment};
pub use store::{ConsentError, ConsentStore};

pub use consent_api::{
    default_permissions, ConsentValue, CookiePolicy, Permission, PermissionAttributes,
    PermissionUpdate, StoreUpdate, ACCEPTED_COOKIE_VALUE, BUTTON_CSS_CLASSES,
    DECLINED_COOKIE_VALUE, DEFAULT_BASE_COOKIE_NAME,
};
