//! Store construction for composition roots
//!
//! Provides a builder plus ready-to-use presets so host applications
//! can assemble a store without touching every collaborator.

use std::path::PathBuf;
use std::sync::Arc;

use consent_api::{CookiePolicy, StoreUpdate};

use crate::audit::{AuditSink, FileAuditSink, MemoryAuditSink, NullAuditSink};
use crate::backend::{CookieBackend, FileCookieBackend, MemoryCookieBackend};
use crate::environment::{EnvSettings, HostEnvironment, StaticEnvironment};
use crate::store::ConsentStore;

/// Error type for store construction
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to initialize cookie backend: {0}")]
    BackendInit(String),

    #[error("Failed to initialize audit sink: {0}")]
    AuditInit(String),
}

/// Builder for consent stores
///
/// # Example
///
/// ```rust,ignore
/// use consent_store::{ConsentStoreBuilder, MemoryCookieBackend};
///
/// let store = ConsentStoreBuilder::new()
///     .app_name("myapp")
///     .backend(MemoryCookieBackend::new())
///     .build()?;
/// ```
pub struct ConsentStoreBuilder {
    backend: Option<Arc<dyn CookieBackend>>,
    environment: Option<Arc<dyn HostEnvironment>>,
    audit: Option<Arc<dyn AuditSink>>,
    policy: CookiePolicy,
    app_name: Option<String>,
    update: Option<StoreUpdate>,
}

impl ConsentStoreBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            backend: None,
            environment: None,
            audit: None,
            policy: CookiePolicy::default(),
            app_name: None,
            update: None,
        }
    }

    /// Set the application name (used for default paths)
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the cookie backend
    pub fn backend(mut self, backend: impl CookieBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Set the host environment
    pub fn environment(mut self, environment: impl HostEnvironment + 'static) -> Self {
        self.environment = Some(Arc::new(environment));
        self
    }

    /// Set the audit sink
    pub fn audit(mut self, audit: impl AuditSink + 'static) -> Self {
        self.audit = Some(Arc::new(audit));
        self
    }

    /// Set the cookie policy
    pub fn policy(mut self, policy: CookiePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply a configuration update to the built store
    pub fn configure(mut self, update: StoreUpdate) -> Self {
        self.update = Some(update);
        self
    }

    /// Build the store
    pub fn build(self) -> Result<ConsentStore, BuildError> {
        let app_name = self.app_name.as_deref().unwrap_or("consent-rs");

        let backend: Arc<dyn CookieBackend> = match self.backend {
            Some(backend) => backend,
            None => {
                let backend = FileCookieBackend::default_for_app(app_name)
                    .map_err(|e| BuildError::BackendInit(e.to_string()))?;
                Arc::new(backend)
            }
        };

        let store = ConsentStore::from_parts(
            backend,
            self.environment
                .unwrap_or_else(|| Arc::new(StaticEnvironment::empty())),
            self.audit.unwrap_or_else(|| Arc::new(NullAuditSink)),
            self.policy,
        );

        if let Some(update) = self.update {
            store.configure(update);
        }

        Ok(store)
    }
}

impl Default for ConsentStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Preset Configurations
// ============================================================================

/// Preset store configurations for common use cases
pub struct ConsentPresets;

impl ConsentPresets {
    /// Durable store for a host application
    ///
    /// - File-backed cookies under the platform config directory
    /// - JSONL audit log next to them
    /// - Settings read from the `GDPR_SETTINGS` environment variable
    pub fn persistent(app_name: &str) -> Result<ConsentStore, BuildError> {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(app_name);

        let backend = FileCookieBackend::new(config_dir.join("cookies.json"))
            .map_err(|e| BuildError::BackendInit(e.to_string()))?;

        let audit = FileAuditSink::new(config_dir.join("audit.jsonl"))
            .map_err(|e| BuildError::AuditInit(e.to_string()))?;

        Ok(ConsentStore::from_parts(
            Arc::new(backend),
            Arc::new(EnvSettings::default()),
            Arc::new(audit),
            CookiePolicy::default(),
        ))
    }

    /// Testing mode (in-memory, nothing persisted across the process)
    pub fn testing() -> ConsentStore {
        ConsentStore::new(
            MemoryCookieBackend::new(),
            StaticEnvironment::empty(),
            MemoryAuditSink::new(),
            CookiePolicy::default(),
        )
    }
}
