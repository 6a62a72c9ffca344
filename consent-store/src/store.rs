//! The consent store
//!
//! Holds consent permissions and the global acceptance state, derives
//! UI-facing attributes, and persists decisions through the injected
//! cookie backend. The store is a cloneable handle around shared state:
//! all operations take `&self` and complete atomically with respect to
//! concurrent readers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tokio::task::JoinHandle;

use consent_api::{
    default_permissions, ConsentValue, CookiePolicy, Permission, PermissionAttributes,
    StoreUpdate, ACCEPTED_COOKIE_VALUE, DECLINED_COOKIE_VALUE,
};

use crate::audit::{AuditSink, ConsentEvent, ConsentEventType};
use crate::backend::{BackendError, CookieBackend};
use crate::environment::HostEnvironment;

/// Error type for store operations
#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("Permission not found in store: {0}")]
    PermissionNotFound(String),

    #[error("Cookie backend error: {0}")]
    Backend(#[from] BackendError),
}

struct StoreState {
    permissions: HashMap<String, Permission>,
    base_consent: ConsentValue,
    panel_expanded: bool,
    settings: Option<serde_json::Value>,
    link_expand_from_basic_panel: bool,
}

/// Consent state store.
///
/// Constructed once per application session by the composition root,
/// with the persistence backend, host environment, and audit sink
/// injected. Cloning yields another handle to the same state.
///
/// # Example
///
/// ```rust,ignore
/// use consent_store::{ConsentPresets, StoreUpdate, PermissionUpdate};
///
/// let store = ConsentPresets::testing();
/// store.configure(
///     StoreUpdate::new().permission("example", PermissionUpdate::new().required(true)),
/// );
/// store.initialize_cookies()?;
///
/// if store.should_open_basic_modal() {
///     // render the basic prompt
/// }
/// ```
#[derive(Clone)]
pub struct ConsentStore {
    state: Arc<RwLock<StoreState>>,
    backend: Arc<dyn CookieBackend>,
    environment: Arc<dyn HostEnvironment>,
    audit: Arc<dyn AuditSink>,
    policy: CookiePolicy,
    pending_close: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ConsentStore {
    /// Create a store with the default permission registry
    /// (personalization and analytics, both optional and undecided).
    pub fn new(
        backend: impl CookieBackend + 'static,
        environment: impl HostEnvironment + 'static,
        audit: impl AuditSink + 'static,
        policy: CookiePolicy,
    ) -> Self {
        Self::from_parts(
            Arc::new(backend),
            Arc::new(environment),
            Arc::new(audit),
            policy,
        )
    }

    pub(crate) fn from_parts(
        backend: Arc<dyn CookieBackend>,
        environment: Arc<dyn HostEnvironment>,
        audit: Arc<dyn AuditSink>,
        policy: CookiePolicy,
    ) -> Self {
        let permissions = default_permissions(&policy)
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();

        Self {
            state: Arc::new(RwLock::new(StoreState {
                permissions,
                base_consent: ConsentValue::Unset,
                panel_expanded: false,
                settings: None,
                link_expand_from_basic_panel: true,
            })),
            backend,
            environment,
            audit,
            policy,
            pending_close: Arc::new(Mutex::new(None)),
        }
    }

    /// The cookie policy this store persists under
    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Merge a typed configuration update into the store.
    ///
    /// Absent permissions are registered with the derived cookie key;
    /// existing ones only have the supplied fields overwritten. May be
    /// called before or after hydration.
    pub fn configure(&self, update: StoreUpdate) {
        let mut state = self.state.write().unwrap();

        if let Some(link) = update.link_expand_from_basic_panel {
            state.link_expand_from_basic_panel = link;
        }

        for (name, patch) in update.permissions {
            let permission = state
                .permissions
                .entry(name.clone())
                .or_insert_with(|| Permission::new(name.clone(), &self.policy));
            patch.apply_to(permission);
        }
    }

    /// Hydrate permission values and the base consent from the backend,
    /// and copy the host settings blob. Read-only against the backend.
    pub fn initialize_cookies(&self) -> Result<(), ConsentError> {
        let mut state = self.state.write().unwrap();

        for permission in state.permissions.values_mut() {
            let raw = self.backend.get(&permission.cookie_key)?;
            permission.value = ConsentValue::from_cookie(raw.as_deref());
        }

        let raw = self.backend.get(&self.policy.base_cookie_name)?;
        state.base_consent = ConsentValue::from_cookie(raw.as_deref());
        state.settings = self.environment.consent_settings();

        tracing::debug!(
            permissions = state.permissions.len(),
            base = ?state.base_consent,
            "Hydrated consent state from backend"
        );
        drop(state);

        self.record_audit(ConsentEvent::new(ConsentEventType::Hydrated));
        Ok(())
    }

    /// Accept every permission and persist each decision plus the base
    /// consent (N+1 backend writes).
    pub fn set_all_true(&self) -> Result<(), ConsentError> {
        let mut state = self.state.write().unwrap();

        for permission in state.permissions.values_mut() {
            permission.value = ConsentValue::Accepted;
            self.backend.set(
                &permission.cookie_key,
                ACCEPTED_COOKIE_VALUE,
                self.policy.cookie_ttl,
            )?;
        }

        state.base_consent = ConsentValue::Accepted;
        self.backend.set(
            &self.policy.base_cookie_name,
            ACCEPTED_COOKIE_VALUE,
            self.policy.cookie_ttl,
        )?;

        tracing::info!(permissions = state.permissions.len(), "All permissions accepted");
        drop(state);

        self.record_audit(ConsentEvent::new(ConsentEventType::AllAccepted));
        Ok(())
    }

    /// Decline every permission in memory only.
    ///
    /// Nothing is persisted, not even the base consent: the prompt is
    /// dismissed for this session and reopens after rehydration. The
    /// in-memory base consent is still forced to accepted so the basic
    /// modal closes.
    pub fn set_all_false(&self) {
        let mut state = self.state.write().unwrap();

        for permission in state.permissions.values_mut() {
            permission.value = ConsentValue::Declined;
        }
        state.base_consent = ConsentValue::Accepted;

        tracing::info!("All permissions declined for this session");
        drop(state);

        self.record_audit(ConsentEvent::new(ConsentEventType::AllDeclined));
    }

    /// Persist the current choices: required permissions are forced to
    /// accepted, every value is written to the backend along with the
    /// base consent, and the detail panel closes synchronously.
    pub fn save_all_cookies(&self) -> Result<(), ConsentError> {
        let mut state = self.state.write().unwrap();

        for permission in state.permissions.values_mut() {
            if permission.required {
                permission.value = ConsentValue::Accepted;
            }
            // An undecided value persists as the declined sentinel
            let value = permission
                .value
                .as_cookie_value()
                .unwrap_or(DECLINED_COOKIE_VALUE);
            self.backend
                .set(&permission.cookie_key, value, self.policy.cookie_ttl)?;
        }

        state.base_consent = ConsentValue::Accepted;
        self.backend.set(
            &self.policy.base_cookie_name,
            ACCEPTED_COOKIE_VALUE,
            self.policy.cookie_ttl,
        )?;
        state.panel_expanded = false;

        tracing::info!(permissions = state.permissions.len(), "Consent choices saved");
        drop(state);

        self.record_audit(ConsentEvent::new(ConsentEventType::Saved));
        Ok(())
    }

    /// Accept and persist every permission like [`set_all_true`], then
    /// close the detail panel after the policy's close delay.
    ///
    /// The close is a scheduled task on the runtime, not a blocking
    /// wait: the call returns with the panel still expanded. A pending
    /// close is never cancelled by later actions (last write wins on
    /// the panel flag); hosts that reopen the panel before the delay
    /// elapses can suppress the stale close with
    /// [`cancel_pending_close`].
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// [`set_all_true`]: ConsentStore::set_all_true
    /// [`cancel_pending_close`]: ConsentStore::cancel_pending_close
    pub fn save_all_cookies_slow(&self) -> Result<(), ConsentError> {
        let mut state = self.state.write().unwrap();

        for permission in state.permissions.values_mut() {
            permission.value = ConsentValue::Accepted;
            self.backend.set(
                &permission.cookie_key,
                ACCEPTED_COOKIE_VALUE,
                self.policy.cookie_ttl,
            )?;
        }

        state.base_consent = ConsentValue::Accepted;
        self.backend.set(
            &self.policy.base_cookie_name,
            ACCEPTED_COOKIE_VALUE,
            self.policy.cookie_ttl,
        )?;

        tracing::info!(
            permissions = state.permissions.len(),
            delay = ?self.policy.panel_close_delay,
            "Consent choices saved, panel close deferred"
        );
        drop(state);

        let shared = Arc::clone(&self.state);
        let delay = self.policy.panel_close_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.write().unwrap().panel_expanded = false;
            tracing::debug!("Deferred panel close fired");
        });
        *self.pending_close.lock().unwrap() = Some(handle);

        self.record_audit(ConsentEvent::new(ConsentEventType::Saved));
        Ok(())
    }

    /// Cancel a pending deferred panel close, if one is scheduled.
    ///
    /// Returns true if a close was pending. Only the most recently
    /// scheduled close can be cancelled.
    pub fn cancel_pending_close(&self) -> bool {
        match self.pending_close.lock().unwrap().take() {
            Some(handle) => {
                handle.abort();
                tracing::debug!("Pending panel close cancelled");
                true
            }
            None => false,
        }
    }

    /// Open the detail panel
    pub fn open_extend(&self) {
        self.state.write().unwrap().panel_expanded = true;
        self.record_audit(ConsentEvent::new(ConsentEventType::PanelOpened));
    }

    /// Dismiss the basic prompt and open the detail panel in one atomic
    /// update.
    pub fn open_extend_in_basic(&self) {
        {
            let mut state = self.state.write().unwrap();
            state.base_consent = ConsentValue::Accepted;
            state.panel_expanded = true;
        }
        self.record_audit(ConsentEvent::new(ConsentEventType::PanelOpened));
    }

    /// Flip the named permission between accepted and declined
    /// (an undecided permission toggles to accepted). In-memory only;
    /// nothing persists until a save action runs.
    pub fn set_toggle(&self, name: &str) -> Result<(), ConsentError> {
        let mut state = self.state.write().unwrap();

        let permission = state
            .permissions
            .get_mut(name)
            .ok_or_else(|| ConsentError::PermissionNotFound(name.to_string()))?;
        permission.value = permission.value.toggled();

        tracing::debug!(permission = %name, value = ?permission.value, "Permission toggled");
        drop(state);

        self.record_audit(ConsentEvent::new(ConsentEventType::Toggled).with_permission(name));
        Ok(())
    }

    // ========================================================================
    // Derived queries
    // ========================================================================

    /// True iff no registered permission is required
    pub fn all_permissions_are_optional(&self) -> bool {
        let state = self.state.read().unwrap();
        state.permissions.values().all(|p| !p.required)
    }

    /// True iff the base consent is anything other than accepted
    /// (covers both declined and unset).
    pub fn should_open_basic_modal(&self) -> bool {
        !self.state.read().unwrap().base_consent.is_accepted()
    }

    /// Rendering attributes for the named permission's toggle button.
    /// Unknown names yield the base (unaccepted, enabled) attributes.
    pub fn permission_attributes(&self, name: &str) -> PermissionAttributes {
        let state = self.state.read().unwrap();
        state
            .permissions
            .get(name)
            .map(|p| p.attributes())
            .unwrap_or_else(PermissionAttributes::base)
    }

    /// Whether the named permission's cookie holds an explicit accept.
    ///
    /// Reads the backend directly, bypassing the in-memory value; the
    /// backend is the source of truth for this query. Unknown names
    /// read as not accepted.
    pub fn is_permission_accepted(&self, name: &str) -> Result<bool, ConsentError> {
        let cookie_key = {
            let state = self.state.read().unwrap();
            state.permissions.get(name).map(|p| p.cookie_key.clone())
        };

        match cookie_key {
            Some(key) => Ok(self.backend.get(&key)?.as_deref() == Some(ACCEPTED_COOKIE_VALUE)),
            None => Ok(false),
        }
    }

    /// True iff any base consent decision has been recorded
    pub fn has_basic_cookie(&self) -> bool {
        self.state.read().unwrap().base_consent.is_set()
    }

    /// True iff the base consent is an explicit accept
    pub fn was_basic_cookie_accepted(&self) -> bool {
        self.state.read().unwrap().base_consent.is_accepted()
    }

    /// Whether the detail panel is currently open
    pub fn panel_expanded(&self) -> bool {
        self.state.read().unwrap().panel_expanded
    }

    /// Whether the basic prompt links to the detail panel
    pub fn link_expand_from_basic_panel(&self) -> bool {
        self.state.read().unwrap().link_expand_from_basic_panel
    }

    /// The opaque host settings blob copied on hydration
    pub fn settings(&self) -> Option<serde_json::Value> {
        self.state.read().unwrap().settings.clone()
    }

    /// Snapshot of the named permission
    pub fn permission(&self, name: &str) -> Option<Permission> {
        self.state.read().unwrap().permissions.get(name).cloned()
    }

    /// Snapshot of the named permission's value
    pub fn permission_value(&self, name: &str) -> Option<ConsentValue> {
        self.state
            .read()
            .unwrap()
            .permissions
            .get(name)
            .map(|p| p.value)
    }

    /// Snapshot of all registered permissions, sorted by name for
    /// stable rendering
    pub fn permissions(&self) -> Vec<Permission> {
        let state = self.state.read().unwrap();
        let mut permissions: Vec<Permission> = state.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        permissions
    }

    fn record_audit(&self, event: ConsentEvent) {
        if let Err(error) = self.audit.record(event) {
            tracing::warn!(error = %error, "Failed to record consent audit event");
        }
    }
}

impl std::fmt::Debug for ConsentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap();
        f.debug_struct("ConsentStore")
            .field("permissions", &state.permissions.len())
            .field("base_consent", &state.base_consent)
            .field("panel_expanded", &state.panel_expanded)
            .finish_non_exhaustive()
    }
}
