//! Host environment settings provider
//!
//! The store copies one opaque settings blob from the host environment
//! on hydration and never inspects its shape. Hosts pick where that
//! blob comes from by implementing `HostEnvironment`.

use std::sync::Arc;

/// Trait for supplying the opaque host settings blob
pub trait HostEnvironment: Send + Sync {
    /// The settings blob to copy into the store on hydration, if any
    fn consent_settings(&self) -> Option<serde_json::Value>;
}

impl<E: HostEnvironment + ?Sized> HostEnvironment for Arc<E> {
    fn consent_settings(&self) -> Option<serde_json::Value> {
        (**self).consent_settings()
    }
}

/// Environment with a fixed settings blob
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    settings: Option<serde_json::Value>,
}

impl StaticEnvironment {
    /// Environment serving the given blob
    pub fn new(settings: serde_json::Value) -> Self {
        Self {
            settings: Some(settings),
        }
    }

    /// Environment with no settings
    pub fn empty() -> Self {
        Self { settings: None }
    }
}

impl HostEnvironment for StaticEnvironment {
    fn consent_settings(&self) -> Option<serde_json::Value> {
        self.settings.clone()
    }
}

/// Environment reading the blob from a process environment variable.
///
/// The variable is expected to hold a JSON document; an unset variable
/// or unparseable content reads as no settings.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    variable: String,
}

impl EnvSettings {
    /// Read settings from the named environment variable
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self::new("GDPR_SETTINGS")
    }
}

impl HostEnvironment for EnvSettings {
    fn consent_settings(&self) -> Option<serde_json::Value> {
        let raw = std::env::var(&self.variable).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(
                    variable = %self.variable,
                    error = %error,
                    "Ignoring unparseable consent settings"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_static_environment() {
        let environment = StaticEnvironment::new(json!({ "policy_url": "/privacy" }));
        assert_eq!(
            environment.consent_settings(),
            Some(json!({ "policy_url": "/privacy" }))
        );

        assert!(StaticEnvironment::empty().consent_settings().is_none());
    }

    #[test]
    fn test_env_settings_unset_variable() {
        let environment = EnvSettings::new("CONSENT_RS_TEST_UNSET_VARIABLE");
        assert!(environment.consent_settings().is_none());
    }
}
