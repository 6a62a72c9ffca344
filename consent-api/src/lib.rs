//! consent-api: Shared types for the consent-rs widget core
//!
//! This crate defines the data model shared between the consent store
//! runtime and host UI layers: the tri-state consent value, permission
//! records with their derived rendering attributes, the cookie policy,
//! and the typed partial updates consumed by `configure`.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cookie value written when a permission is accepted
pub const ACCEPTED_COOKIE_VALUE: &str = "accepted";

/// Cookie value written when a permission is declined
pub const DECLINED_COOKIE_VALUE: &str = "false";

/// Default name of the base consent cookie
pub const DEFAULT_BASE_COOKIE_NAME: &str = "gdpr";

/// CSS classes applied to every permission toggle button
pub const BUTTON_CSS_CLASSES: &str = "cc-button cc-button-switch";

/// Consent decision for a single permission or the base consent.
///
/// Replaces the stringly-typed cookie sentinels with an explicit
/// enumeration. `Unset` means no decision has been persisted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentValue {
    /// No decision persisted (absent cookie)
    #[default]
    Unset,
    /// Consent given
    Accepted,
    /// Consent withheld
    Declined,
}

impl ConsentValue {
    /// Interpret a raw cookie read.
    ///
    /// An absent cookie is `Unset`; the accepted sentinel is `Accepted`;
    /// any other stored string behaves as declined.
    ///
    /// # Example
    ///
    /// ```rust
    /// use consent_api::ConsentValue;
    ///
    /// assert_eq!(ConsentValue::from_cookie(None), ConsentValue::Unset);
    /// assert_eq!(ConsentValue::from_cookie(Some("accepted")), ConsentValue::Accepted);
    /// assert_eq!(ConsentValue::from_cookie(Some("false")), ConsentValue::Declined);
    /// ```
    pub fn from_cookie(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Unset,
            Some(ACCEPTED_COOKIE_VALUE) => Self::Accepted,
            Some(_) => Self::Declined,
        }
    }

    /// Cookie representation of this value. `Unset` has none.
    pub fn as_cookie_value(&self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::Accepted => Some(ACCEPTED_COOKIE_VALUE),
            Self::Declined => Some(DECLINED_COOKIE_VALUE),
        }
    }

    /// Whether this value is an explicit accept
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Whether any decision has been recorded
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Result of a toggle action: accepted becomes declined, anything
    /// else (declined or unset) becomes accepted.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Accepted => Self::Declined,
            _ => Self::Accepted,
        }
    }
}

/// Fixed cookie policy for a consent store.
///
/// Carries the base cookie name the store persists the global decision
/// under, the expiry applied to every cookie write, and the delay before
/// the deferred panel close fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    /// Name of the base consent cookie; permission cookies derive from it
    pub base_cookie_name: String,
    /// Expiry applied to every cookie write
    pub cookie_ttl: Duration,
    /// Delay before the deferred panel close fires
    pub panel_close_delay: Duration,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            base_cookie_name: DEFAULT_BASE_COOKIE_NAME.to_string(),
            cookie_ttl: Duration::from_secs(1000),
            panel_close_delay: Duration::from_millis(400),
        }
    }
}

impl CookiePolicy {
    /// Create a policy with a custom base cookie name
    pub fn with_base_cookie_name(name: impl Into<String>) -> Self {
        Self {
            base_cookie_name: name.into(),
            ..Self::default()
        }
    }

    /// Persistence key for a named permission: `<base>-<name>`
    pub fn cookie_key(&self, permission_name: &str) -> String {
        format!("{}-{}", self.base_cookie_name, permission_name)
    }
}

/// A single consent category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Unique identifier within the store (e.g., "analytics")
    pub name: String,

    /// Persistence key for this permission
    pub cookie_key: String,

    /// Required permissions are always treated as accepted and cannot
    /// be toggled off
    #[serde(default)]
    pub required: bool,

    /// Current consent decision
    #[serde(default)]
    pub value: ConsentValue,
}

impl Permission {
    /// Create an optional, undecided permission with the derived cookie key
    pub fn new(name: impl Into<String>, policy: &CookiePolicy) -> Self {
        let name = name.into();
        let cookie_key = policy.cookie_key(&name);
        Self {
            name,
            cookie_key,
            required: false,
            value: ConsentValue::Unset,
        }
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the current value
    pub fn with_value(mut self, value: ConsentValue) -> Self {
        self.value = value;
        self
    }

    /// UI attributes for rendering this permission's toggle button.
    ///
    /// Required permissions always render active, pressed, and disabled
    /// regardless of their stored value.
    pub fn attributes(&self) -> PermissionAttributes {
        if self.required {
            return PermissionAttributes::active(true);
        }
        if self.value.is_accepted() {
            return PermissionAttributes::active(false);
        }
        PermissionAttributes::base()
    }
}

/// Rendering attributes for a permission toggle button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionAttributes {
    /// CSS class string for the button element
    pub css_class: String,
    /// Value of the aria-pressed attribute
    pub aria_pressed: bool,
    /// Whether the button is disabled
    pub disabled: bool,
}

impl PermissionAttributes {
    /// Attributes for an unaccepted, optional permission
    pub fn base() -> Self {
        Self {
            css_class: BUTTON_CSS_CLASSES.to_string(),
            aria_pressed: false,
            disabled: false,
        }
    }

    /// Attributes for an accepted (or required) permission
    pub fn active(disabled: bool) -> Self {
        Self {
            css_class: format!("{} active", BUTTON_CSS_CLASSES),
            aria_pressed: true,
            disabled,
        }
    }
}

/// The two permissions every store starts with
pub fn default_permissions(policy: &CookiePolicy) -> Vec<Permission> {
    vec![
        Permission::new("personalization", policy),
        Permission::new("analytics", policy),
    ]
}

/// Typed partial update for a single permission.
///
/// Only the supplied fields are overwritten; absent fields keep their
/// current values. Unknown keys in host-supplied JSON are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionUpdate {
    /// Override the required flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Override the derived cookie key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_key: Option<String>,

    /// Override the current value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConsentValue>,
}

impl PermissionUpdate {
    /// Empty update (registers the permission with defaults if absent)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the required flag
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Override the cookie key
    pub fn cookie_key(mut self, key: impl Into<String>) -> Self {
        self.cookie_key = Some(key.into());
        self
    }

    /// Set the value
    pub fn value(mut self, value: ConsentValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Apply the supplied fields to an existing permission
    pub fn apply_to(&self, permission: &mut Permission) {
        if let Some(required) = self.required {
            permission.required = required;
        }
        if let Some(ref cookie_key) = self.cookie_key {
            permission.cookie_key = cookie_key.clone();
        }
        if let Some(value) = self.value {
            permission.value = value;
        }
    }
}

/// Typed configuration update for a consent store.
///
/// Permissions are merged per field: absent permissions are registered
/// with the derived cookie key, existing ones only have the supplied
/// fields overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreUpdate {
    /// Per-permission partial updates, keyed by permission name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub permissions: HashMap<String, PermissionUpdate>,

    /// Override whether the basic prompt links to the detail panel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_expand_from_basic_panel: Option<bool>,
}

impl StoreUpdate {
    /// Empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a per-permission update
    pub fn permission(mut self, name: impl Into<String>, update: PermissionUpdate) -> Self {
        self.permissions.insert(name.into(), update);
        self
    }

    /// Override the basic-panel link flag
    pub fn link_expand_from_basic_panel(mut self, link: bool) -> Self {
        self.link_expand_from_basic_panel = Some(link);
        self
    }
}
