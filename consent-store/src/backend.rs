//! Cookie persistence backends
//!
//! Provides trait-based cookie storage that host applications can
//! customize. The store only depends on get/set/remove with an expiry
//! concept; any key-value store with string values satisfies the
//! contract.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use consent_api::{ConsentValue, CookiePolicy, ACCEPTED_COOKIE_VALUE, DECLINED_COOKIE_VALUE};

/// Error type for backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to read cookie store: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse cookie store: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A stored cookie entry with its expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    expires_at: DateTime<Utc>,
}

impl StoredCookie {
    fn new(value: &str, ttl: Duration) -> Self {
        let expires_at = Utc::now()
            .checked_add_signed(chrono::Duration::seconds(ttl.as_secs() as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            value: value.to_string(),
            expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Trait for cookie persistence
///
/// Host applications implement this trait to adapt the store to their
/// persistence mechanism (browser cookie jar, secure storage, a test
/// fixture). Expired entries must read back as absent.
pub trait CookieBackend: Send + Sync {
    /// Read a cookie value by key
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Write a cookie value with the given expiry
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BackendError>;

    /// Remove a cookie by key (idempotent)
    fn remove(&self, key: &str) -> Result<(), BackendError>;
}

impl<B: CookieBackend + ?Sized> CookieBackend for Arc<B> {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BackendError> {
        (**self).set(key, value, ttl)
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        (**self).remove(key)
    }
}

// ============================================================================
// In-Memory Cookie Backend
// ============================================================================

/// In-memory cookie backend for testing or session-only persistence
pub struct MemoryCookieBackend {
    data: RwLock<HashMap<String, StoredCookie>>,
}

impl MemoryCookieBackend {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of stored cookies
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Check if the backend is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().unwrap().is_empty()
    }
}

impl Default for MemoryCookieBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieBackend for MemoryCookieBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let data = self.data.read().unwrap();
        Ok(data
            .get(key)
            .filter(|cookie| !cookie.is_expired())
            .map(|cookie| cookie.value.clone()))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BackendError> {
        let mut data = self.data.write().unwrap();
        data.insert(key.to_string(), StoredCookie::new(value, ttl));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        let mut data = self.data.write().unwrap();
        data.remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryCookieBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCookieBackend")
            .field("count", &self.len())
            .finish()
    }
}

// ============================================================================
// File-based Cookie Backend
// ============================================================================

/// Persistent file data structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CookieFileData {
    version: u32,
    cookies: HashMap<String, StoredCookie>,
}

impl CookieFileData {
    fn new() -> Self {
        Self {
            version: 1,
            cookies: HashMap::new(),
        }
    }

    fn prune_expired(&mut self) {
        self.cookies.retain(|_, cookie| !cookie.is_expired());
    }
}

/// File-based cookie backend
///
/// Stores cookies in a JSON file at a configurable location. Expired
/// entries are dropped on load and never returned by `get`.
/// Default: `~/.config/<app>/cookies.json`
pub struct FileCookieBackend {
    path: PathBuf,
    data: RwLock<CookieFileData>,
}

impl FileCookieBackend {
    /// Create a new file-based backend at the specified path
    pub fn new(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref().to_path_buf();

        let mut data: CookieFileData = if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader)?
        } else {
            CookieFileData::new()
        };
        data.prune_expired();

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Create a backend in the default location for an application
    pub fn default_for_app(app_name: &str) -> Result<Self, BackendError> {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        let path = config_dir.join(app_name).join("cookies.json");
        Self::new(path)
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save data to file
    fn save(&self) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = self.data.read().unwrap();
        let file = File::create(&self.path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &*data)?;
        Ok(())
    }
}

impl CookieBackend for FileCookieBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let data = self.data.read().unwrap();
        Ok(data
            .cookies
            .get(key)
            .filter(|cookie| !cookie.is_expired())
            .map(|cookie| cookie.value.clone()))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BackendError> {
        {
            let mut data = self.data.write().unwrap();
            data.cookies
                .insert(key.to_string(), StoredCookie::new(value, ttl));
        }
        self.save()
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        {
            let mut data = self.data.write().unwrap();
            data.cookies.remove(key);
        }
        self.save()
    }
}

impl std::fmt::Debug for FileCookieBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCookieBackend")
            .field("path", &self.path)
            .finish()
    }
}

// ============================================================================
// Cookie-level helpers
// ============================================================================

/// Check whether any consent cookie exists under the key
pub fn has_consent(backend: &dyn CookieBackend, key: &str) -> Result<bool, BackendError> {
    Ok(backend.get(key)?.is_some())
}

/// Read the consent value stored under the key
pub fn consent_value(backend: &dyn CookieBackend, key: &str) -> Result<ConsentValue, BackendError> {
    Ok(ConsentValue::from_cookie(backend.get(key)?.as_deref()))
}

/// Check whether the key holds an explicit accept
pub fn is_consent_accepted(backend: &dyn CookieBackend, key: &str) -> Result<bool, BackendError> {
    Ok(backend.get(key)?.as_deref() == Some(ACCEPTED_COOKIE_VALUE))
}

/// Read the base consent decision for the given policy
pub fn basic_consent(
    backend: &dyn CookieBackend,
    policy: &CookiePolicy,
) -> Result<ConsentValue, BackendError> {
    consent_value(backend, &policy.base_cookie_name)
}

/// Persist an accept under the key with the policy's expiry
pub fn set_accepted_consent(
    backend: &dyn CookieBackend,
    key: &str,
    policy: &CookiePolicy,
) -> Result<(), BackendError> {
    backend.set(key, ACCEPTED_COOKIE_VALUE, policy.cookie_ttl)
}

/// Persist a decline under the key with the policy's expiry
pub fn set_declined_consent(
    backend: &dyn CookieBackend,
    key: &str,
    policy: &CookiePolicy,
) -> Result<(), BackendError> {
    backend.set(key, DECLINED_COOKIE_VALUE, policy.cookie_ttl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(1000);

    #[test]
    fn test_memory_backend() {
        let backend = MemoryCookieBackend::new();

        backend.set("gdpr-analytics", "accepted", TTL).unwrap();
        assert_eq!(
            backend.get("gdpr-analytics").unwrap().as_deref(),
            Some("accepted")
        );

        backend.remove("gdpr-analytics").unwrap();
        assert!(backend.get("gdpr-analytics").unwrap().is_none());

        // Removing again is fine
        backend.remove("gdpr-analytics").unwrap();
    }

    #[test]
    fn test_memory_backend_expiry() {
        let backend = MemoryCookieBackend::new();

        backend.set("gdpr", "accepted", Duration::ZERO).unwrap();
        assert!(backend.get("gdpr").unwrap().is_none());
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let backend = FileCookieBackend::new(&path).unwrap();
        backend.set("gdpr", "accepted", TTL).unwrap();

        assert!(path.exists());

        // A fresh handle on the same file sees the write
        let backend2 = FileCookieBackend::new(&path).unwrap();
        assert_eq!(backend2.get("gdpr").unwrap().as_deref(), Some("accepted"));
    }

    #[test]
    fn test_file_backend_drops_expired_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let backend = FileCookieBackend::new(&path).unwrap();
        backend.set("stale", "accepted", Duration::ZERO).unwrap();
        backend.set("fresh", "accepted", TTL).unwrap();

        let backend2 = FileCookieBackend::new(&path).unwrap();
        assert!(backend2.get("stale").unwrap().is_none());
        assert_eq!(backend2.get("fresh").unwrap().as_deref(), Some("accepted"));
    }

    #[test]
    fn test_consent_helpers() {
        let backend = MemoryCookieBackend::new();
        let policy = CookiePolicy::default();

        assert!(!has_consent(&backend, "gdpr-analytics").unwrap());
        assert_eq!(
            basic_consent(&backend, &policy).unwrap(),
            ConsentValue::Unset
        );

        set_accepted_consent(&backend, "gdpr-analytics", &policy).unwrap();
        assert!(has_consent(&backend, "gdpr-analytics").unwrap());
        assert!(is_consent_accepted(&backend, "gdpr-analytics").unwrap());

        set_declined_consent(&backend, "gdpr-analytics", &policy).unwrap();
        assert!(has_consent(&backend, "gdpr-analytics").unwrap());
        assert!(!is_consent_accepted(&backend, "gdpr-analytics").unwrap());
        assert_eq!(
            consent_value(&backend, "gdpr-analytics").unwrap(),
            ConsentValue::Declined
        );
    }
}
