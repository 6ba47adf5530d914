//! Credential persistence — one JSON file per provider.
//!
//! A record is written wholesale on every save (no partial updates, no
//! locking); the last callback or refresh wins. `FileStore` is the production
//! backend, `MemoryStore` the in-memory stand-in for tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// The persisted OAuth credentials for one provider.
///
/// `token_type` and `scope` are kept as-is from the provider's token response;
/// `realm_id` is QuickBooks' company identifier, merged in from the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm_id: Option<String>,
}

/// Storage seam for credential records, so handlers and tests can swap the
/// file backend for an in-memory one.
pub trait CredentialStore: Send + Sync {
    fn load(&self, provider: &str) -> Result<Option<CredentialRecord>, AuthError>;
    fn save(&self, provider: &str, record: &CredentialRecord) -> Result<(), AuthError>;
}

/// File-based credential store: `<dir>/<provider>_tokens.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, provider: &str) -> PathBuf {
        self.dir.join(format!("{provider}_tokens.json"))
    }
}

impl CredentialStore for FileStore {
    fn load(&self, provider: &str) -> Result<Option<CredentialRecord>, AuthError> {
        let path = self.path(provider);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::Store(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let record = serde_json::from_str(&data)
            .map_err(|e| AuthError::Store(format!("failed to parse {}: {e}", path.display())))?;
        Ok(Some(record))
    }

    fn save(&self, provider: &str, record: &CredentialRecord) -> Result<(), AuthError> {
        let path = self.path(provider);
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AuthError::Store(format!("failed to create token dir: {e}")))?;

        let data = serde_json::to_string_pretty(record)
            .map_err(|e| AuthError::Store(format!("failed to serialize record: {e}")))?;
        std::fs::write(&path, &data)
            .map_err(|e| AuthError::Store(format!("failed to write {}: {e}", path.display())))?;

        // Tokens are plaintext; keep the file owner-only on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| AuthError::Store(format!("failed to chmod {}: {e}", path.display())))?;
        }

        Ok(())
    }
}

/// In-memory credential store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, CredentialRecord>>,
}

impl CredentialStore for MemoryStore {
    fn load(&self, provider: &str) -> Result<Option<CredentialRecord>, AuthError> {
        let records = self
            .records
            .lock()
            .map_err(|_| AuthError::Store("credential map poisoned".into()))?;
        Ok(records.get(provider).cloned())
    }

    fn save(&self, provider: &str, record: &CredentialRecord) -> Result<(), AuthError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| AuthError::Store("credential map poisoned".into()))?;
        records.insert(provider.to_string(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(access: &str) -> CredentialRecord {
        CredentialRecord {
            access_token: access.into(),
            refresh_token: Some("rt-1".into()),
            token_type: Some("bearer".into()),
            scope: None,
            realm_id: Some("999".into()),
        }
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let saved = record("at-1");
        store.save("quickbooks", &saved).unwrap();

        let loaded = store.load("quickbooks").unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn load_without_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load("gmail").unwrap().is_none());
    }

    #[test]
    fn save_overwrites_the_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save("quickbooks", &record("old")).unwrap();
        store.save("quickbooks", &record("new")).unwrap();

        let loaded = store.load("quickbooks").unwrap().unwrap();
        assert_eq!(loaded.access_token, "new");
    }

    #[test]
    fn absent_optional_fields_are_omitted_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store
            .save(
                "gmail",
                &CredentialRecord {
                    access_token: "at-1".into(),
                    refresh_token: None,
                    token_type: None,
                    scope: None,
                    realm_id: None,
                },
            )
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("gmail_tokens.json")).unwrap();
        assert!(raw.contains("access_token"));
        assert!(!raw.contains("realm_id"));
        assert!(!raw.contains("refresh_token"));
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::default();
        store.save("gmail", &record("at-1")).unwrap();
        assert_eq!(store.load("gmail").unwrap().unwrap().access_token, "at-1");
        assert!(store.load("quickbooks").unwrap().is_none());
    }
}
