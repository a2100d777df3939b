//! Key-value persistence for the portal.
//!
//! The portal keeps every collection as a JSON document under a fixed key,
//! the same layout browser local storage would hold. [`Store`] is the raw
//! string interface; the helpers in this module layer typed JSON access on
//! top of it. A value that fails to parse is logged and treated as absent
//! so a corrupted key never takes the session down with it.
//!
//! @author Shastho
//! @copyright 2025

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    BloodBankProfile, DiagnosticProfile, DoctorProfile, PatientProfile, Profile, Role,
    UserOwned,
};

/// Storage keys.
pub mod keys {
    use crate::models::Role;

    pub const CURRENT_USER: &str = "current_user";
    pub const ALL_USERS: &str = "all_users";
    pub const PATIENTS: &str = "patients";
    pub const DOCTORS: &str = "doctors";
    pub const DIAGNOSTICS: &str = "diagnostics";
    pub const BLOOD_BANKS: &str = "bloodbanks";
    pub const HOSPITALS: &str = "hospitals";
    pub const APPOINTMENTS: &str = "appointments";
    pub const PRESCRIPTIONS: &str = "prescriptions";

    /// Collection holding profiles for `role`.
    pub fn profiles(role: Role) -> &'static str {
        match role {
            Role::Patient => PATIENTS,
            Role::Doctor => DOCTORS,
            Role::Diagnostic => DIAGNOSTICS,
            Role::BloodBank => BLOOD_BANKS,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Raw string key-value store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the value under `key`, or `None` if the key was never set.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn parse_or_warn<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Discarding malformed JSON under key {}: {}", key, e);
            None
        }
    }
}

/// Loads a single JSON record.
pub async fn load_record<T: DeserializeOwned>(
    store: &dyn Store,
    key: &str,
) -> Result<Option<T>, StorageError> {
    Ok(store
        .get(key)
        .await?
        .and_then(|raw| parse_or_warn(key, &raw)))
}

pub async fn save_record<T: Serialize + Sync>(
    store: &dyn Store,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, raw).await?;
    debug!("Saved record under key {}", key);
    Ok(())
}

/// Loads a JSON list. A missing or malformed key yields an empty list.
pub async fn load_list<T: DeserializeOwned>(
    store: &dyn Store,
    key: &str,
) -> Result<Vec<T>, StorageError> {
    Ok(load_record(store, key).await?.unwrap_or_default())
}

pub async fn save_list<T: Serialize + Sync>(
    store: &dyn Store,
    key: &str,
    items: &[T],
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(items)?;
    store.set(key, raw).await?;
    debug!("Saved {} item(s) under key {}", items.len(), key);
    Ok(())
}

/// Appends one item to a list with a read-modify-write. Concurrent writers
/// to the same key can lose updates.
pub async fn push_to_list<T: Serialize + DeserializeOwned + Sync>(
    store: &dyn Store,
    key: &str,
    item: T,
) -> Result<(), StorageError> {
    let mut items: Vec<T> = load_list(store, key).await?;
    items.push(item);
    save_list(store, key, &items).await
}

/// Loads a list, writing `seed` first if the key has never been set.
pub async fn load_list_or_seed<T, F>(
    store: &dyn Store,
    key: &str,
    seed: F,
) -> Result<Vec<T>, StorageError>
where
    T: Serialize + DeserializeOwned + Sync,
    F: FnOnce() -> Vec<T>,
{
    match store.get(key).await? {
        Some(raw) => Ok(parse_or_warn(key, &raw).unwrap_or_default()),
        None => {
            let items = seed();
            save_list(store, key, &items).await?;
            debug!("Seeded key {} with {} fixture item(s)", key, items.len());
            Ok(items)
        }
    }
}

/// Rejects keys that could escape a backend's namespace.
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

async fn find_by_user<T: DeserializeOwned + UserOwned>(
    store: &dyn Store,
    role: Role,
    user_id: &str,
) -> Result<Option<T>, StorageError> {
    let profiles: Vec<T> = load_list(store, keys::profiles(role)).await?;
    Ok(profiles.into_iter().find(|p| p.owner_id() == user_id))
}

/// Looks up the first profile in `role`'s collection owned by `user_id`.
pub async fn find_profile(
    store: &dyn Store,
    role: Role,
    user_id: &str,
) -> Result<Option<Profile>, StorageError> {
    Ok(match role {
        Role::Patient => find_by_user::<PatientProfile>(store, role, user_id)
            .await?
            .map(Profile::Patient),
        Role::Doctor => find_by_user::<DoctorProfile>(store, role, user_id)
            .await?
            .map(Profile::Doctor),
        Role::Diagnostic => find_by_user::<DiagnosticProfile>(store, role, user_id)
            .await?
            .map(Profile::Diagnostic),
        Role::BloodBank => find_by_user::<BloodBankProfile>(store, role, user_id)
            .await?
            .map(Profile::BloodBank),
    })
}

/// Appends `profile` to the collection of its role.
pub async fn push_profile(store: &dyn Store, profile: Profile) -> Result<(), StorageError> {
    let key = keys::profiles(profile.role());
    match profile {
        Profile::Patient(p) => push_to_list(store, key, p).await,
        Profile::Doctor(p) => push_to_list(store, key, p).await,
        Profile::Diagnostic(p) => push_to_list(store, key, p).await,
        Profile::BloodBank(p) => push_to_list(store, key, p).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_malformed_list_falls_back_to_empty() {
        let store = MemoryStore::new();
        store.set(keys::ALL_USERS, "{not json".to_string()).await.unwrap();

        let users: Vec<crate::models::User> = load_list(&store, keys::ALL_USERS).await.unwrap();

        assert!(users.is_empty());
        assert!(logs_contain("Discarding malformed JSON under key all_users"));
    }

    #[tokio::test]
    async fn test_push_to_list_appends_in_order() {
        let store = MemoryStore::new();

        push_to_list(&store, "numbers", 1u32).await.unwrap();
        push_to_list(&store, "numbers", 2u32).await.unwrap();

        let numbers: Vec<u32> = load_list(&store, "numbers").await.unwrap();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_seed_only_when_absent() {
        let store = MemoryStore::new();

        let first: Vec<u32> = load_list_or_seed(&store, "seeded", || vec![7, 8]).await.unwrap();
        assert_eq!(first, vec![7, 8]);

        save_list(&store, "seeded", &[9u32]).await.unwrap();
        let second: Vec<u32> = load_list_or_seed(&store, "seeded", || vec![7, 8]).await.unwrap();
        assert_eq!(second, vec![9]);
    }

    #[tokio::test]
    async fn test_seed_not_reapplied_over_emptied_list() {
        let store = MemoryStore::new();
        save_list::<u32>(&store, "seeded", &[]).await.unwrap();

        let items: Vec<u32> = load_list_or_seed(&store, "seeded", || vec![1]).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let mut mock = MockStore::new();
        mock.expect_get()
            .returning(|_| Err(StorageError::Backend("unavailable".into())));

        let result: Result<Vec<u32>, _> = load_list(&mock, keys::HOSPITALS).await;
        assert!(matches!(result, Err(StorageError::Backend(_))));
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("all_users").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("../etc/passwd").is_err());
        assert!(check_key("a/b").is_err());
    }
}
