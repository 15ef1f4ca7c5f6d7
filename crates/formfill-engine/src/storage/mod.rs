//! Persistence collaborator surface.
//!
//! The engine persists through a narrow key-value contract: the rule
//! collection, the default-mapping table, the floating-action-button settings
//! blob, and the image table with its quota record. Hosts back this with
//! whatever storage they have; [`MemoryStore`] is the in-memory backend used
//! for tests and single-process embedding.

mod images;
mod memory;

pub use images::{ImageError, ImageStore, StoredImage, IMAGE_QUOTA_BYTES};
pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Well-known storage keys.
pub mod keys {
    pub const RULES: &str = "formfill:rules";
    pub const DEFAULT_MAPPINGS: &str = "formfill:defaultMappings";
    pub const FAB_SETTINGS: &str = "formfill:fabSettings";
    pub const IMAGES: &str = "formfill:images";
    pub const IMAGE_QUOTA: &str = "formfill:imageQuota";
}

/// Minimal async key-value contract.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a JSON blob; absent keys come back as `None`.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON blob.
pub async fn store_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    store.set(key, serde_json::to_vec(value)?).await
}
