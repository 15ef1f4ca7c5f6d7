//! Stored image table with a byte-size quota.
//!
//! Fields of value kind `image` reference entries here; at fill time the
//! image resolves to a data URL. A running byte total is kept alongside the
//! table, and saves that would push it past the quota are rejected.

use super::{keys, load_json, store_json, KeyValueStore};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::rules::types::new_id;

/// Total bytes the image table may hold.
pub const IMAGE_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// One stored image blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub id: String,
    pub name: String,
    pub mime: String,
    /// Base64-encoded payload.
    pub data: String,
    pub byte_size: u64,
}

impl StoredImage {
    /// The image as a `data:` URL, the form fill values take.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }
}

/// Error types for image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image {0} not found")]
    NotFound(String),
    #[error("Storing {requested} bytes would exceed the image quota ({used}/{quota} bytes in use)")]
    QuotaExceeded { requested: u64, used: u64, quota: u64 },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

type ImageTable = HashMap<String, StoredImage>;

/// Typed wrapper over the image table and its quota record.
#[derive(Clone)]
pub struct ImageStore {
    store: Arc<dyn KeyValueStore>,
}

impl ImageStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        ImageStore { store }
    }

    /// Save an image, enforcing the quota. Returns the stored record.
    pub async fn save(
        &self,
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: &[u8],
    ) -> Result<StoredImage, ImageError> {
        let requested = bytes.len() as u64;
        let used = self.used_bytes().await?;
        if used + requested > IMAGE_QUOTA_BYTES {
            return Err(ImageError::QuotaExceeded {
                requested,
                used,
                quota: IMAGE_QUOTA_BYTES,
            });
        }

        let image = StoredImage {
            id: new_id(),
            name: name.into(),
            mime: mime.into(),
            data: BASE64.encode(bytes),
            byte_size: requested,
        };

        let mut table = self.table().await?;
        table.insert(image.id.clone(), image.clone());
        store_json(self.store.as_ref(), keys::IMAGES, &table).await?;
        store_json(self.store.as_ref(), keys::IMAGE_QUOTA, &(used + requested)).await?;
        Ok(image)
    }

    pub async fn get(&self, id: &str) -> Result<StoredImage, ImageError> {
        self.table()
            .await?
            .remove(id)
            .ok_or_else(|| ImageError::NotFound(id.to_string()))
    }

    /// Delete an image and release its quota share.
    pub async fn delete(&self, id: &str) -> Result<(), ImageError> {
        let mut table = self.table().await?;
        let removed = table
            .remove(id)
            .ok_or_else(|| ImageError::NotFound(id.to_string()))?;
        store_json(self.store.as_ref(), keys::IMAGES, &table).await?;

        let used = self.used_bytes().await?;
        let remaining = used.saturating_sub(removed.byte_size);
        store_json(self.store.as_ref(), keys::IMAGE_QUOTA, &remaining).await?;
        Ok(())
    }

    /// The running byte total from the quota record.
    pub async fn used_bytes(&self) -> Result<u64, ImageError> {
        Ok(load_json(self.store.as_ref(), keys::IMAGE_QUOTA)
            .await?
            .unwrap_or(0))
    }

    async fn table(&self) -> Result<ImageTable, ImageError> {
        Ok(load_json(self.store.as_ref(), keys::IMAGES)
            .await?
            .unwrap_or_default())
    }
}
