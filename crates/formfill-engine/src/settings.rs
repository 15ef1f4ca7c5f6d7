//! Floating-action-button settings blob.

use crate::storage::{keys, load_json, store_json, KeyValueStore};
use serde::{Deserialize, Serialize};
use tracing::warn;

fn default_true() -> bool {
    true
}

fn default_offset() -> i32 {
    16
}

/// Screen corner the button is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FabCorner {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

/// Settings for the on-page floating action button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub corner: FabCorner,
    #[serde(default = "default_offset")]
    pub offset_x: i32,
    #[serde(default = "default_offset")]
    pub offset_y: i32,
}

impl Default for FabSettings {
    fn default() -> Self {
        FabSettings {
            enabled: true,
            corner: FabCorner::default(),
            offset_x: default_offset(),
            offset_y: default_offset(),
        }
    }
}

/// Load the settings blob, falling back to defaults when it is absent or
/// unreadable.
pub async fn load_fab_settings(store: &dyn KeyValueStore) -> FabSettings {
    match load_json(store, keys::FAB_SETTINGS).await {
        Ok(Some(settings)) => settings,
        Ok(None) => FabSettings::default(),
        Err(e) => {
            warn!("Failed to read fab settings, using defaults: {e}");
            FabSettings::default()
        }
    }
}

pub async fn save_fab_settings(
    store: &dyn KeyValueStore,
    settings: &FabSettings,
) -> anyhow::Result<()> {
    store_json(store, keys::FAB_SETTINGS, settings).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_defaults_when_absent() {
        let store = MemoryStore::new();
        let settings = load_fab_settings(&store).await;
        assert_eq!(settings, FabSettings::default());
        assert!(settings.enabled);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryStore::new();
        let settings = FabSettings {
            enabled: false,
            corner: FabCorner::TopLeft,
            offset_x: 4,
            offset_y: 40,
        };
        save_fab_settings(&store, &settings).await.unwrap();
        assert_eq!(load_fab_settings(&store).await, settings);
    }

    #[tokio::test]
    async fn test_partial_blob_fills_defaults() {
        let store = MemoryStore::new();
        store
            .set(keys::FAB_SETTINGS, br#"{"corner":"topRight"}"#.to_vec())
            .await
            .unwrap();
        let settings = load_fab_settings(&store).await;
        assert_eq!(settings.corner, FabCorner::TopRight);
        assert!(settings.enabled);
        assert_eq!(settings.offset_x, 16);
    }
}
