//! Post-action chain execution.
//!
//! Chains run strictly in sequence. The first action that reports failure
//! stops the chain: remaining actions are skipped and one error names the
//! failed action and its position. Prior successes in the chain stand.

use crate::page::Document;
use crate::rules::types::{MatchKind, PostAction, PostActionKind};
use std::time::Duration;
use tracing::debug;

/// Delay used by `wait` actions with no configured duration.
pub const DEFAULT_WAIT_MS: u64 = 500;

/// Run an ordered chain of post-actions against the document.
pub async fn run_chain(document: &dyn Document, chain: &[PostAction]) -> Result<(), String> {
    for (position, action) in chain.iter().enumerate() {
        if let Err(reason) = run_action(document, &action.kind).await {
            return Err(format!(
                "action {} ({}) failed: {reason}",
                position + 1,
                action.kind.label()
            ));
        }
        debug!("Post-action {} ({}) ok", position + 1, action.kind.label());
    }
    Ok(())
}

async fn run_action(document: &dyn Document, kind: &PostActionKind) -> Result<(), String> {
    match kind {
        PostActionKind::Click { selector } => {
            let element = document
                .query(MatchKind::QuerySelector, selector)
                .ok_or_else(|| "element not found".to_string())?;
            element.click().map_err(|e| e.to_string())
        }
        PostActionKind::Focus { selector } => {
            let element = document
                .query(MatchKind::QuerySelector, selector)
                .ok_or_else(|| "element not found".to_string())?;
            element.focus().map_err(|e| e.to_string())
        }
        PostActionKind::PressKey { key } => {
            // Always succeeds once dispatched.
            document.press_key(key);
            Ok(())
        }
        PostActionKind::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(ms.unwrap_or(DEFAULT_WAIT_MS))).await;
            Ok(())
        }
    }
}
