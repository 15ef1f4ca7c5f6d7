//! RuleManager - data operations over the rule collection.
//!
//! External surfaces (popup, options page, keyboard shortcuts) drive the
//! engine through these plain request/response calls: rule CRUD, variant
//! operations, default-mapping maintenance, and fill orchestration. Mutations
//! persist through the key-value store; persistence failures on paths where
//! the in-memory operation already succeeded are logged, not surfaced.

use super::types::{now_ms, DefaultMapping, Rule, RuleError, Variant};
use crate::defaults::resolve_default;
use crate::executor::{FillExecutor, FillOutcome};
use crate::storage::{keys, load_json, store_json, KeyValueStore};
use crate::transfer::{self, ExportPayload, ImportError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Manages the rule collection and the default-mapping table.
pub struct RuleManager {
    rules: RwLock<Vec<Rule>>,
    mappings: RwLock<Vec<DefaultMapping>>,
    store: Arc<dyn KeyValueStore>,
}

impl RuleManager {
    /// Create an empty manager over a store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        RuleManager {
            rules: RwLock::new(Vec::new()),
            mappings: RwLock::new(Vec::new()),
            store,
        }
    }

    /// Create a manager populated from the persisted collections.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let rules: Vec<Rule> = load_json(store.as_ref(), keys::RULES).await?.unwrap_or_default();
        let mappings: Vec<DefaultMapping> = load_json(store.as_ref(), keys::DEFAULT_MAPPINGS)
            .await?
            .unwrap_or_default();
        info!(
            "Loaded {} rules and {} default mappings",
            rules.len(),
            mappings.len()
        );
        Ok(RuleManager {
            rules: RwLock::new(rules),
            mappings: RwLock::new(mappings),
            store,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn list_rules(&self) -> Vec<Rule> {
        self.rules.read().clone()
    }

    pub fn get_rule(&self, id: &str) -> Option<Rule> {
        self.rules.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn list_mappings(&self) -> Vec<DefaultMapping> {
        self.mappings.read().clone()
    }

    // ------------------------------------------------------------------
    // Rule CRUD
    // ------------------------------------------------------------------

    pub async fn add_rule(&self, rule: Rule) -> Rule {
        self.rules.write().push(rule.clone());
        debug!("Added rule {} ({})", rule.name, rule.id);
        self.persist_rules().await;
        rule
    }

    /// Replace a rule wholesale, stamping `updated_at`.
    pub async fn update_rule(&self, mut rule: Rule) -> Result<Rule, RuleError> {
        rule.updated_at = now_ms();
        {
            let mut rules = self.rules.write();
            let slot = rules
                .iter_mut()
                .find(|r| r.id == rule.id)
                .ok_or_else(|| RuleError::NotFound(rule.id.clone()))?;
            *slot = rule.clone();
        }
        self.persist_rules().await;
        Ok(rule)
    }

    /// Delete a rule and prune any default mappings referencing it.
    pub async fn delete_rule(&self, id: &str) -> Result<Rule, RuleError> {
        let removed = {
            let mut rules = self.rules.write();
            let index = rules
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
            rules.remove(index)
        };
        let pruned = {
            let mut mappings = self.mappings.write();
            let before = mappings.len();
            mappings.retain(|m| m.rule_id != id);
            before - mappings.len()
        };
        info!("Deleted rule {} ({} mappings pruned)", id, pruned);
        self.persist_rules().await;
        if pruned > 0 {
            self.persist_mappings().await;
        }
        Ok(removed)
    }

    pub async fn set_archived(&self, id: &str, archived: bool) -> Result<(), RuleError> {
        self.mutate_rule(id, |rule| {
            rule.archived = archived;
        })
        .await
    }

    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), RuleError> {
        self.mutate_rule(id, |rule| {
            rule.enabled = enabled;
        })
        .await
    }

    /// Duplicate a rule with fresh identities throughout; the copy is placed
    /// directly after the original.
    pub async fn duplicate_rule(&self, id: &str) -> Result<Rule, RuleError> {
        let copy = {
            let mut rules = self.rules.write();
            let index = rules
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
            let mut copy = rules[index].with_fresh_identity();
            copy.name = format!("{} (copy)", rules[index].name);
            rules.insert(index + 1, copy.clone());
            copy
        };
        self.persist_rules().await;
        Ok(copy)
    }

    /// Move a rule to a new position in the ordered collection.
    pub async fn reorder_rule(&self, id: &str, new_index: usize) -> Result<(), RuleError> {
        {
            let mut rules = self.rules.write();
            if new_index >= rules.len() {
                return Err(RuleError::IndexOutOfBounds(new_index));
            }
            let index = rules
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
            let rule = rules.remove(index);
            rules.insert(new_index, rule);
        }
        self.persist_rules().await;
        Ok(())
    }

    /// Explicit reset: the only way the counter moves other than growing.
    pub async fn reset_counter(&self, id: &str) -> Result<(), RuleError> {
        self.mutate_rule(id, |rule| {
            rule.increment_counter = 0;
        })
        .await
    }

    // ------------------------------------------------------------------
    // Variant operations
    // ------------------------------------------------------------------

    /// Add a variant sharing the primary's structure with no overrides.
    pub async fn add_variant(&self, rule_id: &str, name: &str) -> Result<Variant, RuleError> {
        let variant = Variant::new(name);
        let created = variant.clone();
        self.mutate_rule(rule_id, move |rule| {
            rule.variants.push(variant);
        })
        .await?;
        Ok(created)
    }

    pub async fn rename_variant(
        &self,
        rule_id: &str,
        variant_id: &str,
        name: &str,
    ) -> Result<(), RuleError> {
        let variant_id = variant_id.to_string();
        let name = name.to_string();
        let mut found = false;
        self.mutate_rule(rule_id, |rule| {
            if let Some(variant) = rule.variants.iter_mut().find(|v| v.id == variant_id) {
                variant.name = name;
                found = true;
            }
        })
        .await?;
        if found {
            Ok(())
        } else {
            Err(RuleError::VariantNotFound(variant_id))
        }
    }

    /// Remove a non-primary variant. Removing the active variant hands the
    /// active role back to the primary.
    pub async fn remove_variant(&self, rule_id: &str, variant_id: &str) -> Result<(), RuleError> {
        {
            let mut rules = self.rules.write();
            let rule = rules
                .iter_mut()
                .find(|r| r.id == rule_id)
                .ok_or_else(|| RuleError::NotFound(rule_id.to_string()))?;
            let index = rule
                .variants
                .iter()
                .position(|v| v.id == variant_id)
                .ok_or_else(|| RuleError::VariantNotFound(variant_id.to_string()))?;
            if index == 0 {
                return Err(RuleError::PrimaryVariantRemoval);
            }
            rule.variants.remove(index);
            if rule.active_variant_id == variant_id {
                rule.active_variant_id = rule.variants[0].id.clone();
            }
            rule.updated_at = now_ms();
        }
        self.persist_rules().await;
        Ok(())
    }

    pub async fn set_active_variant(
        &self,
        rule_id: &str,
        variant_id: &str,
    ) -> Result<(), RuleError> {
        {
            let mut rules = self.rules.write();
            let rule = rules
                .iter_mut()
                .find(|r| r.id == rule_id)
                .ok_or_else(|| RuleError::NotFound(rule_id.to_string()))?;
            if rule.variant(variant_id).is_none() {
                return Err(RuleError::VariantNotFound(variant_id.to_string()));
            }
            rule.active_variant_id = variant_id.to_string();
            rule.updated_at = now_ms();
        }
        self.persist_rules().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Default mappings
    // ------------------------------------------------------------------

    /// Record `rule_id` as the default for `pattern`, atomically replacing
    /// any prior mapping with that exact pattern string. Patterns are the
    /// uniqueness key: one rule may be the default for several patterns.
    pub async fn set_default(&self, pattern: &str, rule_id: &str) -> Result<DefaultMapping, RuleError> {
        if self.get_rule(rule_id).is_none() {
            return Err(RuleError::NotFound(rule_id.to_string()));
        }
        let mapping = DefaultMapping {
            pattern: pattern.to_string(),
            rule_id: rule_id.to_string(),
            created_at: now_ms(),
        };
        {
            let mut mappings = self.mappings.write();
            mappings.retain(|m| m.pattern != pattern);
            mappings.push(mapping.clone());
        }
        self.persist_mappings().await;
        Ok(mapping)
    }

    /// Remove the mapping for a pattern; returns whether one existed.
    pub async fn remove_default(&self, pattern: &str) -> bool {
        let removed = {
            let mut mappings = self.mappings.write();
            let before = mappings.len();
            mappings.retain(|m| m.pattern != pattern);
            before != mappings.len()
        };
        if removed {
            self.persist_mappings().await;
        }
        removed
    }

    /// Resolve the default rule for a URL against the live collections.
    pub fn resolve_default_rule(&self, url: &str) -> Option<(Rule, DefaultMapping)> {
        let rules = self.rules.read();
        let mappings = self.mappings.read();
        resolve_default(url, &mappings, &rules)
            .map(|matched| (matched.rule.clone(), matched.mapping.clone()))
    }

    // ------------------------------------------------------------------
    // Fill orchestration
    // ------------------------------------------------------------------

    /// Run a fill for a rule, then persist the advanced counter.
    ///
    /// Counter write-back is fire-and-forget with respect to the fill
    /// outcome: a persistence failure is logged, never surfaced, since the
    /// fill itself already completed. Concurrent fills of the same rule are
    /// not mutually excluded; the last counter write wins.
    pub async fn fill_rule(
        &self,
        executor: &FillExecutor,
        rule_id: &str,
        variant_id: Option<&str>,
    ) -> Result<FillOutcome, RuleError> {
        let rule = self
            .get_rule(rule_id)
            .ok_or_else(|| RuleError::NotFound(rule_id.to_string()))?;
        let variant = match variant_id {
            Some(id) => Some(
                rule.variant(id)
                    .ok_or_else(|| RuleError::VariantNotFound(id.to_string()))?,
            ),
            None => rule.active_variant(),
        };

        let outcome = executor.fill(&rule, variant).await;

        if outcome.counter != rule.increment_counter {
            {
                let mut rules = self.rules.write();
                if let Some(live) = rules.iter_mut().find(|r| r.id == rule_id) {
                    live.increment_counter = outcome.counter;
                    live.updated_at = now_ms();
                }
            }
            self.persist_rules().await;
        }

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// Snapshot the whole collection as an export payload.
    pub fn export_rules(&self) -> ExportPayload {
        transfer::export_rules(&self.rules.read())
    }

    /// Import rules from a serialized payload. All-or-nothing: a validation
    /// failure leaves the stored collection untouched.
    pub async fn import_rules(&self, json: &str) -> Result<usize, ImportError> {
        let payload = transfer::parse_payload(json)?;
        let imported = transfer::import_rules(payload)?;
        let count = imported.len();
        self.rules.write().extend(imported);
        self.persist_rules().await;
        info!("Imported {count} rules");
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    async fn mutate_rule(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Rule),
    ) -> Result<(), RuleError> {
        {
            let mut rules = self.rules.write();
            let rule = rules
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| RuleError::NotFound(id.to_string()))?;
            mutate(rule);
            rule.updated_at = now_ms();
        }
        self.persist_rules().await;
        Ok(())
    }

    async fn persist_rules(&self) {
        let snapshot = self.rules.read().clone();
        if let Err(e) = store_json(self.store.as_ref(), keys::RULES, &snapshot).await {
            warn!("Failed to persist rule collection: {e}");
        }
    }

    async fn persist_mappings(&self) {
        let snapshot = self.mappings.read().clone();
        if let Err(e) = store_json(self.store.as_ref(), keys::DEFAULT_MAPPINGS, &snapshot).await {
            warn!("Failed to persist default mappings: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn manager() -> RuleManager {
        RuleManager::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_add_and_reload_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let manager = RuleManager::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        let rule = manager.add_rule(Rule::new("r", "*")).await;

        let reloaded = RuleManager::load(store).await.unwrap();
        assert_eq!(reloaded.list_rules().len(), 1);
        assert_eq!(reloaded.get_rule(&rule.id).unwrap().name, "r");
    }

    #[tokio::test]
    async fn test_update_missing_rule() {
        let manager = manager();
        let rule = Rule::new("ghost", "*");
        assert!(matches!(
            manager.update_rule(rule).await,
            Err(RuleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_places_copy_after_original() {
        let manager = manager();
        let first = manager.add_rule(Rule::new("first", "*")).await;
        manager.add_rule(Rule::new("second", "*")).await;

        let copy = manager.duplicate_rule(&first.id).await.unwrap();
        let rules = manager.list_rules();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[1].id, copy.id);
        assert_eq!(copy.name, "first (copy)");
        assert_ne!(copy.id, first.id);
    }

    #[tokio::test]
    async fn test_reorder() {
        let manager = manager();
        let a = manager.add_rule(Rule::new("a", "*")).await;
        manager.add_rule(Rule::new("b", "*")).await;
        manager.add_rule(Rule::new("c", "*")).await;

        manager.reorder_rule(&a.id, 2).await.unwrap();
        let names: Vec<String> = manager.list_rules().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b", "c", "a"]);

        assert!(matches!(
            manager.reorder_rule(&a.id, 9).await,
            Err(RuleError::IndexOutOfBounds(9))
        ));
    }

    #[tokio::test]
    async fn test_set_default_replaces_same_pattern() {
        let manager = manager();
        let a = manager.add_rule(Rule::new("a", "https://example.com/*")).await;
        let b = manager.add_rule(Rule::new("b", "https://example.com/*")).await;

        manager.set_default("https://example.com/*", &a.id).await.unwrap();
        manager.set_default("https://example.com/*", &b.id).await.unwrap();

        let mappings = manager.list_mappings();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].rule_id, b.id);
    }

    #[tokio::test]
    async fn test_one_rule_default_for_several_patterns() {
        let manager = manager();
        let rule = manager.add_rule(Rule::new("a", "https://example.com/*")).await;

        manager.set_default("https://example.com/*", &rule.id).await.unwrap();
        manager.set_default("https://example.org/*", &rule.id).await.unwrap();
        assert_eq!(manager.list_mappings().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_rule_prunes_mappings() {
        let manager = manager();
        let rule = manager.add_rule(Rule::new("a", "https://example.com/*")).await;
        manager.set_default("https://example.com/*", &rule.id).await.unwrap();

        manager.delete_rule(&rule.id).await.unwrap();
        assert!(manager.list_mappings().is_empty());
    }

    #[tokio::test]
    async fn test_primary_variant_cannot_be_removed() {
        let manager = manager();
        let rule = manager.add_rule(Rule::new("a", "*")).await;
        let primary_id = rule.variants[0].id.clone();

        assert!(matches!(
            manager.remove_variant(&rule.id, &primary_id).await,
            Err(RuleError::PrimaryVariantRemoval)
        ));
    }

    #[tokio::test]
    async fn test_removing_active_variant_reverts_to_primary() {
        let manager = manager();
        let rule = manager.add_rule(Rule::new("a", "*")).await;
        let secondary = manager.add_variant(&rule.id, "Secondary").await.unwrap();
        manager.set_active_variant(&rule.id, &secondary.id).await.unwrap();

        manager.remove_variant(&rule.id, &secondary.id).await.unwrap();
        let rule = manager.get_rule(&rule.id).unwrap();
        assert_eq!(rule.active_variant_id, rule.variants[0].id);
    }

    #[tokio::test]
    async fn test_reset_counter() {
        let manager = manager();
        let mut rule = Rule::new("a", "*");
        rule.increment_counter = 41;
        let rule = manager.add_rule(rule).await;

        manager.reset_counter(&rule.id).await.unwrap();
        assert_eq!(manager.get_rule(&rule.id).unwrap().increment_counter, 0);
    }
}
