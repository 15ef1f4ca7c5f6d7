//! Type definitions for the form-fill rule model.
//!
//! This module contains the structs, enums, and helpers shared by the matcher,
//! executor, manager, and transfer layers. The serde shape here is the persisted
//! shape: rule collections are stored and exported as camelCase JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Generate a fresh identity for rules, fields, variants, groups, and actions.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time as epoch milliseconds (the timestamp unit used throughout).
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Field Mappings
// ============================================================================

/// How a field mapping locates its target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    /// Match on the element's `id` attribute.
    Id,
    /// Match on the element's `name` attribute.
    Name,
    /// Match with a CSS selector.
    QuerySelector,
}

/// How a field mapping's value is produced at fill time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    /// The stored value is used verbatim.
    #[default]
    Static,
    /// The stored value is a template resolved through the placeholder scanner.
    Template,
    /// A generated sentence-like value, bounded by `min_length`/`max_length`.
    Title,
    /// A generated paragraph-like value, bounded by `min_length`/`max_length`.
    Desc,
    /// The value resolves to a stored image (as a data URL).
    Image,
}

/// One instruction to locate and populate a single form element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub id: String,
    /// Selector string. For `id`/`name` kinds a `/pattern/`-wrapped selector
    /// switches to attribute-regex matching instead of exact lookup.
    pub selector: String,
    pub match_kind: MatchKind,
    #[serde(default)]
    pub value_kind: ValueKind,
    /// Raw value or template string (the field's default when no variant
    /// override is present).
    #[serde(default)]
    pub value: String,
    /// Minimum generated length; only meaningful for `title`/`desc` kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum generated length; only meaningful for `title`/`desc` kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Stored image reference for `image` kind fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    /// Actions run after this field is written, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_actions: Vec<PostAction>,
}

impl FieldMapping {
    pub fn new(match_kind: MatchKind, selector: impl Into<String>) -> Self {
        FieldMapping {
            id: new_id(),
            selector: selector.into(),
            match_kind,
            value_kind: ValueKind::default(),
            value: String::new(),
            min_length: None,
            max_length: None,
            image_id: None,
            post_actions: Vec::new(),
        }
    }

    /// The `/pattern/`-wrapped form of an `id`/`name` selector, if present.
    ///
    /// Returns the inner pattern with the delimiting slashes stripped.
    pub fn regex_selector(&self) -> Option<&str> {
        if !matches!(self.match_kind, MatchKind::Id | MatchKind::Name) {
            return None;
        }
        wrapped_regex(&self.selector)
    }
}

/// Strip `/EXPR/` wrapping from a string, if it is wrapped.
pub(crate) fn wrapped_regex(s: &str) -> Option<&str> {
    if s.len() >= 2 && s.starts_with('/') && s.ends_with('/') {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

// ============================================================================
// Post-Actions
// ============================================================================

/// One step run after a field or rule completes.
///
/// Actions are authored alongside the rule and executed transiently at fill
/// time; the engine never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostAction {
    pub id: String,
    #[serde(flatten)]
    pub kind: PostActionKind,
}

impl PostAction {
    pub fn new(kind: PostActionKind) -> Self {
        PostAction { id: new_id(), kind }
    }
}

/// The action kind plus its kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PostActionKind {
    /// Click the element located by `selector`.
    Click { selector: String },
    /// Focus the element located by `selector`.
    Focus { selector: String },
    /// Dispatch a synthetic keydown/keyup pair carrying `key`.
    PressKey { key: String },
    /// Suspend for `ms` milliseconds (500 when unset).
    Wait {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ms: Option<u64>,
    },
}

impl PostActionKind {
    /// Short human-readable label used in chain-failure diagnostics.
    pub fn label(&self) -> String {
        match self {
            PostActionKind::Click { selector } => format!("click {selector}"),
            PostActionKind::Focus { selector } => format!("focus {selector}"),
            PostActionKind::PressKey { key } => format!("pressKey {key}"),
            PostActionKind::Wait { ms } => format!("wait {}ms", ms.unwrap_or(500)),
        }
    }
}

// ============================================================================
// Variants and Repeat Groups
// ============================================================================

/// Row data for one repeat-group row: column field id -> value.
pub type RowData = HashMap<String, String>;

/// An alternate value-set for the same rule structure.
///
/// The first variant in a rule's list is the structurally authoritative
/// "primary": its field and post-action structure is the only one editable.
/// All variants share that structure but may supply different values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub name: String,
    /// Field-mapping id -> concrete value override.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub values: HashMap<String, String>,
    /// Repeat-group id -> ordered row data for this variant.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub rows: HashMap<String, Vec<RowData>>,
}

impl Variant {
    pub fn new(name: impl Into<String>) -> Self {
        Variant {
            id: new_id(),
            name: name.into(),
            values: HashMap::new(),
            rows: HashMap::new(),
        }
    }
}

/// One column of a repeat group, with its own lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnField {
    pub id: String,
    pub label: String,
    pub match_kind: MatchKind,
    pub selector: String,
}

/// A repeated-row section of a form (e.g. line items).
///
/// `default_rows` is the primary variant's row data; other variants hold
/// their own rows under the group id in [`Variant::rows`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatGroup {
    pub id: String,
    pub name: String,
    /// Selector for one row container within the group.
    pub row_selector: String,
    #[serde(default)]
    pub columns: Vec<ColumnField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_rows: Vec<RowData>,
}

// ============================================================================
// Rules
// ============================================================================

/// A named, URL-scoped set of field mappings plus optional post-fill actions
/// and variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    /// URL pattern: wildcard form, `<all_urls>`, or `/regex/`.
    pub pattern: String,
    /// Ordering is significant: fields fill in declared order.
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub archived: bool,
    /// Only grows via successful fills, or resets to 0 explicitly.
    #[serde(default)]
    pub increment_counter: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Actions run after all fields succeed, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_actions: Vec<PostAction>,
    /// Never empty; the first entry is the primary variant.
    pub variants: Vec<Variant>,
    /// The variant used when no explicit variant is requested.
    pub active_variant_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repeat_groups: Vec<RepeatGroup>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Rule {
    /// Create a rule with a single primary variant, marked active.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        let primary = Variant::new("Primary");
        let active = primary.id.clone();
        let now = now_ms();
        Rule {
            id: new_id(),
            name: name.into(),
            pattern: pattern.into(),
            fields: Vec::new(),
            enabled: true,
            archived: false,
            increment_counter: 0,
            collection: None,
            post_actions: Vec::new(),
            variants: vec![primary],
            active_variant_id: active,
            repeat_groups: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The structurally authoritative variant (first in the list).
    pub fn primary_variant(&self) -> Option<&Variant> {
        self.variants.first()
    }

    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// The variant used for unattended fills. Falls back to the primary if
    /// the recorded active id no longer resolves.
    pub fn active_variant(&self) -> Option<&Variant> {
        self.variant(&self.active_variant_id)
            .or_else(|| self.primary_variant())
    }

    pub fn field(&self, id: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// A deep copy with every identity reissued and timestamps stamped now.
    ///
    /// Variant value maps, variant row maps, group default rows, and the
    /// active-variant pointer are remapped consistently onto the new ids.
    /// Entries keyed by an id that no longer resolves are dropped.
    pub fn with_fresh_identity(&self) -> Rule {
        let mut rule = self.clone();
        rule.id = new_id();

        let mut field_ids: HashMap<String, String> = HashMap::new();
        for field in &mut rule.fields {
            let id = new_id();
            field_ids.insert(std::mem::replace(&mut field.id, id.clone()), id);
            for action in &mut field.post_actions {
                action.id = new_id();
            }
        }
        for action in &mut rule.post_actions {
            action.id = new_id();
        }

        let mut group_ids: HashMap<String, String> = HashMap::new();
        let mut column_ids: HashMap<String, String> = HashMap::new();
        for group in &mut rule.repeat_groups {
            let id = new_id();
            group_ids.insert(std::mem::replace(&mut group.id, id.clone()), id);
            for column in &mut group.columns {
                let id = new_id();
                column_ids.insert(std::mem::replace(&mut column.id, id.clone()), id);
            }
            group.default_rows = group
                .default_rows
                .iter()
                .map(|row| remap_keys(row, &column_ids))
                .collect();
        }

        let mut variant_ids: HashMap<String, String> = HashMap::new();
        for variant in &mut rule.variants {
            let id = new_id();
            variant_ids.insert(std::mem::replace(&mut variant.id, id.clone()), id);
            variant.values = variant
                .values
                .iter()
                .filter_map(|(field_id, value)| {
                    field_ids
                        .get(field_id)
                        .map(|new_key| (new_key.clone(), value.clone()))
                })
                .collect();
            variant.rows = variant
                .rows
                .iter()
                .filter_map(|(group_id, rows)| {
                    group_ids.get(group_id).map(|new_key| {
                        let rows = rows.iter().map(|row| remap_keys(row, &column_ids)).collect();
                        (new_key.clone(), rows)
                    })
                })
                .collect();
        }

        rule.active_variant_id = variant_ids
            .get(&rule.active_variant_id)
            .cloned()
            .or_else(|| rule.variants.first().map(|v| v.id.clone()))
            .unwrap_or_default();

        let now = now_ms();
        rule.created_at = now;
        rule.updated_at = now;
        rule
    }
}

fn remap_keys(row: &RowData, ids: &HashMap<String, String>) -> RowData {
    row.iter()
        .filter_map(|(key, value)| ids.get(key).map(|new_key| (new_key.clone(), value.clone())))
        .collect()
}

// ============================================================================
// Default Mappings
// ============================================================================

/// A standing association between a URL pattern and a rule, used for
/// unattended fills.
///
/// Recorded independently of the rule itself. At most one mapping exists per
/// distinct pattern string, and a mapping is valid only while its remembered
/// pattern still equals the referenced rule's current pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultMapping {
    pub pattern: String,
    pub rule_id: String,
    #[serde(default)]
    pub created_at: i64,
}

// ============================================================================
// Error Types
// ============================================================================

/// Error types for rule data operations.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Rule {0} not found")]
    NotFound(String),
    #[error("Variant {0} not found")]
    VariantNotFound(String),
    #[error("The primary variant cannot be removed")]
    PrimaryVariantRemoval,
    #[error("Rule index {0} out of bounds")]
    IndexOutOfBounds(usize),
}
