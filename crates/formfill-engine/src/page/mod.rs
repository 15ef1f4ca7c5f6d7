//! The document collaborator surface the fill executor writes through.
//!
//! The engine never touches a real DOM directly; hosts implement [`Document`]
//! and [`Element`] over whatever query surface they have. The element kind is
//! resolved once at lookup time into the closed [`ElementKind`] enum, and the
//! executor picks one value-assignment strategy per kind.

mod memory;

pub use memory::{MemoryDocument, MemoryElement};

use crate::rules::types::MatchKind;
use regex::Regex;
use std::sync::Arc;

/// Closed set of element kinds with distinct write semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Plain inputs, textareas, and anything else writable by value.
    Text,
    Checkbox,
    Radio,
    Select,
}

/// One option of a select element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Synthetic events fired so host-page listeners observe engine writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    Input,
    Change,
    Blur,
    KeyDown,
    KeyUp,
}

/// Error types for element writes.
#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    #[error("element is read-only")]
    ReadOnly,
    #[error("element does not support {0}")]
    Unsupported(&'static str),
    #[error("option index {0} out of bounds")]
    NoSuchOption(usize),
    #[error("{0}")]
    Other(String),
}

/// One addressable input-like element.
pub trait Element: Send + Sync {
    /// Resolved once at lookup time; write dispatch branches on this.
    fn kind(&self) -> ElementKind;

    /// Human-readable handle for diagnostics, e.g. `input#email`.
    fn describe(&self) -> String;

    /// The element's own `value` attribute. Radio buttons are checked iff
    /// this equals the target value.
    fn own_value(&self) -> Option<String>;

    fn set_value(&self, value: &str) -> Result<(), ElementError>;

    fn set_checked(&self, checked: bool) -> Result<(), ElementError>;

    /// Options of a select element; empty for other kinds.
    fn options(&self) -> Vec<SelectOption>;

    fn select_index(&self, index: usize) -> Result<(), ElementError>;

    fn click(&self) -> Result<(), ElementError>;

    fn focus(&self) -> Result<(), ElementError>;

    /// Fire a named synthetic event, bubbling enabled.
    fn dispatch(&self, event: PageEvent);
}

/// The queryable page.
pub trait Document: Send + Sync {
    /// Locate zero-or-one element by match kind and selector.
    fn query(&self, kind: MatchKind, selector: &str) -> Option<Arc<dyn Element>>;

    /// First input-like element whose `attr` value matches `pattern`.
    fn query_attr_regex(&self, attr: &str, pattern: &Regex) -> Option<Arc<dyn Element>>;

    /// Dispatch a synthetic keydown/keyup pair carrying `key` to the current
    /// focus target, or a document-level fallback when nothing is focused.
    /// Reports success by returning: dispatch itself cannot fail.
    fn press_key(&self, key: &str);
}
