//! Rule model and data operations.

pub mod manager;
pub mod types;

pub use manager::RuleManager;
pub use types::{
    ColumnField, DefaultMapping, FieldMapping, MatchKind, PostAction, PostActionKind, RepeatGroup,
    RowData, Rule, RuleError, ValueKind, Variant,
};
