//! Formfill engine: rule matching and fill execution for form auto-fill.
//!
//! Given user-authored rules (URL pattern -> field mappings -> values), the
//! engine resolves which rule applies to a page, generates field values
//! through a small placeholder language, writes them into form elements via
//! a narrow document abstraction, and runs ordered post-fill action chains.

// ===== Core engine modules =====
pub mod defaults;
pub mod executor;
pub mod matcher;
pub mod rules;
pub mod template;

// ===== Collaborator surfaces =====
pub mod page;
pub mod settings;
pub mod storage;
pub mod transfer;

// Re-export the primary entry points at the crate root
pub use defaults::{resolve_default, DefaultMatch};
pub use executor::{FillExecutor, FillOutcome};
pub use matcher::{calculate_pattern_specificity, matches_url};
pub use rules::{Rule, RuleManager};
pub use template::{has_placeholders, resolve_template, Resolved};
