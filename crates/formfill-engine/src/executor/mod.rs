//! Fill execution: apply a rule's field mappings to the page.
//!
//! A fill walks the rule's fields in declared order, locating each element,
//! resolving its value, writing it, and running the field's post-action chain.
//! Failures are accumulated as diagnostics rather than thrown: a field that
//! cannot be located or written flips the all-fields-ok flag and the fill
//! moves on to the next field. The rule-level chain runs only when every
//! field succeeded.

pub mod actions;

use crate::page::{Document, Element, ElementKind, PageEvent};
use crate::rules::types::{FieldMapping, MatchKind, Rule, ValueKind, Variant};
use crate::storage::ImageStore;
use crate::template::{generators, resolve_template};
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Value strings treated as "checked" for checkbox fields.
const TRUTHY_VALUES: [&str; 3] = ["true", "1", "yes"];

/// Outcome of one fill invocation.
///
/// Errors are data: the fill boundary never throws. `counter` is the value
/// after template resolution; callers persist it when it differs from the
/// rule's stored counter.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub filled_count: usize,
    pub errors: Vec<String>,
    pub counter: u64,
}

/// Executes fills against one document.
pub struct FillExecutor {
    document: Arc<dyn Document>,
    images: Option<ImageStore>,
}

impl FillExecutor {
    pub fn new(document: Arc<dyn Document>) -> Self {
        FillExecutor {
            document,
            images: None,
        }
    }

    /// Attach the image table so `image` kind fields can resolve.
    pub fn with_images(mut self, images: ImageStore) -> Self {
        self.images = Some(images);
        self
    }

    /// Fill `rule` using `variant` (or the rule's active variant when `None`).
    pub async fn fill<'a>(&self, rule: &'a Rule, variant: Option<&'a Variant>) -> FillOutcome {
        let variant = variant.or_else(|| rule.active_variant());
        let mut counter = rule.increment_counter;
        let mut all_fields_ok = true;
        let mut filled_count = 0;
        let mut errors = Vec::new();

        for field in &rule.fields {
            let Some(element) = self.locate(field) else {
                errors.push(format!("field {}: element not found", field.selector));
                all_fields_ok = false;
                continue;
            };

            let value = match self.resolve_value(field, variant, &mut counter).await {
                Ok(value) => value,
                Err(reason) => {
                    errors.push(format!("field {}: {reason}", field.selector));
                    all_fields_ok = false;
                    continue;
                }
            };

            match write_value(element.as_ref(), &value) {
                Ok(()) => {
                    filled_count += 1;
                    debug!("Filled {} with {} chars", element.describe(), value.len());
                    if !field.post_actions.is_empty() {
                        if let Err(reason) =
                            actions::run_chain(self.document.as_ref(), &field.post_actions).await
                        {
                            errors.push(format!("field {} post-actions: {reason}", field.selector));
                        }
                    }
                }
                Err(e) => {
                    errors.push(format!("field {}: {e}", field.selector));
                    all_fields_ok = false;
                }
            }
        }

        if all_fields_ok && !rule.post_actions.is_empty() {
            if let Err(reason) = actions::run_chain(self.document.as_ref(), &rule.post_actions).await
            {
                errors.push(format!("rule post-actions: {reason}"));
            }
        }

        FillOutcome {
            filled_count,
            errors,
            counter,
        }
    }

    /// Locate a field's element. Regex-wrapped `id`/`name` selectors scan
    /// input-like elements for a matching attribute instead of exact lookup.
    fn locate(&self, field: &FieldMapping) -> Option<Arc<dyn Element>> {
        if let Some(pattern) = field.regex_selector() {
            let attr = match field.match_kind {
                MatchKind::Id => "id",
                MatchKind::Name => "name",
                MatchKind::QuerySelector => return None,
            };
            return match Regex::new(pattern) {
                Ok(re) => self.document.query_attr_regex(attr, &re),
                Err(_) => None,
            };
        }
        self.document.query(field.match_kind, &field.selector)
    }

    async fn resolve_value(
        &self,
        field: &FieldMapping,
        variant: Option<&Variant>,
        counter: &mut u64,
    ) -> Result<String, String> {
        // The variant's override wins; the field's stored value is the default.
        let stored = variant
            .and_then(|v| v.values.get(&field.id))
            .map(String::as_str)
            .unwrap_or(&field.value);

        match field.value_kind {
            ValueKind::Static => Ok(stored.to_string()),
            ValueKind::Template => {
                let resolved = resolve_template(stored, *counter);
                *counter = resolved.counter;
                Ok(resolved.value)
            }
            ValueKind::Title => Ok(generators::title(field.min_length, field.max_length)),
            ValueKind::Desc => Ok(generators::desc(field.min_length, field.max_length)),
            ValueKind::Image => {
                let images = self
                    .images
                    .as_ref()
                    .ok_or_else(|| "no image store attached".to_string())?;
                let id = field
                    .image_id
                    .as_deref()
                    .or_else(|| (!stored.is_empty()).then_some(stored))
                    .ok_or_else(|| "no image selected".to_string())?;
                let image = images.get(id).await.map_err(|e| e.to_string())?;
                Ok(image.data_url())
            }
        }
    }
}

/// Write `value` into an element, one strategy per element kind, then fire
/// input/change/blur so host-page listeners observe the change.
fn write_value(element: &dyn Element, value: &str) -> Result<(), crate::page::ElementError> {
    match element.kind() {
        ElementKind::Checkbox => {
            let on = TRUTHY_VALUES
                .iter()
                .any(|truthy| value.eq_ignore_ascii_case(truthy));
            element.set_checked(on)?;
        }
        ElementKind::Radio => {
            let own = element.own_value().unwrap_or_default();
            element.set_checked(own == value)?;
        }
        ElementKind::Select => {
            let options = element.options();
            if let Some(index) = options.iter().position(|o| o.value == value) {
                element.select_index(index)?;
            } else if let Some(index) = options.iter().position(|o| o.label == value) {
                element.select_index(index)?;
            } else {
                // Literal fallback when neither value nor label matches.
                element.set_value(value)?;
            }
        }
        ElementKind::Text => element.set_value(value)?,
    }

    for event in [PageEvent::Input, PageEvent::Change, PageEvent::Blur] {
        element.dispatch(event);
    }
    Ok(())
}
