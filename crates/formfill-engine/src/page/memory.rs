//! In-memory implementation of the document surface.
//!
//! Useful for tests and headless embedding. Elements answer to an id, a name,
//! and/or an opaque CSS-selector key; the document treats `querySelector`
//! selectors as exact keys rather than interpreting CSS.

use super::{Document, Element, ElementError, ElementKind, PageEvent, SelectOption};
use crate::rules::types::MatchKind;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct ElementState {
    value: String,
    checked: bool,
    events: Vec<PageEvent>,
    clicks: usize,
    focused: bool,
}

/// One scriptable element of a [`MemoryDocument`].
pub struct MemoryElement {
    kind: ElementKind,
    id: Option<String>,
    name: Option<String>,
    css: Option<String>,
    own_value: Option<String>,
    options: Vec<SelectOption>,
    read_only: bool,
    state: Mutex<ElementState>,
}

impl MemoryElement {
    pub fn new(kind: ElementKind) -> Self {
        MemoryElement {
            kind,
            id: None,
            name: None,
            css: None,
            own_value: None,
            options: Vec::new(),
            read_only: false,
            state: Mutex::new(ElementState::default()),
        }
    }

    pub fn text() -> Self {
        Self::new(ElementKind::Text)
    }

    pub fn checkbox() -> Self {
        Self::new(ElementKind::Checkbox)
    }

    pub fn radio(own_value: impl Into<String>) -> Self {
        let mut element = Self::new(ElementKind::Radio);
        element.own_value = Some(own_value.into());
        element
    }

    pub fn select(options: Vec<(&str, &str)>) -> Self {
        let mut element = Self::new(ElementKind::Select);
        element.options = options
            .into_iter()
            .map(|(value, label)| SelectOption {
                value: value.to_string(),
                label: label.to_string(),
            })
            .collect();
        element
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_css(mut self, selector: impl Into<String>) -> Self {
        self.css = Some(selector.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    // ---- test/assertion accessors ----

    pub fn value(&self) -> String {
        self.state.lock().value.clone()
    }

    pub fn checked(&self) -> bool {
        self.state.lock().checked
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.state.lock().events.clone()
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().clicks
    }

    pub fn is_focused(&self) -> bool {
        self.state.lock().focused
    }

    fn attr(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "name" => self.name.as_deref(),
            _ => None,
        }
    }
}

impl Element for MemoryElement {
    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn describe(&self) -> String {
        if let Some(id) = &self.id {
            format!("#{id}")
        } else if let Some(name) = &self.name {
            format!("[name={name}]")
        } else if let Some(css) = &self.css {
            css.clone()
        } else {
            "<anonymous>".to_string()
        }
    }

    fn own_value(&self) -> Option<String> {
        self.own_value.clone()
    }

    fn set_value(&self, value: &str) -> Result<(), ElementError> {
        if self.read_only {
            return Err(ElementError::ReadOnly);
        }
        self.state.lock().value = value.to_string();
        Ok(())
    }

    fn set_checked(&self, checked: bool) -> Result<(), ElementError> {
        if !matches!(self.kind, ElementKind::Checkbox | ElementKind::Radio) {
            return Err(ElementError::Unsupported("checked"));
        }
        self.state.lock().checked = checked;
        Ok(())
    }

    fn options(&self) -> Vec<SelectOption> {
        self.options.clone()
    }

    fn select_index(&self, index: usize) -> Result<(), ElementError> {
        let option = self
            .options
            .get(index)
            .ok_or(ElementError::NoSuchOption(index))?;
        self.state.lock().value = option.value.clone();
        Ok(())
    }

    fn click(&self) -> Result<(), ElementError> {
        self.state.lock().clicks += 1;
        Ok(())
    }

    fn focus(&self) -> Result<(), ElementError> {
        self.state.lock().focused = true;
        Ok(())
    }

    fn dispatch(&self, event: PageEvent) {
        self.state.lock().events.push(event);
    }
}

/// In-memory document over a fixed element list.
#[derive(Default)]
pub struct MemoryDocument {
    elements: Vec<Arc<MemoryElement>>,
    pressed_keys: Mutex<Vec<String>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, returning the shared handle for later assertions.
    pub fn add(&mut self, element: MemoryElement) -> Arc<MemoryElement> {
        let element = Arc::new(element);
        self.elements.push(Arc::clone(&element));
        element
    }

    /// Keys dispatched through [`Document::press_key`], in order.
    pub fn pressed_keys(&self) -> Vec<String> {
        self.pressed_keys.lock().clone()
    }
}

impl Document for MemoryDocument {
    fn query(&self, kind: MatchKind, selector: &str) -> Option<Arc<dyn Element>> {
        let found = self.elements.iter().find(|element| match kind {
            MatchKind::Id => element.id.as_deref() == Some(selector),
            MatchKind::Name => element.name.as_deref() == Some(selector),
            MatchKind::QuerySelector => element.css.as_deref() == Some(selector),
        })?;
        Some(Arc::clone(found) as Arc<dyn Element>)
    }

    fn query_attr_regex(&self, attr: &str, pattern: &Regex) -> Option<Arc<dyn Element>> {
        let found = self
            .elements
            .iter()
            .find(|element| element.attr(attr).is_some_and(|value| pattern.is_match(value)))?;
        Some(Arc::clone(found) as Arc<dyn Element>)
    }

    fn press_key(&self, key: &str) {
        // The focus target does not change what gets recorded here; the
        // element-level KeyDown/KeyUp pair lands on the focused element.
        if let Some(focused) = self.elements.iter().find(|e| e.is_focused()) {
            focused.dispatch(PageEvent::KeyDown);
            focused.dispatch(PageEvent::KeyUp);
        }
        self.pressed_keys.lock().push(key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_by_kind() {
        let mut document = MemoryDocument::new();
        document.add(MemoryElement::text().with_id("email").with_name("email_field"));
        document.add(MemoryElement::text().with_css("form .title"));

        assert!(document.query(MatchKind::Id, "email").is_some());
        assert!(document.query(MatchKind::Name, "email_field").is_some());
        assert!(document.query(MatchKind::QuerySelector, "form .title").is_some());
        assert!(document.query(MatchKind::Id, "missing").is_none());
    }

    #[test]
    fn test_query_attr_regex_scans_in_order() {
        let mut document = MemoryDocument::new();
        document.add(MemoryElement::text().with_id("other"));
        let first = document.add(MemoryElement::text().with_id("user_1"));
        document.add(MemoryElement::text().with_id("user_2"));

        let pattern = Regex::new("^user_\\d+$").unwrap();
        let found = document.query_attr_regex("id", &pattern).unwrap();
        assert_eq!(found.describe(), first.describe());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let element = MemoryElement::text().read_only();
        assert!(matches!(
            element.set_value("x"),
            Err(ElementError::ReadOnly)
        ));
    }

    #[test]
    fn test_checked_unsupported_on_text() {
        let element = MemoryElement::text();
        assert!(element.set_checked(true).is_err());
    }

    #[test]
    fn test_press_key_reaches_focused_element() {
        let mut document = MemoryDocument::new();
        let element = document.add(MemoryElement::text().with_id("q"));
        element.focus().unwrap();
        document.press_key("Enter");

        assert_eq!(document.pressed_keys(), vec!["Enter".to_string()]);
        assert_eq!(element.events(), vec![PageEvent::KeyDown, PageEvent::KeyUp]);
    }
}
