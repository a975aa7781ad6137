use crate::error::{BrowserError, Result};
use crate::ui::ControlRef;
use indexmap::IndexMap;

/// Attribute stamped onto every element the CDP accessor hands out
pub const REF_ATTRIBUTE: &str = "data-scrape-ref";

const MAX_TEXT_CHARS: usize = 50;

/// Information needed to locate a control again
#[derive(Debug, Clone, PartialEq)]
pub struct ControlHandle {
    /// CSS selector resolving to exactly this element
    pub css_selector: String,

    /// Element's tag name
    pub tag_name: String,

    /// Element's text content (truncated for display)
    pub text: Option<String>,
}

impl ControlHandle {
    /// Handle for an element stamped with the given ref
    pub fn for_ref(control: ControlRef, tag_name: impl Into<String>) -> Self {
        Self {
            css_selector: format!("[{}=\"{}\"]", REF_ATTRIBUTE, control.0),
            tag_name: tag_name.into(),
            text: None,
        }
    }

    /// Builder method: set text content, truncated on a char boundary
    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return self;
        }
        let truncated = if text.chars().count() > MAX_TEXT_CHARS {
            let head: String = text.chars().take(MAX_TEXT_CHARS - 3).collect();
            format!("{}...", head)
        } else {
            text.to_string()
        };
        self.text = Some(truncated);
        self
    }
}

/// Map of control refs to their handles
/// Uses IndexMap to preserve the order controls were first seen
#[derive(Debug, Clone, Default)]
pub struct ControlRegistry {
    map: IndexMap<ControlRef, ControlHandle>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self { map: IndexMap::new() }
    }

    /// Record a control; a ref seen again keeps its position but refreshes its handle
    pub fn register(&mut self, control: ControlRef, handle: ControlHandle) {
        self.map.insert(control, handle);
    }

    /// CSS selector for a control, or an error if it was never handed out
    pub fn selector_for(&self, control: ControlRef) -> Result<&str> {
        self.map
            .get(&control)
            .map(|handle| handle.css_selector.as_str())
            .ok_or(BrowserError::UnknownControl(control.0))
    }

    /// Short human-readable description for log lines
    pub fn describe(&self, control: ControlRef) -> String {
        match self.map.get(&control) {
            Some(ControlHandle { tag_name, text: Some(text), .. }) => format!("<{}> {} \"{}\"", tag_name, control, text),
            Some(handle) => format!("<{}> {}", handle.tag_name, control),
            None => control.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
