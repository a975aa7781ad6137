//! UI accessor capability
//!
//! The traversal engine never touches the page directly. It asks a
//! [`UiAccessor`] to find controls by [`Intent`] and to read or mutate them
//! through opaque [`ControlRef`] handles. This module provides:
//! - `UiAccessor`: the capability trait the engine is written against
//! - `Selectors`: intent → CSS selector chains for the target application
//! - `ControlRegistry`: ref → selector bookkeeping for the CDP accessor
//! - `CdpAccessor`: the implementation over a live Chrome tab

pub mod cdp;
pub mod registry;
pub mod selectors;

pub use cdp::CdpAccessor;
pub use registry::{ControlHandle, ControlRegistry};
pub use selectors::Selectors;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to one element of the live document
///
/// The same element always yields the same ref for the lifetime of the page,
/// so refs can be compared to tell freshly opened popups from stale ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlRef(pub u64);

impl fmt::Display for ControlRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a lookup is rooted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The whole document
    Document,
    /// The subtree of a previously found control
    Within(ControlRef),
}

/// What the engine is looking for, independent of the target's markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// The pane whose id identifies the current screen
    ActiveContext,
    /// The top-level group selection control
    GroupSelector,
    /// One extractable row inside the active group
    LeafEntry,
    /// The control that expands a leaf's ownership menu
    ExpandTrigger,
    /// The first entry of an expanded ownership menu
    FirstMenuItem,
    /// A modal container opened by activating a menu item
    PopupContainer,
    /// A link to an ownership document
    DocumentLink,
    /// The control that closes a popup
    PopupClose,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ActiveContext => "active_context",
            Intent::GroupSelector => "group_selector",
            Intent::LeafEntry => "leaf_entry",
            Intent::ExpandTrigger => "expand_trigger",
            Intent::FirstMenuItem => "first_menu_item",
            Intent::PopupContainer => "popup_container",
            Intent::DocumentLink => "document_link",
            Intent::PopupClose => "popup_close",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a selection control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Opaque selection value
    pub value: String,
    /// Display text as rendered (untrimmed)
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self { value: value.into(), label: label.into() }
    }
}

/// Reads and mutates the live document on behalf of the traversal engine
pub trait UiAccessor {
    /// First control matching the intent; selector alternatives are tried in order
    fn find_single(&mut self, scope: Scope, intent: Intent) -> Result<Option<ControlRef>>;

    /// All controls matching the intent, in document order
    fn find_all(&mut self, scope: Scope, intent: Intent) -> Result<Vec<ControlRef>>;

    /// Options of a selection control, in display order
    fn list_options(&mut self, control: ControlRef) -> Result<Vec<SelectOption>>;

    fn selected_value(&mut self, control: ControlRef) -> Result<String>;

    fn set_selected_value(&mut self, control: ControlRef, value: &str) -> Result<()>;

    /// Tell the host page that the control's value changed
    fn dispatch_change(&mut self, control: ControlRef) -> Result<()>;

    /// Simulated click
    fn activate(&mut self, control: ControlRef) -> Result<()>;

    /// Rendered text of the control, untrimmed
    fn read_label(&mut self, control: ControlRef) -> Result<String>;

    fn read_attribute(&mut self, control: ControlRef, name: &str) -> Result<Option<String>>;

    /// Resolved link target of an anchor
    fn read_link_target(&mut self, control: ControlRef) -> Result<Option<String>>;
}
