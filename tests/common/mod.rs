//! Scripted in-memory stand-in for the community grid
//!
//! Mimics the behaviors the engine relies on: the grid only repopulates after
//! a change event, popups accumulate in the document until closed, and the
//! same element always yields the same control ref.

#![allow(dead_code)]

use owner_scrape::engine::{Clock, SettleWait};
use owner_scrape::{
    BrowserError, CancellationToken, ControlRef, ExtractedRecord, Intent, Notice, Notifier, ResultSink, Scope,
    SelectOption, SinkError, UiAccessor,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Clone)]
pub struct FakeLeaf {
    pub trigger: bool,
    pub owners: Vec<String>,
    pub link: Option<String>,
    pub closable: bool,
    pub broken: bool,
    pub unreadable_link: bool,
}

impl FakeLeaf {
    fn row(trigger: bool, owners: &[&str], link: Option<&str>) -> Self {
        Self {
            trigger,
            owners: owners.iter().map(|o| o.to_string()).collect(),
            link: link.map(str::to_string),
            closable: true,
            broken: false,
            unreadable_link: false,
        }
    }

    /// Row whose first owner opens a popup with a document link
    pub fn owner(owner: &str, link: &str) -> Self {
        Self::row(true, &[owner], Some(link))
    }

    /// Row without the dropdown trigger
    pub fn no_trigger() -> Self {
        Self::row(false, &[], None)
    }

    /// Row whose dropdown expands to an empty menu
    pub fn empty_menu() -> Self {
        Self::row(true, &[], None)
    }

    /// Row whose popup renders without a document link
    pub fn no_link(owner: &str) -> Self {
        Self::row(true, &[owner], None)
    }

    /// Popup of this row has no close control and stays in the document
    pub fn unclosable(mut self) -> Self {
        self.closable = false;
        self
    }

    /// Clicking the owner entry fails
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    /// The popup opens but reading its link fails
    pub fn unreadable_link(mut self) -> Self {
        self.unreadable_link = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeGroup {
    pub value: String,
    pub label: String,
    pub leaves: Vec<FakeLeaf>,
}

impl FakeGroup {
    pub fn new(value: &str, label: &str, leaves: Vec<FakeLeaf>) -> Self {
        Self { value: value.to_string(), label: label.to_string(), leaves }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Node {
    Pane,
    Selector,
    Leaf { group: String, index: usize },
    Trigger { group: String, index: usize },
    Item { group: String, index: usize },
    Popup(usize),
    Link(usize),
    Close(usize),
}

#[derive(Debug, Clone)]
struct Popup {
    link: Option<String>,
    closable: bool,
    unreadable: bool,
    open: bool,
}

/// Something the engine did to the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ListOptions,
    Select(String),
    Change,
    Expand { group: String, index: usize },
    OpenOwner { group: String, index: usize },
    ClosePopup(usize),
}

pub struct FakePage {
    pub pane_id: Option<String>,
    pub has_selector: bool,
    pub popup_containers: bool,
    pub sentinel_label: Option<String>,
    pub groups: Vec<FakeGroup>,
    selected: String,
    rendered: Option<String>,
    popups: Vec<Popup>,
    refs: HashMap<Node, u64>,
    nodes: HashMap<u64, Node>,
    events: Vec<Event>,
}

impl FakePage {
    /// Page on the right screen, sentinel option selected and nothing rendered yet
    pub fn new(groups: Vec<FakeGroup>) -> Self {
        Self {
            pane_id: Some("tabCommunityCase".to_string()),
            has_selector: true,
            popup_containers: true,
            sentinel_label: Some("未歸類".to_string()),
            groups,
            selected: "0".to_string(),
            rendered: None,
            popups: Vec::new(),
            refs: HashMap::new(),
            nodes: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Pretend the host page already shows the given group
    pub fn preselect(mut self, value: &str) -> Self {
        self.selected = value.to_string();
        self.rendered = Some(value.to_string());
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn open_popups(&self) -> usize {
        self.popups.iter().filter(|p| p.open).count()
    }

    fn id(&mut self, node: Node) -> ControlRef {
        if let Some(&id) = self.refs.get(&node) {
            return ControlRef(id);
        }
        let id = self.refs.len() as u64 + 1;
        self.refs.insert(node.clone(), id);
        self.nodes.insert(id, node);
        ControlRef(id)
    }

    fn node(&self, control: ControlRef) -> Result<Node> {
        self.nodes.get(&control.0).cloned().ok_or(BrowserError::UnknownControl(control.0))
    }

    fn leaf(&self, group: &str, index: usize) -> Option<&FakeLeaf> {
        self.groups.iter().find(|g| g.value == group).and_then(|g| g.leaves.get(index))
    }

    fn open_popup_indices(&self) -> Vec<usize> {
        self.popups.iter().enumerate().filter(|(_, p)| p.open).map(|(i, _)| i).collect()
    }
}

impl UiAccessor for FakePage {
    fn find_single(&mut self, scope: Scope, intent: Intent) -> Result<Option<ControlRef>> {
        let found = match (scope, intent) {
            (Scope::Document, Intent::ActiveContext) => self.pane_id.as_ref().map(|_| Node::Pane),
            (Scope::Document, Intent::GroupSelector) => self.has_selector.then_some(Node::Selector),
            (Scope::Within(control), Intent::ExpandTrigger) => match self.node(control)? {
                Node::Leaf { group, index } => {
                    let present = self.leaf(&group, index).is_some_and(|l| l.trigger);
                    present.then_some(Node::Trigger { group, index })
                }
                _ => None,
            },
            (Scope::Within(control), Intent::FirstMenuItem) => match self.node(control)? {
                Node::Leaf { group, index } => {
                    let present = self.leaf(&group, index).is_some_and(|l| !l.owners.is_empty());
                    present.then_some(Node::Item { group, index })
                }
                _ => None,
            },
            (Scope::Within(control), Intent::PopupClose) => match self.node(control)? {
                Node::Popup(p) if self.popups[p].open && self.popups[p].closable => Some(Node::Close(p)),
                _ => None,
            },
            // First match in document order, like querySelector
            (Scope::Document, Intent::PopupClose) => self
                .open_popup_indices()
                .into_iter()
                .find(|&p| self.popups[p].closable)
                .map(Node::Close),
            _ => None,
        };

        Ok(found.map(|node| self.id(node)))
    }

    fn find_all(&mut self, scope: Scope, intent: Intent) -> Result<Vec<ControlRef>> {
        let nodes: Vec<Node> = match (scope, intent) {
            (Scope::Document, Intent::LeafEntry) => match &self.rendered {
                Some(value) => {
                    let count = self.groups.iter().find(|g| &g.value == value).map_or(0, |g| g.leaves.len());
                    (0..count).map(|index| Node::Leaf { group: value.clone(), index }).collect()
                }
                None => Vec::new(),
            },
            (Scope::Document, Intent::PopupContainer) if self.popup_containers => {
                self.open_popup_indices().into_iter().map(Node::Popup).collect()
            }
            (Scope::Document, Intent::DocumentLink) => self
                .open_popup_indices()
                .into_iter()
                .filter(|&p| self.popups[p].link.is_some())
                .map(Node::Link)
                .collect(),
            (Scope::Within(control), Intent::DocumentLink) => match self.node(control)? {
                Node::Popup(p) if self.popups[p].link.is_some() => vec![Node::Link(p)],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        Ok(nodes.into_iter().map(|node| self.id(node)).collect())
    }

    fn list_options(&mut self, control: ControlRef) -> Result<Vec<SelectOption>> {
        match self.node(control)? {
            Node::Selector => {
                self.events.push(Event::ListOptions);
                let mut options = Vec::new();
                if let Some(label) = &self.sentinel_label {
                    options.push(SelectOption::new("0", label.clone()));
                }
                options.extend(self.groups.iter().map(|g| SelectOption::new(g.value.clone(), format!(" {} ", g.label))));
                Ok(options)
            }
            other => Err(BrowserError::InvalidResponse(format!("{:?} is not a select", other))),
        }
    }

    fn selected_value(&mut self, control: ControlRef) -> Result<String> {
        self.node(control)?;
        Ok(self.selected.clone())
    }

    fn set_selected_value(&mut self, control: ControlRef, value: &str) -> Result<()> {
        self.node(control)?;
        self.selected = value.to_string();
        self.events.push(Event::Select(value.to_string()));
        Ok(())
    }

    fn dispatch_change(&mut self, control: ControlRef) -> Result<()> {
        self.node(control)?;
        self.rendered = Some(self.selected.clone());
        self.events.push(Event::Change);
        Ok(())
    }

    fn activate(&mut self, control: ControlRef) -> Result<()> {
        match self.node(control)? {
            Node::Trigger { group, index } => self.events.push(Event::Expand { group, index }),
            Node::Item { group, index } => {
                let leaf = self.leaf(&group, index).cloned().ok_or(BrowserError::ElementNotFound(control.to_string()))?;
                if leaf.broken {
                    return Err(BrowserError::ElementNotFound(format!("{} detached", control)));
                }
                self.popups.push(Popup {
                    link: leaf.link,
                    closable: leaf.closable,
                    unreadable: leaf.unreadable_link,
                    open: true,
                });
                self.events.push(Event::OpenOwner { group, index });
            }
            Node::Close(p) => {
                self.popups[p].open = false;
                self.events.push(Event::ClosePopup(p));
            }
            _ => {}
        }
        Ok(())
    }

    fn read_label(&mut self, control: ControlRef) -> Result<String> {
        match self.node(control)? {
            Node::Item { group, index } => Ok(self.leaf(&group, index).map(|l| l.owners[0].clone()).unwrap_or_default()),
            _ => Ok(String::new()),
        }
    }

    fn read_attribute(&mut self, control: ControlRef, name: &str) -> Result<Option<String>> {
        match (self.node(control)?, name) {
            (Node::Pane, "id") => Ok(self.pane_id.clone()),
            _ => Ok(None),
        }
    }

    fn read_link_target(&mut self, control: ControlRef) -> Result<Option<String>> {
        match self.node(control)? {
            Node::Link(p) if self.popups[p].unreadable => {
                Err(BrowserError::ElementNotFound(format!("{} detached", control)))
            }
            Node::Link(p) => Ok(self.popups[p].link.clone()),
            _ => Ok(None),
        }
    }
}

/// Sink that keeps every export call
#[derive(Clone, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<(Vec<ExtractedRecord>, String)>>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<(Vec<ExtractedRecord>, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ResultSink for RecordingSink {
    fn export(&self, records: &[ExtractedRecord], suggested_name: &str) -> std::result::Result<String, SinkError> {
        self.calls.lock().unwrap().push((records.to_vec(), suggested_name.to_string()));
        Ok(format!("memory:{}", suggested_name))
    }
}

/// Notifier that keeps every notice
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// Clock that cancels a token once a given wait has been requested `after` times
pub struct CancellingClock {
    token: CancellationToken,
    wait: SettleWait,
    after: usize,
    seen: AtomicUsize,
}

impl CancellingClock {
    pub fn new(token: CancellationToken, wait: SettleWait, after: usize) -> Self {
        Self { token, wait, after, seen: AtomicUsize::new(0) }
    }
}

impl Clock for CancellingClock {
    fn sleep(&self, wait: SettleWait, _duration: Duration) {
        if wait == self.wait && self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
            self.token.cancel();
        }
    }
}
