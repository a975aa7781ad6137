//! Traversal engine
//!
//! Walks the two-level hierarchy of the community grid: every address in the
//! group selector, then every ownership row rendered for that address. Each
//! row goes through expand → pick first owner → read popup link → close, with
//! a fixed settle wait after every interaction.
//!
//! ```text
//! Idle → ContextChecking → GroupEnumerating
//!      → { GroupActivating → LeafEnumerating → LeafExtracting × n } × m
//!      → Finalizing → Done
//! ```
//!
//! Only `ContextChecking` and `GroupEnumerating` can abort a run. Failures
//! inside a group or a row are logged and skipped, and the run carries on.

pub mod record;
pub mod settle;

pub use record::{ExtractedRecord, ResultCollection};
pub use settle::{Clock, RecordingClock, SettlePolicy, SettleWait, SystemClock};

use crate::error::{Result, ScrapeError, ScrapeResult};
use crate::notify::{LogNotifier, Notice, Notifier};
use crate::sink::ResultSink;
use crate::ui::{ControlRef, Intent, Scope, SelectOption, UiAccessor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::ControlFlow;
use tokio_util::sync::CancellationToken;

/// Where the document link of an opened popup is searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LinkScope {
    /// Inside the popup container that appeared after the click, falling back
    /// to the whole document when no new container can be identified
    #[default]
    Popup,
    /// The whole document; the last match in DOM order wins
    Document,
}

/// Behavioral settings of a traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Substring the active pane's attribute must contain
    pub context_marker: String,

    /// Attribute of the active pane that is checked
    pub context_attribute: String,

    /// Selector value that stands for "uncategorized" and is never traversed
    pub sentinel_value: String,

    /// Owner label recorded when the menu entry has no text
    pub unknown_owner: String,

    /// Export file name without the `.json` extension
    pub output_base: String,

    pub link_scope: LinkScope,

    pub settle: SettlePolicy,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            context_marker: "CommunityCase".to_string(),
            context_attribute: "id".to_string(),
            sentinel_value: "0".to_string(),
            unknown_owner: "unknown".to_string(),
            output_base: "community_data".to_string(),
            link_scope: LinkScope::Popup,
            settle: SettlePolicy::default(),
        }
    }
}

impl TraversalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    pub fn link_scope(mut self, link_scope: LinkScope) -> Self {
        self.link_scope = link_scope;
        self
    }

    pub fn output_base(mut self, output_base: impl Into<String>) -> Self {
        self.output_base = output_base.into();
        self
    }

    /// `<community>_data`, the name downstream tooling looks for
    pub fn community(self, community: &str) -> Self {
        self.output_base(format!("{}_data", community))
    }

    pub fn unknown_owner(mut self, label: impl Into<String>) -> Self {
        self.unknown_owner = label.into();
        self
    }

    pub fn output_file_name(&self) -> String {
        format!("{}.json", self.output_base)
    }
}

/// One selectable top-level entry, snapshotted at run start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub identifier: String,
    pub label: String,
}

impl From<SelectOption> for Group {
    fn from(option: SelectOption) -> Self {
        Self { identifier: option.value, label: option.label.trim().to_string() }
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    ContextChecking,
    GroupEnumerating,
    GroupActivating { group: usize },
    LeafEnumerating { group: usize },
    LeafExtracting { group: usize, leaf: usize },
    Finalizing,
    Done,
    Aborted,
    Cancelled,
}

/// What happened to one leaf entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafOutcome {
    /// A record was appended
    Recorded,
    /// No expand trigger, or the expanded menu had no entry
    NoOwnershipRecord,
    /// The popup opened but no document link could be found
    NoDocumentLink,
    /// A UI operation failed; the entry was skipped
    Failed(String),
}

impl fmt::Display for LeafOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafOutcome::Recorded => f.write_str("recorded"),
            LeafOutcome::NoOwnershipRecord => f.write_str("no ownership record"),
            LeafOutcome::NoDocumentLink => f.write_str("no document link"),
            LeafOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafReport {
    pub group: usize,
    pub leaf: usize,
    pub outcome: LeafOutcome,
}

/// Run-scoped mutable state
///
/// Holds everything a traversal mutates, so the engine itself stays
/// immutable and a caller can observe progress or cancel from outside.
#[derive(Debug)]
pub struct RunContext {
    phase: RunPhase,
    group_index: usize,
    results: ResultCollection,
    outcomes: Vec<LeafReport>,
    cancel: CancellationToken,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            phase: RunPhase::Idle,
            group_index: 0,
            results: ResultCollection::new(),
            outcomes: Vec::new(),
            cancel,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Index of the group being (or last) processed
    pub fn group_index(&self) -> usize {
        self.group_index
    }

    pub fn results(&self) -> &ResultCollection {
        &self.results
    }

    pub fn outcomes(&self) -> &[LeafReport] {
        &self.outcomes
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Records were handed to the sink
    Exported { location: String },
    /// Nothing was found; the sink was not invoked
    Empty,
    /// Stopped through the cancellation token; the sink was not invoked
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub groups: usize,
    pub records: ResultCollection,
    pub outcomes: Vec<LeafReport>,
}

impl RunReport {
    pub fn count(&self, predicate: impl Fn(&LeafOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| *o != LeafOutcome::Recorded)
    }
}

/// Drives one extraction run against a [`UiAccessor`]
pub struct TraversalEngine {
    config: TraversalConfig,
    clock: Box<dyn Clock>,
    sink: Box<dyn ResultSink>,
    notifier: Box<dyn Notifier>,
}

impl TraversalEngine {
    pub fn new(config: TraversalConfig, sink: impl ResultSink + 'static) -> Self {
        Self { config, clock: Box::new(SystemClock), sink: Box::new(sink), notifier: Box::new(LogNotifier) }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Run a traversal with a fresh context
    pub fn run(&self, ui: &mut dyn UiAccessor) -> ScrapeResult<RunReport> {
        self.run_with_context(ui, &mut RunContext::new())
    }

    /// Run a traversal, keeping its state in `ctx`
    pub fn run_with_context(&self, ui: &mut dyn UiAccessor, ctx: &mut RunContext) -> ScrapeResult<RunReport> {
        log::info!("Starting extraction run");

        ctx.phase = RunPhase::ContextChecking;
        if let Err(e) = self.check_context(ui) {
            ctx.phase = RunPhase::Aborted;
            return Err(e);
        }

        ctx.phase = RunPhase::GroupEnumerating;
        let (selector, groups) = match self.enumerate_groups(ui) {
            Ok(found) => found,
            Err(e) => {
                ctx.phase = RunPhase::Aborted;
                return Err(e);
            }
        };

        log::info!("Found {} address(es)", groups.len());

        for (index, group) in groups.iter().enumerate() {
            if ctx.is_cancelled() {
                return Ok(self.finish_cancelled(ctx, groups.len()));
            }
            ctx.group_index = index;
            log::info!("[{}/{}] {}", index + 1, groups.len(), group.label);

            match self.process_group(ui, ctx, selector, group) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => return Ok(self.finish_cancelled(ctx, groups.len())),
                Err(e) => log::warn!("Skipping rest of '{}': {}", group.label, e),
            }
        }

        if ctx.is_cancelled() {
            return Ok(self.finish_cancelled(ctx, groups.len()));
        }

        self.finalize(ctx, groups.len())
    }

    fn check_context(&self, ui: &mut dyn UiAccessor) -> ScrapeResult<()> {
        let found = match ui.find_single(Scope::Document, Intent::ActiveContext)? {
            Some(pane) => ui.read_attribute(pane, &self.config.context_attribute)?,
            None => None,
        };

        let expected = &self.config.context_marker;
        if found.as_deref().is_some_and(|value| value.contains(expected.as_str())) {
            return Ok(());
        }

        self.notifier.notify(&Notice::WrongScreen { expected: expected.clone() });
        Err(ScrapeError::Context { expected: expected.clone(), found })
    }

    fn enumerate_groups(&self, ui: &mut dyn UiAccessor) -> ScrapeResult<(ControlRef, Vec<Group>)> {
        let Some(selector) = ui.find_single(Scope::Document, Intent::GroupSelector)? else {
            return Err(self.structural("the address selector"));
        };

        let groups: Vec<Group> = ui
            .list_options(selector)?
            .into_iter()
            .filter(|option| option.value != self.config.sentinel_value && !option.value.is_empty())
            .map(Group::from)
            .collect();

        if groups.is_empty() {
            return Err(self.structural("selectable addresses"));
        }

        Ok((selector, groups))
    }

    fn structural(&self, what: &str) -> ScrapeError {
        self.notifier.notify(&Notice::MissingControl { what: what.to_string() });
        ScrapeError::Structural { what: what.to_string() }
    }

    fn process_group(
        &self,
        ui: &mut dyn UiAccessor,
        ctx: &mut RunContext,
        selector: ControlRef,
        group: &Group,
    ) -> Result<ControlFlow<()>> {
        let group_index = ctx.group_index;
        ctx.phase = RunPhase::GroupActivating { group: group_index };

        if ui.selected_value(selector)? != group.identifier {
            ui.set_selected_value(selector, &group.identifier)?;
            ui.dispatch_change(selector)?;
        }
        // The grid gives no load signal, so wait even when the value was already selected
        self.settle(SettleWait::GroupActivation);

        ctx.phase = RunPhase::LeafEnumerating { group: group_index };
        let leaves = ui.find_all(Scope::Document, Intent::LeafEntry)?;
        if leaves.is_empty() {
            log::info!("  no ownership entries");
            return Ok(ControlFlow::Continue(()));
        }
        log::info!("  {} ownership entr{}", leaves.len(), if leaves.len() == 1 { "y" } else { "ies" });

        for (leaf_index, leaf) in leaves.into_iter().enumerate() {
            if ctx.is_cancelled() {
                return Ok(ControlFlow::Break(()));
            }
            ctx.phase = RunPhase::LeafExtracting { group: group_index, leaf: leaf_index };

            let outcome = self
                .extract_leaf(ui, ctx, group, leaf)
                .unwrap_or_else(|e| LeafOutcome::Failed(e.to_string()));

            match &outcome {
                LeafOutcome::Recorded => {}
                LeafOutcome::NoOwnershipRecord => log::info!("  entry {}: no ownership record", leaf_index + 1),
                other => log::warn!("  entry {} of '{}': {}", leaf_index + 1, group.label, other),
            }

            ctx.outcomes.push(LeafReport { group: group_index, leaf: leaf_index, outcome });
        }

        Ok(ControlFlow::Continue(()))
    }

    fn extract_leaf(
        &self,
        ui: &mut dyn UiAccessor,
        ctx: &mut RunContext,
        group: &Group,
        leaf: ControlRef,
    ) -> Result<LeafOutcome> {
        let Some(trigger) = ui.find_single(Scope::Within(leaf), Intent::ExpandTrigger)? else {
            return Ok(LeafOutcome::NoOwnershipRecord);
        };
        ui.activate(trigger)?;
        self.settle(SettleWait::MenuExpand);

        let Some(item) = ui.find_single(Scope::Within(leaf), Intent::FirstMenuItem)? else {
            return Ok(LeafOutcome::NoOwnershipRecord);
        };

        let label = ui.read_label(item)?;
        let owner = match label.trim() {
            "" => self.config.unknown_owner.clone(),
            trimmed => trimmed.to_string(),
        };

        let popups_before = match self.config.link_scope {
            LinkScope::Popup => ui.find_all(Scope::Document, Intent::PopupContainer)?,
            LinkScope::Document => Vec::new(),
        };

        ui.activate(item)?;
        self.settle(SettleWait::PopupLoad);

        // From here on a popup may be open, so the close step runs whatever happens
        let popup = match self.config.link_scope {
            LinkScope::Popup => ui
                .find_all(Scope::Document, Intent::PopupContainer)
                .map(|containers| containers.into_iter().rev().find(|c| !popups_before.contains(c))),
            LinkScope::Document => Ok(None),
        };
        let link = match &popup {
            Ok(container) => self.resolve_document_link(ui, *container),
            Err(_) => Ok(None),
        };

        if let Err(e) = self.close_popup(ui, popup.as_ref().ok().copied().flatten()) {
            log::debug!("  failed to close popup: {}", e);
        }
        self.settle(SettleWait::PopupClose);

        popup?;
        match link? {
            Some(url) => {
                log::info!("  recorded [{}] {}", group.label, owner);
                ctx.results.push(ExtractedRecord::new(group.label.clone(), owner, url));
                Ok(LeafOutcome::Recorded)
            }
            None => Ok(LeafOutcome::NoDocumentLink),
        }
    }

    /// Last document link of the opened popup, or of the whole page when the
    /// popup could not be identified
    fn resolve_document_link(&self, ui: &mut dyn UiAccessor, popup: Option<ControlRef>) -> Result<Option<String>> {
        match popup {
            Some(container) => {
                let links = ui.find_all(Scope::Within(container), Intent::DocumentLink)?;
                return match links.last() {
                    Some(&link) => ui.read_link_target(link),
                    None => Ok(None),
                };
            }
            None if self.config.link_scope == LinkScope::Popup => {
                log::debug!("  no new popup container appeared; searching the whole page");
            }
            None => {}
        }

        let links = ui.find_all(Scope::Document, Intent::DocumentLink)?;
        if links.len() > 1 {
            // Links of earlier popups that were never closed are still in the page
            log::debug!("  {} document links in page; taking the last one", links.len());
        }

        match links.last() {
            Some(&link) => ui.read_link_target(link),
            None => Ok(None),
        }
    }

    /// Best effort: a missing close control never blocks the run
    fn close_popup(&self, ui: &mut dyn UiAccessor, popup: Option<ControlRef>) -> Result<()> {
        let scoped = match popup {
            Some(container) => ui.find_single(Scope::Within(container), Intent::PopupClose)?,
            None => None,
        };

        let close = match scoped {
            Some(control) => Some(control),
            None => ui.find_single(Scope::Document, Intent::PopupClose)?,
        };

        match close {
            Some(control) => ui.activate(control),
            None => {
                log::debug!("  no popup close control found");
                Ok(())
            }
        }
    }

    fn settle(&self, wait: SettleWait) {
        let duration = self.config.settle.duration(wait);
        log::debug!("settle {:?} for {:?}", wait, duration);
        self.clock.sleep(wait, duration);
    }

    fn finalize(&self, ctx: &mut RunContext, groups: usize) -> ScrapeResult<RunReport> {
        ctx.phase = RunPhase::Finalizing;
        log::info!("Extraction finished: {} record(s)", ctx.results.len());

        if ctx.results.is_empty() {
            self.notifier.notify(&Notice::NoData);
            ctx.phase = RunPhase::Done;
            return Ok(self.report(ctx, RunStatus::Empty, groups));
        }

        let location = match self.sink.export(ctx.results.as_slice(), &self.config.output_file_name()) {
            Ok(location) => location,
            Err(e) => {
                ctx.phase = RunPhase::Aborted;
                return Err(e.into());
            }
        };

        ctx.phase = RunPhase::Done;
        Ok(self.report(ctx, RunStatus::Exported { location }, groups))
    }

    fn finish_cancelled(&self, ctx: &mut RunContext, groups: usize) -> RunReport {
        self.notifier.notify(&Notice::Cancelled { records: ctx.results.len() });
        ctx.phase = RunPhase::Cancelled;
        self.report(ctx, RunStatus::Cancelled, groups)
    }

    fn report(&self, ctx: &RunContext, status: RunStatus, groups: usize) -> RunReport {
        RunReport { status, groups, records: ctx.results.clone(), outcomes: ctx.outcomes.clone() }
    }
}
