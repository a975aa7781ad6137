//! # owner-scrape
//!
//! Extracts (address, owner, document link) records from a community
//! property grid by driving its UI over the Chrome DevTools Protocol (CDP).
//!
//! ## How a run works
//!
//! The operator opens the grid in Chrome, logs in and switches to the
//! two-dimensional view. A run then:
//!
//! 1. checks that the expected pane is active, and stops otherwise
//! 2. snapshots every address of the address selector
//! 3. selects each address and waits for the grid to repopulate
//! 4. for each ownership row: expands its menu, opens the first owner, reads
//!    the document link from the popup, closes the popup
//! 5. exports the records as pretty-printed JSON
//!
//! The page gives no completion signals, so every step is followed by a fixed
//! settle wait from [`engine::SettlePolicy`].
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use owner_scrape::{BrowserSession, ConnectionOptions, JsonFileSink, Selectors, TraversalConfig, TraversalEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Attach to a Chrome started with --remote-debugging-port
//! let session = BrowserSession::connect(ConnectionOptions::new("ws://127.0.0.1:9222/devtools/browser/<id>"))?;
//! let mut ui = session.accessor(Selectors::default())?;
//!
//! let engine = TraversalEngine::new(TraversalConfig::new().community("hi-city"), JsonFileSink::new("."));
//! let report = engine.run(&mut ui)?;
//! println!("{} record(s), status {:?}", report.records.len(), report.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing without a browser
//!
//! The engine only talks to the page through [`ui::UiAccessor`] and only
//! waits through [`engine::Clock`], so tests can drive it with a scripted
//! accessor and an [`engine::RecordingClock`].
//!
//! ## Module Overview
//!
//! - [`engine`]: traversal state machine, records, settle waits
//! - [`ui`]: accessor capability and the CDP implementation
//! - [`browser`]: browser session management and configuration
//! - [`sink`]: where finished result sets go
//! - [`notify`]: operator-facing notices
//! - [`config`]: JSON configuration file
//! - [`download`]: fetching the documents behind an export
//! - [`error`]: error types and result aliases

pub mod browser;
pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod notify;
pub mod sink;
pub mod ui;

pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use config::ScrapeConfig;
pub use engine::{
    ExtractedRecord, LeafOutcome, LinkScope, ResultCollection, RunContext, RunPhase, RunReport, RunStatus,
    SettlePolicy, TraversalConfig, TraversalEngine,
};
pub use download::{DocumentFetcher, DownloadReport, HttpFetcher, download_documents};
pub use error::{BrowserError, ConfigError, DownloadError, Result, ScrapeError, SinkError};
pub use notify::{LogNotifier, Notice, Notifier, PageAlertNotifier};
pub use sink::{BrowserDownloadSink, JsonFileSink, ResultSink};
pub use ui::{CdpAccessor, ControlRef, Intent, Scope, SelectOption, Selectors, UiAccessor};

pub use tokio_util::sync::CancellationToken;
