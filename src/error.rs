//! Error types for owner-scrape
//!
//! Only two run-level errors are fatal ([`ScrapeError::Context`] and
//! [`ScrapeError::Structural`]). Everything that goes wrong inside a single
//! group or leaf is downgraded by the engine to a logged skip.

use thiserror::Error;

/// Errors raised while talking to the browser
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    /// A previously resolved control is no longer attached to the document
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A control ref that was never handed out by this accessor
    #[error("Unknown control ref {0}")]
    UnknownControl(u64),

    #[error("Invalid response from page: {0}")]
    InvalidResponse(String),
}

/// Run-level errors returned by the traversal engine
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The run was started outside the expected screen
    #[error("Wrong screen: expected the active pane to contain '{expected}', found {found:?}")]
    Context { expected: String, found: Option<String> },

    /// A required top-level control is missing or yields no groups
    #[error("Required control missing: {what}")]
    Structural { what: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Export failed: {0}")]
    Export(#[from] SinkError),
}

/// Errors raised by result sinks
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Errors raised while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while fetching exported documents
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Request for {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for browser-level operations
pub type Result<T> = std::result::Result<T, BrowserError>;

/// Result type for a traversal run
pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;
