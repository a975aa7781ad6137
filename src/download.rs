//! Document download
//!
//! Fetches the ownership document behind every exported record into one
//! directory. Files are named `<community>_file_<i>.pdf`, where `i` is the
//! record's position in the export, so a failed download leaves a gap rather
//! than shifting the names of later files.

use crate::engine::record::ExtractedRecord;
use crate::error::DownloadError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retrieves the bytes behind a document link
pub trait DocumentFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// Plain HTTP GET with a bounded timeout
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("owner-scrape/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownloadError::Request { url: String::new(), message: e.to_string() })?;

        Ok(Self { client })
    }
}

impl DocumentFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let request_error = |e: reqwest::Error| DownloadError::Request { url: url.to_string(), message: e.to_string() };

        let resp = self.client.get(url).send().map_err(request_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DownloadError::Status { url: url.to_string(), status: status.as_u16() });
        }

        Ok(resp.bytes().map_err(request_error)?.to_vec())
    }
}

/// `<community>_file_<index>.pdf`
pub fn document_file_name(community: &str, index: usize) -> String {
    format!("{}_file_{}.pdf", community, index)
}

/// Community name of an export file: `hi-city_data.json` → `hi-city`
pub fn community_from_export(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(stem.strip_suffix("_data").unwrap_or(stem).to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub index: usize,
    pub address: String,
    pub outcome: DownloadOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub entries: Vec<DownloadEntry>,
    /// Stopped through the cancellation token before every record was tried
    pub cancelled: bool,
}

impl DownloadReport {
    pub fn saved(&self) -> usize {
        self.entries.iter().filter(|e| matches!(e.outcome, DownloadOutcome::Saved(_))).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.saved()
    }
}

/// Download every record's document into `dir`, one at a time
///
/// A failing record is logged and skipped; only an unusable output directory
/// stops the batch.
pub fn download_documents(
    records: &[ExtractedRecord],
    dir: &Path,
    community: &str,
    fetcher: &dyn DocumentFetcher,
    cancel: &CancellationToken,
) -> Result<DownloadReport, DownloadError> {
    fs::create_dir_all(dir).map_err(|source| DownloadError::Io { path: dir.display().to_string(), source })?;

    let mut report = DownloadReport::default();

    for (index, record) in records.iter().enumerate() {
        if cancel.is_cancelled() {
            log::warn!("Download cancelled after {} of {} record(s)", index, records.len());
            report.cancelled = true;
            break;
        }

        let path = dir.join(document_file_name(community, index));
        let outcome = match save_document(fetcher, &record.url, &path) {
            Ok(()) => {
                log::info!("[{}/{}] {} -> {}", index + 1, records.len(), record.address, path.display());
                DownloadOutcome::Saved(path)
            }
            Err(e) => {
                log::warn!("Failed to download document for '{}': {}", record.address, e);
                DownloadOutcome::Failed(e.to_string())
            }
        };

        report.entries.push(DownloadEntry { index, address: record.address.clone(), outcome });
    }

    Ok(report)
}

fn save_document(fetcher: &dyn DocumentFetcher, url: &str, path: &Path) -> Result<(), DownloadError> {
    if url.trim().is_empty() {
        return Err(DownloadError::Request { url: String::new(), message: "record has no document link".to_string() });
    }

    let bytes = fetcher.fetch(url)?;
    fs::write(path, bytes).map_err(|source| DownloadError::Io { path: path.display().to_string(), source })
}
