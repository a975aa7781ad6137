//! Result sinks
//!
//! A sink receives the finished result collection exactly once, read-only.
//! Two deliveries are provided: a pretty-printed JSON file on disk and an
//! in-page download (the way the grid's own export links work).

use crate::engine::record::{ExtractedRecord, to_pretty_json};
use crate::error::{BrowserError, SinkError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use headless_chrome::Tab;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Persists a completed result collection
pub trait ResultSink {
    /// Export the records under the suggested file name; returns where they went
    fn export(&self, records: &[ExtractedRecord], suggested_name: &str) -> Result<String, SinkError>;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn export(&self, records: &[ExtractedRecord], suggested_name: &str) -> Result<String, SinkError> {
        (**self).export(records, suggested_name)
    }
}

/// Writes `<dir>/<suggested_name>`
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ResultSink for JsonFileSink {
    fn export(&self, records: &[ExtractedRecord], suggested_name: &str) -> Result<String, SinkError> {
        let json = to_pretty_json(records)?;

        fs::create_dir_all(&self.dir)
            .map_err(|source| SinkError::Io { path: self.dir.display().to_string(), source })?;

        let path = self.dir.join(suggested_name);
        fs::write(&path, json).map_err(|source| SinkError::Io { path: path.display().to_string(), source })?;

        log::info!("Wrote {} record(s) to {}", records.len(), path.display());
        Ok(path.display().to_string())
    }
}

/// Triggers a browser download of the JSON through a temporary anchor
pub struct BrowserDownloadSink {
    tab: Arc<Tab>,
}

impl BrowserDownloadSink {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }
}

/// Script that clicks a `download` anchor pointing at a base64 data URL
fn download_script(json: &str, file_name: &str) -> Result<String, SinkError> {
    let data_url = format!("data:application/json;charset=utf-8;base64,{}", STANDARD.encode(json.as_bytes()));
    Ok(format!(
        "(function () {{ const a = document.createElement('a'); a.setAttribute('href', {}); a.setAttribute('download', {}); document.body.appendChild(a); a.click(); a.remove(); return true; }})()",
        serde_json::to_string(&data_url)?,
        serde_json::to_string(file_name)?
    ))
}

impl ResultSink for BrowserDownloadSink {
    fn export(&self, records: &[ExtractedRecord], suggested_name: &str) -> Result<String, SinkError> {
        let json = to_pretty_json(records)?;
        let script = download_script(&json, suggested_name)?;

        self.tab
            .evaluate(&script, false)
            .map_err(|e| SinkError::Browser(BrowserError::EvaluationFailed(e.to_string())))?;

        log::info!("Triggered browser download of {} ({} record(s))", suggested_name, records.len());
        Ok(format!("browser download: {}", suggested_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_json_file_sink_writes_pretty_json() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("exports");
        let sink = JsonFileSink::new(&dir);
        let records = vec![
            ExtractedRecord::new("A", "Owner A", "https://x/pdf/1/"),
            ExtractedRecord::new("B", "Owner B", "https://x/pdf/2/"),
        ];

        let location = sink.export(&records, "community_data.json").unwrap();
        assert!(location.ends_with("community_data.json"));

        let written = fs::read_to_string(dir.join("community_data.json")).unwrap();
        assert_eq!(written, serde_json::to_string_pretty(&records).unwrap());
    }

    #[test]
    fn test_json_file_sink_leaves_input_untouched() {
        let tmp = TempDir::new().unwrap();
        let sink = JsonFileSink::new(tmp.path());
        let records = vec![ExtractedRecord::new("Z", "o", "u"), ExtractedRecord::new("A", "o", "u")];
        let before = records.clone();

        sink.export(&records, "out.json").unwrap();
        assert_eq!(records, before);
        assert!(tmp.path().join("out.json").exists());
    }

    #[test]
    fn test_download_script_embeds_base64_payload() {
        let script = download_script("[]", "首馥_data.json").unwrap();
        assert!(script.contains("data:application/json;charset=utf-8;base64,W10="));
        assert!(script.contains("\"首馥_data.json\""));
    }
}
