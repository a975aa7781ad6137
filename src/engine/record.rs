use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One extracted (address, owner, document link) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Label of the group (address) the entry belongs to
    pub address: String,

    /// Owner label, or the configured unknown-owner marker
    pub owner: String,

    /// Ownership document link
    pub url: String,
}

impl ExtractedRecord {
    pub fn new(address: impl Into<String>, owner: impl Into<String>, url: impl Into<String>) -> Self {
        Self { address: address.into(), owner: owner.into(), url: url.into() }
    }
}

/// Exported files come in two shapes: objects, or `[address, owner, url]` rows
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordRow {
    Object(ExtractedRecord),
    Positional(String, String, String),
}

impl From<RecordRow> for ExtractedRecord {
    fn from(row: RecordRow) -> Self {
        match row {
            RecordRow::Object(record) => record,
            RecordRow::Positional(address, owner, url) => ExtractedRecord { address, owner, url },
        }
    }
}

/// Ordered, append-only result set of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultCollection {
    records: Vec<ExtractedRecord>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ExtractedRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtractedRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[ExtractedRecord] {
        &self.records
    }

    /// Record count per address, in first-seen order
    pub fn per_address(&self) -> IndexMap<&str, usize> {
        let mut tally = IndexMap::new();
        for record in &self.records {
            *tally.entry(record.address.as_str()).or_insert(0) += 1;
        }
        tally
    }

    /// Parse an export in either the object or the positional form
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let rows: Vec<RecordRow> = serde_json::from_str(json)?;
        Ok(Self { records: rows.into_iter().map(ExtractedRecord::from).collect() })
    }
}

impl From<Vec<ExtractedRecord>> for ResultCollection {
    fn from(records: Vec<ExtractedRecord>) -> Self {
        Self { records }
    }
}

impl<'a> IntoIterator for &'a ResultCollection {
    type Item = &'a ExtractedRecord;
    type IntoIter = std::slice::Iter<'a, ExtractedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Pretty-print a record slice the way every sink writes it
pub fn to_pretty_json(records: &[ExtractedRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}
