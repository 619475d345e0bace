use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A selected decision-matrix file together with the header derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedDataset {
    pub name: String,
    pub bytes: Vec<u8>,
    pub header: Vec<String>,
}

impl UploadedDataset {
    /// The first column identifies the alternative; every other column is a criterion.
    pub fn criterion_count(&self) -> usize {
        self.header.len().saturating_sub(1)
    }
}

/// Raw weight and impact text as the user typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaSpec {
    pub weights_raw: String,
    pub impacts_raw: String,
}

/// Immutable snapshot of the form taken when a submission starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub file_name: String,
    pub file_bytes: Vec<u8>,
    pub weights_raw: String,
    pub impacts_raw: String,
    pub notify: bool,
    pub email: Option<String>,
}

/// One ranked row as returned by the scoring service, in the service's column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRow(pub Map<String, Value>);

impl ResultRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// What the scoring service reported about mailing the artifact itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMailStatus {
    pub sent: bool,
    pub error: Option<String>,
}

/// Canonical scoring outcome; every field has already been coerced at the client boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    pub table: Vec<ResultRow>,
    pub download_ref: Option<String>,
    pub server_mail: Option<ServerMailStatus>,
    pub received_at: DateTime<Utc>,
}

impl SubmissionResult {
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub email: String,
    pub result_link: String,
}

/// Identity of one scoring request within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
