// Core structs: DetectionResult, Verdict, StoreImage, error enums
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;
use thiserror::Error;

/// One physical item spotted in a cooler photo.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DetectedObject {
    #[serde(rename = "object", default)]
    pub object_kind: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
impl DetectedObject {
    pub fn labeled(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::default()
        }
    }
}

/// The `auditable` signal comes back either as a flag or as free text ("Yes"/"No").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Auditable {
    Flag(bool),
    Text(String),
}

impl fmt::Display for Auditable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auditable::Flag(true) => f.write_str("Yes"),
            Auditable::Flag(false) => f.write_str("No"),
            Auditable::Text(text) => f.write_str(text),
        }
    }
}

/// Output of the label identification service, after validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResult {
    /// Kept as the service sent it; integers stay integers.
    pub chargeability_percentage: Option<Number>,
    pub auditable: Option<Auditable>,
    pub objects: Vec<DetectedObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purity {
    Pure,
    Impure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn from_bool(flag: bool) -> Self {
        if flag { YesNo::Yes } else { YesNo::No }
    }
}

impl fmt::Display for Purity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purity::Pure => f.write_str("Pure"),
            Purity::Impure => f.write_str("Impure"),
        }
    }
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YesNo::Yes => f.write_str("Yes"),
            YesNo::No => f.write_str("No"),
        }
    }
}

/// Classification of a single cooler photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub chargeability_percentage: Option<Number>,
    pub auditable: Option<Auditable>,
    pub purity: Purity,
    pub abused: YesNo,
    pub empty: YesNo,
    /// Raw labels of every non-matching object, `None` for unlabeled ones.
    pub non_coca_cola_products: Vec<Option<String>>,
}

/// Image row as handed to the analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreImage {
    pub image_id: i64,
    pub image_url: String,
}

/// Persisted per-image analysis state.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub image_id: i64,
    pub image_url: String,
    pub status: String,
    pub auditable_photo: Option<String>,
    pub purity: Option<String>,
    pub chargeability: Option<f64>,
    pub abused: Option<String>,
    pub emptyy: Option<String>,
    pub detected_objects: Vec<DetectedObject>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("identification timed out")]
    Timeout,
    #[error("missing api key: env var {0} is not set")]
    MissingApiKey(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Database(format!("json column: {}", e))
    }
}

/// Failure of one image inside a batch, or of the batch bookkeeping itself.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("identification failed: {0}")]
    Identify(#[from] IdentifyError),
    #[error("classification failed: {0}")]
    Classify(#[from] ClassifyError),
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
}
