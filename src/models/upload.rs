use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inclusive span of dates a document declares it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One record extracted from a user document by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedEntry {
    pub date: Option<NaiveDate>,
    pub metrics: BTreeMap<String, serde_json::Value>,
    pub notes: Option<String>,
}

/// An uploaded document with file-level metadata and its extracted entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: Uuid,
    pub user_id: String,
    pub file_name: String,
    pub summary: Option<String>,
    pub categories: Vec<String>,
    pub date_range: Option<DeclaredDateRange>,
    pub uploaded_at: NaiveDateTime,
    pub entries: Vec<UploadedEntry>,
}

impl UploadedFile {
    /// Case-insensitive "any overlap" test against the declared categories.
    pub fn has_any_category(&self, wanted: &[String]) -> bool {
        self.categories
            .iter()
            .any(|c| wanted.iter().any(|w| w.eq_ignore_ascii_case(c)))
    }
}
