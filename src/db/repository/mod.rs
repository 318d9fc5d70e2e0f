//! Repository layer: record-type-scoped database operations.
//!
//! Every read is filtered by `user_id` in the query predicate.

mod daily_metric;
mod health_event;
mod uploaded_file;

pub use daily_metric::*;
pub use health_event::*;
pub use uploaded_file::*;

use chrono::{NaiveDate, NaiveDateTime};

pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn format_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub(crate) fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

pub(crate) fn parse_datetime_column(
    idx: usize,
    value: &str,
) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn parse_date_column(idx: usize, value: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn parse_json_column<T: serde::de::DeserializeOwned>(
    idx: usize,
    value: &str,
) -> Result<T, rusqlite::Error> {
    serde_json::from_str(value).map_err(|e| conversion_error(idx, e))
}
