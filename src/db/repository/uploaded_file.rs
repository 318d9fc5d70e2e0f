use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{
    conversion_error, format_date, format_datetime, parse_date_column, parse_datetime_column,
    parse_json_column,
};
use crate::db::DatabaseError;
use crate::models::{DeclaredDateRange, UploadedEntry, UploadedFile};

/// Insert an uploaded file and all of its extracted entries atomically.
pub fn insert_uploaded_file(conn: &Connection, file: &UploadedFile) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO uploaded_files (id, user_id, file_name, summary, categories_json, range_start, range_end, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            file.id.to_string(),
            file.user_id,
            file.file_name,
            file.summary,
            serde_json::to_string(&file.categories)?,
            file.date_range.as_ref().map(|r| format_date(&r.start)),
            file.date_range.as_ref().map(|r| format_date(&r.end)),
            format_datetime(&file.uploaded_at),
        ],
    )?;

    for (position, entry) in file.entries.iter().enumerate() {
        tx.execute(
            "INSERT INTO uploaded_entries (file_id, position, entry_date, metrics_json, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                file.id.to_string(),
                position as i64,
                entry.date.as_ref().map(format_date),
                serde_json::to_string(&entry.metrics)?,
                entry.notes,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Files that can matter for a window: no declared range, a declared range
/// overlapping `[?2, ?3]`, or an upload at or after `?4` (NULL keeps all).
const WINDOW_PREDICATE: &str = "f.user_id = ?1
           AND (f.range_start IS NULL OR f.range_end IS NULL
                OR (f.range_start <= ?3 AND f.range_end >= ?2)
                OR ?4 IS NULL OR f.uploaded_at >= ?4)";

/// Get a user's uploaded files relevant to `[from, to]`, newest upload first,
/// with their entries.
///
/// Entries for all matching files are read in one query. Category matching
/// is left to the caller.
pub fn get_uploaded_files_in_window(
    conn: &Connection,
    user_id: &str,
    from: &NaiveDate,
    to: &NaiveDate,
    uploaded_since: Option<&NaiveDateTime>,
) -> Result<Vec<UploadedFile>, DatabaseError> {
    let from = format_date(from);
    let to = format_date(to);
    let since = uploaded_since.map(format_datetime);

    let mut stmt = conn.prepare(&format!(
        "SELECT f.id, f.user_id, f.file_name, f.summary, f.categories_json, f.range_start, f.range_end, f.uploaded_at
         FROM uploaded_files f
         WHERE {WINDOW_PREDICATE}
         ORDER BY f.uploaded_at DESC"
    ))?;
    let rows = stmt.query_map(params![user_id, from, to, since], row_to_uploaded_file)?;
    let mut files = rows.collect::<Result<Vec<_>, _>>()?;

    if files.is_empty() {
        return Ok(files);
    }

    let mut entries = get_entries_in_window(conn, user_id, &from, &to, since.as_deref())?;
    for file in &mut files {
        file.entries = entries.remove(&file.id.to_string()).unwrap_or_default();
    }

    Ok(files)
}

/// Entries of every file matching the window predicate, grouped by file id
/// in upload position order.
fn get_entries_in_window(
    conn: &Connection,
    user_id: &str,
    from: &str,
    to: &str,
    since: Option<&str>,
) -> Result<HashMap<String, Vec<UploadedEntry>>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT e.file_id, e.entry_date, e.metrics_json, e.notes
         FROM uploaded_entries e
         JOIN uploaded_files f ON f.id = e.file_id
         WHERE {WINDOW_PREDICATE}
         ORDER BY e.file_id, e.position ASC"
    ))?;
    let rows = stmt.query_map(params![user_id, from, to, since], |row| {
        let file_id: String = row.get(0)?;
        let date_str: Option<String> = row.get(1)?;
        let metrics_str: String = row.get(2)?;
        let entry = UploadedEntry {
            date: date_str
                .as_deref()
                .map(|s| parse_date_column(1, s))
                .transpose()?,
            metrics: parse_json_column(2, &metrics_str)?,
            notes: row.get(3)?,
        };
        Ok((file_id, entry))
    })?;

    let mut grouped: HashMap<String, Vec<UploadedEntry>> = HashMap::new();
    for row in rows {
        let (file_id, entry) = row?;
        grouped.entry(file_id).or_default().push(entry);
    }
    Ok(grouped)
}

fn row_to_uploaded_file(row: &rusqlite::Row) -> Result<UploadedFile, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let categories_str: String = row.get(4)?;
    let range_start: Option<String> = row.get(5)?;
    let range_end: Option<String> = row.get(6)?;
    let uploaded_str: String = row.get(7)?;

    let date_range = match (range_start, range_end) {
        (Some(start), Some(end)) => Some(DeclaredDateRange {
            start: parse_date_column(5, &start)?,
            end: parse_date_column(6, &end)?,
        }),
        _ => None,
    };

    Ok(UploadedFile {
        id: Uuid::parse_str(&id_str).map_err(|e| conversion_error(0, e))?,
        user_id: row.get(1)?,
        file_name: row.get(2)?,
        summary: row.get(3)?,
        categories: parse_json_column(4, &categories_str)?,
        date_range,
        uploaded_at: parse_datetime_column(7, &uploaded_str)?,
        entries: Vec::new(),
    })
}
