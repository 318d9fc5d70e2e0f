use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{conversion_error, format_datetime, parse_datetime_column, parse_json_column};
use crate::db::DatabaseError;
use crate::models::HealthEvent;

/// Insert a health event.
pub fn insert_health_event(conn: &Connection, e: &HealthEvent) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO health_events (id, user_id, event_type, title, description, start_time, end_time, duration_minutes, metrics_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            e.id.to_string(),
            e.user_id,
            e.event_type,
            e.title,
            e.description,
            format_datetime(&e.start_time),
            e.end_time.as_ref().map(format_datetime),
            e.duration_minutes,
            serde_json::to_string(&e.metrics)?,
        ],
    )?;
    Ok(())
}

/// Get a user's events starting within `[from, to]`, newest first.
///
/// `types`, when given, keeps only events whose type is in the list.
pub fn get_health_events_in_range(
    conn: &Connection,
    user_id: &str,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
    types: Option<&[String]>,
) -> Result<Vec<HealthEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, event_type, title, description, start_time, end_time, duration_minutes, metrics_json
         FROM health_events
         WHERE user_id = ?1 AND start_time >= ?2 AND start_time <= ?3
         ORDER BY start_time DESC",
    )?;
    let rows = stmt.query_map(
        params![user_id, format_datetime(from), format_datetime(to)],
        row_to_health_event,
    )?;
    let mut events = rows.collect::<Result<Vec<_>, _>>()?;

    if let Some(types) = types {
        events.retain(|e| types.iter().any(|t| t == &e.event_type));
    }

    Ok(events)
}

fn row_to_health_event(row: &rusqlite::Row) -> Result<HealthEvent, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let start_str: String = row.get(5)?;
    let end_str: Option<String> = row.get(6)?;
    let metrics_str: String = row.get(8)?;

    Ok(HealthEvent {
        id: Uuid::parse_str(&id_str).map_err(|e| conversion_error(0, e))?,
        user_id: row.get(1)?,
        event_type: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        start_time: parse_datetime_column(5, &start_str)?,
        end_time: end_str
            .as_deref()
            .map(|s| parse_datetime_column(6, s))
            .transpose()?,
        duration_minutes: row.get(7)?,
        metrics: parse_json_column(8, &metrics_str)?,
    })
}
