use chrono::NaiveDate;
use rusqlite::{params, Connection};

use super::{format_date, parse_date_column};
use crate::db::DatabaseError;
use crate::models::DailyMetric;

const DAILY_METRIC_COLUMNS: &str = "user_id, date, steps, distance_km, active_calories, active_minutes,
     resting_heart_rate, avg_heart_rate, hrv_ms, sleep_hours, deep_sleep_hours, weight_kg,
     body_fat_pct, calories_consumed, protein_g, carbs_g, fat_g, water_ml, workout_minutes";

/// Insert or replace the rollup for one user-day.
pub fn upsert_daily_metric(conn: &Connection, m: &DailyMetric) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO daily_metrics ({DAILY_METRIC_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            m.user_id,
            format_date(&m.date),
            m.steps,
            m.distance_km,
            m.active_calories,
            m.active_minutes,
            m.resting_heart_rate,
            m.avg_heart_rate,
            m.hrv_ms,
            m.sleep_hours,
            m.deep_sleep_hours,
            m.weight_kg,
            m.body_fat_pct,
            m.calories_consumed,
            m.protein_g,
            m.carbs_g,
            m.fat_g,
            m.water_ml,
            m.workout_minutes,
        ],
    )?;
    Ok(())
}

/// Get a user's daily rollups for an inclusive date range, ordered by date ascending.
pub fn get_daily_metrics_in_range(
    conn: &Connection,
    user_id: &str,
    from: &NaiveDate,
    to: &NaiveDate,
) -> Result<Vec<DailyMetric>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DAILY_METRIC_COLUMNS}
         FROM daily_metrics
         WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
         ORDER BY date ASC"
    ))?;
    let rows = stmt.query_map(
        params![user_id, format_date(from), format_date(to)],
        row_to_daily_metric,
    )?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn row_to_daily_metric(row: &rusqlite::Row) -> Result<DailyMetric, rusqlite::Error> {
    let date_str: String = row.get(1)?;

    Ok(DailyMetric {
        user_id: row.get(0)?,
        date: parse_date_column(1, &date_str)?,
        steps: row.get(2)?,
        distance_km: row.get(3)?,
        active_calories: row.get(4)?,
        active_minutes: row.get(5)?,
        resting_heart_rate: row.get(6)?,
        avg_heart_rate: row.get(7)?,
        hrv_ms: row.get(8)?,
        sleep_hours: row.get(9)?,
        deep_sleep_hours: row.get(10)?,
        weight_kg: row.get(11)?,
        body_fat_pct: row.get(12)?,
        calories_consumed: row.get(13)?,
        protein_g: row.get(14)?,
        carbs_g: row.get(15)?,
        fat_g: row.get(16)?,
        water_ml: row.get(17)?,
        workout_minutes: row.get(18)?,
    })
}
