use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::metric::MetricKey;

/// One pre-aggregated row per user per calendar day.
///
/// Sparse: a `None` field means the value was never recorded, which is not
/// the same as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyMetric {
    pub user_id: String,
    pub date: NaiveDate,
    pub steps: Option<f64>,
    pub distance_km: Option<f64>,
    pub active_calories: Option<f64>,
    pub active_minutes: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub hrv_ms: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub deep_sleep_hours: Option<f64>,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub calories_consumed: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub water_ml: Option<f64>,
    pub workout_minutes: Option<f64>,
}

impl DailyMetric {
    pub fn new(user_id: &str, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            ..Default::default()
        }
    }

    pub fn value(&self, key: MetricKey) -> Option<f64> {
        match key {
            MetricKey::Steps => self.steps,
            MetricKey::Distance => self.distance_km,
            MetricKey::ActiveCalories => self.active_calories,
            MetricKey::ActiveMinutes => self.active_minutes,
            MetricKey::RestingHeartRate => self.resting_heart_rate,
            MetricKey::HeartRate => self.avg_heart_rate,
            MetricKey::HeartRateVariability => self.hrv_ms,
            MetricKey::SleepHours => self.sleep_hours,
            MetricKey::DeepSleepHours => self.deep_sleep_hours,
            MetricKey::Weight => self.weight_kg,
            MetricKey::BodyFat => self.body_fat_pct,
            MetricKey::CaloriesConsumed => self.calories_consumed,
            MetricKey::Protein => self.protein_g,
            MetricKey::Carbs => self.carbs_g,
            MetricKey::Fat => self.fat_g,
            MetricKey::Water => self.water_ml,
            MetricKey::Workouts => self.workout_minutes,
        }
    }

    /// True when no metric field carries a value.
    pub fn is_empty(&self) -> bool {
        MetricKey::ALL.iter().all(|k| self.value(*k).is_none())
    }
}
