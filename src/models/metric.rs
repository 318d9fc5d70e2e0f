use serde::{Deserialize, Serialize};

/// Canonical metric identifiers.
///
/// Declaration order is significant: the analyzer reports matched metrics in
/// this order, and summaries iterate it when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    Steps,
    Distance,
    ActiveCalories,
    ActiveMinutes,
    RestingHeartRate,
    HeartRate,
    #[serde(rename = "hrv")]
    HeartRateVariability,
    SleepHours,
    DeepSleepHours,
    Weight,
    BodyFat,
    CaloriesConsumed,
    Protein,
    Carbs,
    Fat,
    Water,
    Workouts,
}

impl MetricKey {
    pub const ALL: [MetricKey; 17] = [
        MetricKey::Steps,
        MetricKey::Distance,
        MetricKey::ActiveCalories,
        MetricKey::ActiveMinutes,
        MetricKey::RestingHeartRate,
        MetricKey::HeartRate,
        MetricKey::HeartRateVariability,
        MetricKey::SleepHours,
        MetricKey::DeepSleepHours,
        MetricKey::Weight,
        MetricKey::BodyFat,
        MetricKey::CaloriesConsumed,
        MetricKey::Protein,
        MetricKey::Carbs,
        MetricKey::Fat,
        MetricKey::Water,
        MetricKey::Workouts,
    ];

    /// Stable string identity, also used in persisted metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::Steps => "steps",
            MetricKey::Distance => "distance",
            MetricKey::ActiveCalories => "active_calories",
            MetricKey::ActiveMinutes => "active_minutes",
            MetricKey::RestingHeartRate => "resting_heart_rate",
            MetricKey::HeartRate => "heart_rate",
            MetricKey::HeartRateVariability => "hrv",
            MetricKey::SleepHours => "sleep_hours",
            MetricKey::DeepSleepHours => "deep_sleep_hours",
            MetricKey::Weight => "weight",
            MetricKey::BodyFat => "body_fat",
            MetricKey::CaloriesConsumed => "calories_consumed",
            MetricKey::Protein => "protein",
            MetricKey::Carbs => "carbs",
            MetricKey::Fat => "fat",
            MetricKey::Water => "water",
            MetricKey::Workouts => "workouts",
        }
    }

    pub fn from_id(s: &str) -> Option<Self> {
        MetricKey::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Human-readable label used by the text renderers.
    pub fn label(self) -> &'static str {
        match self {
            MetricKey::Steps => "steps",
            MetricKey::Distance => "distance",
            MetricKey::ActiveCalories => "active calories",
            MetricKey::ActiveMinutes => "active minutes",
            MetricKey::RestingHeartRate => "resting heart rate",
            MetricKey::HeartRate => "average heart rate",
            MetricKey::HeartRateVariability => "heart rate variability",
            MetricKey::SleepHours => "sleep",
            MetricKey::DeepSleepHours => "deep sleep",
            MetricKey::Weight => "weight",
            MetricKey::BodyFat => "body fat",
            MetricKey::CaloriesConsumed => "calories consumed",
            MetricKey::Protein => "protein",
            MetricKey::Carbs => "carbs",
            MetricKey::Fat => "fat",
            MetricKey::Water => "water",
            MetricKey::Workouts => "workout time",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKey::Steps => "",
            MetricKey::Distance => "km",
            MetricKey::ActiveCalories | MetricKey::CaloriesConsumed => "kcal",
            MetricKey::ActiveMinutes | MetricKey::Workouts => "min",
            MetricKey::RestingHeartRate | MetricKey::HeartRate => "bpm",
            MetricKey::HeartRateVariability => "ms",
            MetricKey::SleepHours | MetricKey::DeepSleepHours => "h",
            MetricKey::Weight => "kg",
            MetricKey::BodyFat => "%",
            MetricKey::Protein | MetricKey::Carbs | MetricKey::Fat => "g",
            MetricKey::Water => "ml",
        }
    }

    /// Whether a per-period total is meaningful (steps add up, weight does not).
    pub fn is_cumulative(self) -> bool {
        matches!(
            self,
            MetricKey::Steps
                | MetricKey::Distance
                | MetricKey::ActiveCalories
                | MetricKey::ActiveMinutes
                | MetricKey::CaloriesConsumed
                | MetricKey::Water
                | MetricKey::Workouts
        )
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
