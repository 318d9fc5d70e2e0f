//! Natural-language time references -> concrete windows.
//!
//! Rules are tried in order and the first match wins; later patterns are
//! broader than earlier ones. All arithmetic is on host-local naive time.
//! The phrase tables live in a `TimeVocabulary` so callers can inject their
//! own wording alongside the keyword tables in `Vocabulary`.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use super::types::TimeRange;

/// Window used for "recently", "lately" and friends.
pub const RECENT_WINDOW_DAYS: u32 = 7;

/// Unit captured by the "last N units" rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Week,
    Month,
}

impl TimeUnit {
    fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
        }
    }
}

/// Raw phrase table, one pattern per rule, matched against lowercased text.
#[derive(Debug, Clone, Copy)]
pub struct TimePatterns<'a> {
    pub today: &'a str,
    pub yesterday: &'a str,
    pub this_week: &'a str,
    pub last_week: &'a str,
    pub this_month: &'a str,
    pub last_month: &'a str,
    /// Group 1 is the count (digits or a number word), group 2 the unit word.
    pub last_n_units: &'a str,
    pub recent: &'a str,
    pub number_words: &'a [(&'a str, u32)],
    pub unit_words: &'a [(&'a str, TimeUnit)],
}

pub const DEFAULT_TIME_PATTERNS: TimePatterns<'static> = TimePatterns {
    today: r"\b(?:today|tonight)\b",
    yesterday: r"\byesterday\b|\blast night\b",
    this_week: r"\bthis week\b",
    last_week: r"\b(?:last|previous) week\b",
    this_month: r"\bthis month\b",
    last_month: r"\b(?:last|previous) month\b",
    last_n_units: r"\b(?:last|past|previous)\s+(\d+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s+(day|week|month)s?\b",
    recent: r"\b(?:recently|lately|currently|now)\b",
    number_words: &[
        ("one", 1),
        ("two", 2),
        ("three", 3),
        ("four", 4),
        ("five", 5),
        ("six", 6),
        ("seven", 7),
        ("eight", 8),
        ("nine", 9),
        ("ten", 10),
        ("eleven", 11),
        ("twelve", 12),
    ],
    unit_words: &[
        ("day", TimeUnit::Day),
        ("week", TimeUnit::Week),
        ("month", TimeUnit::Month),
    ],
};

static DEFAULT_TIME_VOCABULARY: LazyLock<TimeVocabulary> =
    LazyLock::new(|| TimeVocabulary::new(&DEFAULT_TIME_PATTERNS).unwrap());

/// Compiled time-reference rules for one analyzer instance.
#[derive(Debug, Clone)]
pub struct TimeVocabulary {
    today: Regex,
    yesterday: Regex,
    this_week: Regex,
    last_week: Regex,
    this_month: Regex,
    last_month: Regex,
    last_n_units: Regex,
    recent: Regex,
    number_words: Vec<(String, u32)>,
    unit_words: Vec<(String, TimeUnit)>,
}

impl TimeVocabulary {
    pub fn new(patterns: &TimePatterns<'_>) -> Result<Self, regex::Error> {
        Ok(Self {
            today: Regex::new(patterns.today)?,
            yesterday: Regex::new(patterns.yesterday)?,
            this_week: Regex::new(patterns.this_week)?,
            last_week: Regex::new(patterns.last_week)?,
            this_month: Regex::new(patterns.this_month)?,
            last_month: Regex::new(patterns.last_month)?,
            last_n_units: Regex::new(patterns.last_n_units)?,
            recent: Regex::new(patterns.recent)?,
            number_words: patterns
                .number_words
                .iter()
                .map(|(word, n)| (word.to_lowercase(), *n))
                .collect(),
            unit_words: patterns
                .unit_words
                .iter()
                .map(|(word, unit)| (word.to_lowercase(), *unit))
                .collect(),
        })
    }

    /// Resolve the first time reference in `text` relative to `now`.
    ///
    /// `text` is lowercased here; callers may pass raw input.
    pub fn parse(&self, text: &str, now: NaiveDateTime) -> Option<TimeRange> {
        let text = text.to_lowercase();
        let today = now.date();

        if self.today.is_match(&text) {
            return Some(TimeRange::new(start_of(today), now, "today"));
        }

        if self.yesterday.is_match(&text) {
            let yesterday = today - Duration::days(1);
            return Some(TimeRange::new(
                start_of(yesterday),
                end_of(yesterday),
                "yesterday",
            ));
        }

        let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));

        if self.this_week.is_match(&text) {
            return Some(TimeRange::new(start_of(monday), now, "this week"));
        }

        if self.last_week.is_match(&text) {
            let previous_monday = monday - Duration::days(7);
            let previous_sunday = monday - Duration::days(1);
            return Some(TimeRange::new(
                start_of(previous_monday),
                end_of(previous_sunday),
                "last week",
            ));
        }

        let first_of_month = today - Duration::days(i64::from(today.day0()));

        if self.this_month.is_match(&text) {
            return Some(TimeRange::new(start_of(first_of_month), now, "this month"));
        }

        if self.last_month.is_match(&text) {
            let last_of_previous = first_of_month - Duration::days(1);
            let first_of_previous =
                last_of_previous - Duration::days(i64::from(last_of_previous.day0()));
            return Some(TimeRange::new(
                start_of(first_of_previous),
                end_of(last_of_previous),
                "last month",
            ));
        }

        if let Some(range) = self.last_n_units.captures(&text).and_then(|caps| {
            let n = self.count(caps.get(1)?.as_str())?;
            let unit = self.unit(caps.get(2)?.as_str())?;
            last_n_units(n, unit, now)
        }) {
            return Some(range);
        }

        if self.recent.is_match(&text) {
            return Some(TimeRange::new(
                now - Duration::days(i64::from(RECENT_WINDOW_DAYS)),
                now,
                format!("last {RECENT_WINDOW_DAYS} days (default)"),
            ));
        }

        None
    }

    fn count(&self, raw: &str) -> Option<u32> {
        self.number_words
            .iter()
            .find(|(word, _)| word == raw)
            .map(|(_, n)| *n)
            .or_else(|| raw.parse().ok())
    }

    fn unit(&self, raw: &str) -> Option<TimeUnit> {
        self.unit_words
            .iter()
            .find(|(word, _)| word == raw)
            .map(|(_, unit)| *unit)
    }
}

impl Default for TimeVocabulary {
    fn default() -> Self {
        DEFAULT_TIME_VOCABULARY.clone()
    }
}

fn last_n_units(n: u32, unit: TimeUnit, now: NaiveDateTime) -> Option<TimeRange> {
    let start = match unit {
        TimeUnit::Day => now.checked_sub_signed(Duration::try_days(i64::from(n))?)?,
        TimeUnit::Week => now.checked_sub_signed(Duration::try_weeks(i64::from(n))?)?,
        TimeUnit::Month => now.checked_sub_months(Months::new(n))?,
    };
    let plural = if n == 1 { "" } else { "s" };
    Some(TimeRange::new(
        start,
        now,
        format!("last {n} {}{plural}", unit.as_str()),
    ))
}

fn start_of(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// Last representable millisecond of `day`.
fn end_of(day: NaiveDate) -> NaiveDateTime {
    start_of(day) + Duration::days(1) - Duration::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wednesday 2026-10-14 15:30.
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse_time_reference(text: &str, now: NaiveDateTime) -> Option<TimeRange> {
        TimeVocabulary::default().parse(text, now)
    }

    fn parse(text: &str) -> TimeRange {
        parse_time_reference(text, now()).unwrap_or_else(|| panic!("no range for {text:?}"))
    }

    #[test]
    fn today_runs_from_midnight_to_now() {
        let range = parse("today");
        assert_eq!(range.description, "today");
        assert_eq!(range.start, start_of(date(2026, 10, 14)));
        assert_eq!(range.end, now());
    }

    #[test]
    fn yesterday_is_the_full_previous_day() {
        let range = parse("yesterday");
        assert_eq!(range.description, "yesterday");
        assert_eq!(range.start, start_of(date(2026, 10, 13)));
        assert_eq!(range.end.date(), date(2026, 10, 13));
        assert_eq!(range.span(), Duration::days(1) - Duration::milliseconds(1));
    }

    #[test]
    fn this_week_starts_on_monday() {
        let range = parse("this week");
        assert_eq!(range.description, "this week");
        assert_eq!(range.start, start_of(date(2026, 10, 12)));
        assert_eq!(range.end, now());
    }

    #[test]
    fn last_week_is_previous_monday_to_sunday() {
        let range = parse("last week");
        assert_eq!(range.description, "last week");
        assert_eq!(range.start, start_of(date(2026, 10, 5)));
        assert_eq!(range.end.date(), date(2026, 10, 11));
        assert_eq!(range.start.weekday(), chrono::Weekday::Mon);
        assert_eq!(range.end.weekday(), chrono::Weekday::Sun);
    }

    #[test]
    fn last_week_on_a_monday() {
        let monday = date(2026, 10, 12).and_hms_opt(8, 0, 0).unwrap();
        let range = parse_time_reference("last week", monday).unwrap();
        assert_eq!(range.start, start_of(date(2026, 10, 5)));
        assert_eq!(range.end.date(), date(2026, 10, 11));
    }

    #[test]
    fn this_month_starts_on_the_first() {
        let range = parse("this month");
        assert_eq!(range.description, "this month");
        assert_eq!(range.start, start_of(date(2026, 10, 1)));
        assert_eq!(range.end, now());
    }

    #[test]
    fn last_month_is_the_previous_calendar_month() {
        let range = parse("last month");
        assert_eq!(range.description, "last month");
        assert_eq!(range.start, start_of(date(2026, 9, 1)));
        assert_eq!(range.end.date(), date(2026, 9, 30));
    }

    #[test]
    fn last_month_across_year_boundary() {
        let january = date(2027, 1, 10).and_hms_opt(9, 0, 0).unwrap();
        let range = parse_time_reference("last month", january).unwrap();
        assert_eq!(range.start, start_of(date(2026, 12, 1)));
        assert_eq!(range.end.date(), date(2026, 12, 31));
    }

    #[test]
    fn last_n_days() {
        let range = parse("last 3 days");
        assert_eq!(range.description, "last 3 days");
        assert_eq!(range.span(), Duration::days(3));
        assert_eq!(range.end, now());
    }

    #[test]
    fn last_n_weeks() {
        let range = parse("last 2 weeks");
        assert_eq!(range.description, "last 2 weeks");
        assert_eq!(range.span(), Duration::days(14));
    }

    #[test]
    fn last_n_months() {
        let range = parse("last 6 months");
        assert_eq!(range.description, "last 6 months");
        assert_eq!(range.start, date(2026, 4, 14).and_hms_opt(15, 30, 0).unwrap());
        assert_eq!(range.end, now());
    }

    #[test]
    fn past_and_previous_are_synonyms_with_normalised_label() {
        assert_eq!(parse("over the past 10 days").description, "last 10 days");
        assert_eq!(parse("previous 1 week").description, "last 1 week");
    }

    #[test]
    fn number_words_are_understood() {
        let range = parse("in the last two weeks");
        assert_eq!(range.description, "last 2 weeks");
        assert_eq!(range.span(), Duration::days(14));
    }

    #[test]
    fn recently_defaults_to_seven_days() {
        let range = parse("have I been sleeping well lately?");
        assert_eq!(range.description, "last 7 days (default)");
        assert_eq!(range.span(), Duration::days(7));
    }

    #[test]
    fn earlier_rules_win() {
        // "today" precedes the broader "now" rule.
        assert_eq!(parse("how am I doing today right now").description, "today");
        // "last week" is checked before "last N weeks".
        assert_eq!(parse("last week vs last 3 weeks").description, "last week");
    }

    #[test]
    fn input_is_case_insensitive() {
        assert_eq!(parse("Steps YESTERDAY").description, "yesterday");
    }

    fn spanish() -> TimeVocabulary {
        TimeVocabulary::new(&TimePatterns {
            today: r"\bhoy\b",
            yesterday: r"\bayer\b|\banoche\b",
            this_week: r"\besta semana\b",
            last_week: r"\bla semana pasada\b",
            this_month: r"\beste mes\b",
            last_month: r"\bel mes pasado\b",
            last_n_units: r"\b[úu]ltim[oa]s\s+(\d+|dos|tres)\s+(d[íi]as|semanas|meses)\b",
            recent: r"\brecientemente\b",
            number_words: &[("dos", 2), ("tres", 3)],
            unit_words: &[
                ("días", TimeUnit::Day),
                ("dias", TimeUnit::Day),
                ("semanas", TimeUnit::Week),
                ("meses", TimeUnit::Month),
            ],
        })
        .unwrap()
    }

    #[test]
    fn injected_phrases_replace_the_defaults() {
        let vocab = spanish();

        let range = vocab.parse("¿Cuántos pasos di AYER?", now()).unwrap();
        assert_eq!(range.description, "yesterday");
        assert_eq!(range.start, start_of(date(2026, 10, 13)));

        let range = vocab.parse("mi sueño en los últimos tres días", now()).unwrap();
        assert_eq!(range.description, "last 3 days");
        assert_eq!(range.span(), Duration::days(3));

        // English phrases are no longer recognised.
        assert!(vocab.parse("steps yesterday", now()).is_none());
    }

    #[test]
    fn unknown_unit_word_falls_through() {
        let vocab = TimeVocabulary::new(&TimePatterns {
            unit_words: &[("day", TimeUnit::Day)],
            ..DEFAULT_TIME_PATTERNS
        })
        .unwrap();
        assert!(vocab.parse("last 2 weeks", now()).is_none());
        assert_eq!(vocab.parse("last 2 days", now()).unwrap().description, "last 2 days");
    }

    #[test]
    fn invalid_time_pattern_is_rejected() {
        let result = TimeVocabulary::new(&TimePatterns {
            today: r"(unclosed",
            ..DEFAULT_TIME_PATTERNS
        });
        assert!(result.is_err());
    }

    #[test]
    fn unrelated_words_do_not_match() {
        assert!(parse_time_reference("I know my numbers", now()).is_none());
        assert!(parse_time_reference("weekly nowhere", now()).is_none());
        assert!(parse_time_reference("what's a good resting heart rate", now()).is_none());
    }
}
