use chrono::{Months, NaiveDateTime};

use super::types::{HealthDataStore, SourceFetch};
use crate::models::{DailyMetric, HealthEvent, UploadedFile};

/// Uploads this recent (relative to the window end) are kept even when their
/// declared dates fall outside the window.
pub const DEFAULT_UPLOAD_RECENCY_MONTHS: u32 = 6;

/// Reads and orders records from a `HealthDataStore`.
///
/// Each fetch is independent and reports failure in its `SourceFetch`
/// instead of returning an error, so one broken source never hides the
/// others.
pub struct HealthDataAggregator<S: HealthDataStore> {
    store: S,
    upload_recency_months: u32,
}

impl<S: HealthDataStore> HealthDataAggregator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            upload_recency_months: DEFAULT_UPLOAD_RECENCY_MONTHS,
        }
    }

    pub fn with_upload_recency_months(mut self, months: u32) -> Self {
        self.upload_recency_months = months;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Daily rollups in the window, oldest first.
    pub async fn fetch_daily_metrics(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> SourceFetch<DailyMetric> {
        let mut fetch: SourceFetch<DailyMetric> =
            self.store.daily_metrics(user_id, start, end).await.into();
        log_failure("daily_metrics", user_id, &fetch);
        fetch.data.sort_by_key(|m| m.date);
        fetch
    }

    /// Events in the window, newest first, optionally filtered by type.
    pub async fn fetch_events(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        types: Option<&[String]>,
    ) -> SourceFetch<HealthEvent> {
        let mut fetch: SourceFetch<HealthEvent> = self
            .store
            .health_events(user_id, start, end, types)
            .await
            .into();
        log_failure("health_events", user_id, &fetch);
        fetch.data.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        fetch
    }

    /// Uploaded files relevant to the window, newest upload first.
    ///
    /// A file is kept when it declares no date range, when its range overlaps
    /// the window, or when it was uploaded no earlier than
    /// `upload_recency_months` before the window end. `categories`, when
    /// given, additionally requires at least one shared category.
    pub async fn fetch_uploaded_entries(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        categories: Option<&[String]>,
    ) -> SourceFetch<UploadedFile> {
        let uploaded_since = recency_cutoff(end, self.upload_recency_months);
        let mut fetch: SourceFetch<UploadedFile> = self
            .store
            .uploaded_files(user_id, start, end, uploaded_since)
            .await
            .into();
        log_failure("uploaded_files", user_id, &fetch);

        fetch.data.retain(|file| {
            upload_in_window(file, start, end, self.upload_recency_months)
                && categories.map_or(true, |wanted| file.has_any_category(wanted))
        });
        fetch.data.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        fetch
    }
}

/// Inclusion rule for uploaded files (see `fetch_uploaded_entries`).
pub fn upload_in_window(
    file: &UploadedFile,
    start: NaiveDateTime,
    end: NaiveDateTime,
    recency_months: u32,
) -> bool {
    upload_matches_window(file, start, end, recency_cutoff(end, recency_months))
}

/// In-memory twin of the SQL window predicate behind `SqliteHealthStore`.
pub fn upload_matches_window(
    file: &UploadedFile,
    start: NaiveDateTime,
    end: NaiveDateTime,
    uploaded_since: Option<NaiveDateTime>,
) -> bool {
    let Some(range) = &file.date_range else {
        return true;
    };

    if range.start <= end.date() && range.end >= start.date() {
        return true;
    }

    uploaded_since.map_or(true, |cutoff| file.uploaded_at >= cutoff)
}

/// `None` when the cutoff underflows the calendar, which keeps every upload.
fn recency_cutoff(end: NaiveDateTime, recency_months: u32) -> Option<NaiveDateTime> {
    end.checked_sub_months(Months::new(recency_months))
}

fn log_failure<T>(source: &str, user_id: &str, fetch: &SourceFetch<T>) {
    if let Some(error) = &fetch.error {
        tracing::warn!(source, user_id, error = %error, "Health data fetch failed; treating source as empty");
    }
}
