//! `HealthDataStore` backends: SQLite (the persistent one) and an in-memory
//! store for embedding and tests.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::Connection;

use super::aggregator::upload_matches_window;
use super::types::HealthDataStore;
use crate::db::{self, DatabaseError};
use crate::models::{DailyMetric, HealthEvent, UploadedFile};

/// SQLite-backed store.
///
/// Reads run on the blocking thread pool so a slow query never stalls the
/// async workers serving other chat turns.
pub struct SqliteHealthStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHealthStore {
    /// Open (or create) the database at `path` and apply migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    /// Wrap an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    pub fn upsert_daily_metric(&self, metric: &DailyMetric) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        db::upsert_daily_metric(&conn, metric)
    }

    pub fn insert_health_event(&self, event: &HealthEvent) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        db::insert_health_event(&conn, event)
    }

    pub fn insert_uploaded_file(&self, file: &UploadedFile) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        db::insert_uploaded_file(&conn, file)
    }

    /// Run `query` against the connection on a blocking thread.
    async fn read<T, F>(&self, query: F) -> Result<T, DatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
            query(&conn)
        })
        .await
        .map_err(|e| DatabaseError::TaskJoin(e.to_string()))?
    }
}

#[async_trait]
impl HealthDataStore for SqliteHealthStore {
    async fn daily_metrics(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<DailyMetric>, DatabaseError> {
        let user_id = user_id.to_string();
        self.read(move |conn| {
            db::get_daily_metrics_in_range(conn, &user_id, &start.date(), &end.date())
        })
        .await
    }

    async fn health_events(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        types: Option<&[String]>,
    ) -> Result<Vec<HealthEvent>, DatabaseError> {
        let user_id = user_id.to_string();
        let types = types.map(<[String]>::to_vec);
        self.read(move |conn| {
            db::get_health_events_in_range(conn, &user_id, &start, &end, types.as_deref())
        })
        .await
    }

    async fn uploaded_files(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uploaded_since: Option<NaiveDateTime>,
    ) -> Result<Vec<UploadedFile>, DatabaseError> {
        let user_id = user_id.to_string();
        self.read(move |conn| {
            db::get_uploaded_files_in_window(
                conn,
                &user_id,
                &start.date(),
                &end.date(),
                uploaded_since.as_ref(),
            )
        })
        .await
    }
}

/// Vec-backed store with the same filtering rules as the SQLite backend.
#[derive(Default)]
pub struct InMemoryHealthStore {
    daily: Mutex<Vec<DailyMetric>>,
    events: Mutex<Vec<HealthEvent>>,
    uploads: Mutex<Vec<UploadedFile>>,
}

fn guard<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DatabaseError> {
    mutex.lock().map_err(|_| DatabaseError::LockPoisoned)
}

impl InMemoryHealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any existing row for the same user and date.
    pub fn add_daily_metric(&self, metric: DailyMetric) {
        let mut daily = self.daily.lock().unwrap_or_else(|p| p.into_inner());
        daily.retain(|m| !(m.user_id == metric.user_id && m.date == metric.date));
        daily.push(metric);
    }

    pub fn add_event(&self, event: HealthEvent) {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event);
    }

    pub fn add_uploaded_file(&self, file: UploadedFile) {
        self.uploads
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(file);
    }
}

#[async_trait]
impl HealthDataStore for InMemoryHealthStore {
    async fn daily_metrics(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<DailyMetric>, DatabaseError> {
        let (from, to) = (start.date(), end.date());
        Ok(guard(&self.daily)?
            .iter()
            .filter(|m| m.user_id == user_id && m.date >= from && m.date <= to)
            .cloned()
            .collect())
    }

    async fn health_events(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        types: Option<&[String]>,
    ) -> Result<Vec<HealthEvent>, DatabaseError> {
        Ok(guard(&self.events)?
            .iter()
            .filter(|e| e.user_id == user_id && e.start_time >= start && e.start_time <= end)
            .filter(|e| types.map_or(true, |t| t.iter().any(|x| x == &e.event_type)))
            .cloned()
            .collect())
    }

    async fn uploaded_files(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uploaded_since: Option<NaiveDateTime>,
    ) -> Result<Vec<UploadedFile>, DatabaseError> {
        Ok(guard(&self.uploads)?
            .iter()
            .filter(|f| f.user_id == user_id)
            .filter(|f| upload_matches_window(f, start, end, uploaded_since))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration as StdDuration;

    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::models::DeclaredDateRange;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn event(user: &str, kind: &str, start: NaiveDateTime) -> HealthEvent {
        HealthEvent {
            id: Uuid::new_v4(),
            user_id: user.into(),
            event_type: kind.into(),
            title: kind.into(),
            description: None,
            start_time: start,
            end_time: None,
            duration_minutes: None,
            metrics: BTreeMap::new(),
        }
    }

    fn metric(user: &str, d: u32, steps: f64) -> DailyMetric {
        let mut m = DailyMetric::new(user, at(d, 0).date());
        m.steps = Some(steps);
        m
    }

    #[tokio::test]
    async fn sqlite_store_scopes_by_user_and_calendar_date() {
        let store = SqliteHealthStore::in_memory().unwrap();
        store.upsert_daily_metric(&metric("u1", 1, 100.0)).unwrap();
        store.upsert_daily_metric(&metric("u1", 2, 200.0)).unwrap();
        store.upsert_daily_metric(&metric("u1", 4, 400.0)).unwrap();
        store.upsert_daily_metric(&metric("u2", 2, 999.0)).unwrap();

        // Window starts mid-afternoon on the 1st: the whole day still counts.
        let rows = store.daily_metrics("u1", at(1, 15), at(2, 9)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|m| m.user_id == "u1"));
    }

    #[tokio::test]
    async fn sqlite_store_filters_events() {
        let store = SqliteHealthStore::in_memory().unwrap();
        store.insert_health_event(&event("u1", "workout", at(3, 7))).unwrap();
        store.insert_health_event(&event("u1", "meal", at(3, 12))).unwrap();
        store.insert_health_event(&event("u1", "meal", at(9, 12))).unwrap();

        let all = store.health_events("u1", at(1, 0), at(5, 0), None).await.unwrap();
        assert_eq!(all.len(), 2);

        let types = vec!["workout".to_string()];
        let workouts = store
            .health_events("u1", at(1, 0), at(5, 0), Some(&types))
            .await
            .unwrap();
        assert_eq!(workouts.len(), 1);
        assert_eq!(workouts[0].event_type, "workout");
    }

    #[tokio::test]
    async fn sqlite_store_opens_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("health.db");
        {
            let store = SqliteHealthStore::open(&path).unwrap();
            store.upsert_daily_metric(&metric("u1", 1, 10.0)).unwrap();
        }
        let store = SqliteHealthStore::open(&path).unwrap();
        let rows = store.daily_metrics("u1", at(1, 0), at(1, 23)).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn in_memory_store_matches_sqlite_rules() {
        let store = InMemoryHealthStore::new();
        store.add_daily_metric(metric("u1", 1, 100.0));
        store.add_daily_metric(metric("u1", 1, 150.0));
        store.add_daily_metric(metric("u2", 1, 999.0));
        store.add_event(event("u1", "meal", at(1, 12)));
        store.add_event(event("u2", "meal", at(1, 12)));

        let rows = store.daily_metrics("u1", at(1, 8), at(1, 9)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].steps, Some(150.0));

        let events = store.health_events("u1", at(1, 0), at(2, 0), None).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(store
            .uploaded_files("u1", at(1, 0), at(2, 0), None)
            .await
            .unwrap()
            .is_empty());
    }

    fn upload(user: &str, range: Option<(u32, u32)>, uploaded: NaiveDateTime) -> UploadedFile {
        UploadedFile {
            id: Uuid::new_v4(),
            user_id: user.into(),
            file_name: "labs.pdf".into(),
            summary: None,
            categories: vec!["labs".into()],
            date_range: range.map(|(start, end)| DeclaredDateRange {
                start: at(start, 0).date(),
                end: at(end, 0).date(),
            }),
            uploaded_at: uploaded,
            entries: vec![],
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sqlite_reads_leave_the_runtime_free() {
        let store = SqliteHealthStore::in_memory().unwrap();

        // Another thread holds the connection, so the read has to wait.
        let conn = Arc::clone(&store.conn);
        let (locked_tx, locked_rx) = mpsc::channel();
        let holder = std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(StdDuration::from_millis(200));
        });
        locked_rx.recv().unwrap();

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(StdDuration::from_millis(5)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let rows = store.daily_metrics("u1", at(1, 0), at(2, 0)).await.unwrap();
        ticker.abort();
        holder.join().unwrap();

        assert!(rows.is_empty());
        assert!(
            ticks.load(Ordering::SeqCst) > 0,
            "sibling task made no progress while the read waited"
        );
    }

    #[tokio::test]
    async fn poisoned_connection_is_reported() {
        let store = SqliteHealthStore::in_memory().unwrap();
        let conn = Arc::clone(&store.conn);
        let _ = std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            panic!("poison the connection");
        })
        .join();

        let result = store.daily_metrics("u1", at(1, 0), at(2, 0)).await;
        assert!(matches!(result, Err(DatabaseError::LockPoisoned)));
    }

    #[tokio::test]
    async fn sqlite_store_windows_uploads() {
        let store = SqliteHealthStore::in_memory().unwrap();
        let old = upload("u1", Some((1, 2)), at(1, 9));
        let overlapping = upload("u1", Some((9, 12)), at(1, 9));
        let undated = upload("u1", None, at(1, 9));
        for file in [&old, &overlapping, &undated, &upload("u2", None, at(1, 9))] {
            store.insert_uploaded_file(file).unwrap();
        }

        let files = store
            .uploaded_files("u1", at(10, 0), at(11, 0), Some(at(5, 0)))
            .await
            .unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&overlapping.id));
        assert!(ids.contains(&undated.id));

        let all = store
            .uploaded_files("u1", at(10, 0), at(11, 0), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn in_memory_store_windows_uploads_like_sqlite() {
        let store = InMemoryHealthStore::new();
        let old = upload("u1", Some((1, 2)), at(1, 9));
        let recent = upload("u1", Some((1, 2)), at(6, 9));
        store.add_uploaded_file(old.clone());
        store.add_uploaded_file(recent.clone());

        let files = store
            .uploaded_files("u1", at(10, 0), at(11, 0), Some(at(5, 0)))
            .await
            .unwrap();
        assert_eq!(files, vec![recent]);
    }
}
