use super::schema::SERVER_VERSIONED_SCHEMAS;
use super::{JobAuditEntry, JobAuditEventType, JobRun, JobRunStatus, JobScheduleState, ServerStore};
use crate::sqlite_persistence::open_versioned_db;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct SqliteServerStore {
    conn: Arc<Mutex<Connection>>,
}

const JOB_RUN_COLUMNS: &str =
    "id, job_id, started_at, finished_at, status, error_message, triggered_by";

impl SqliteServerStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), SERVER_VERSIONED_SCHEMAS, "server")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Every statement here is a single autocommit write, so a poisoned lock
        // cannot hide a half-applied change.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn row_to_job_run(row: &Row) -> rusqlite::Result<JobRun> {
        let status: String = row.get("status")?;
        let started_at: String = row.get("started_at")?;
        let finished_at: Option<String> = row.get("finished_at")?;

        Ok(JobRun {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            started_at: Self::parse_datetime(&started_at).unwrap_or_else(Utc::now),
            finished_at: finished_at.as_deref().and_then(Self::parse_datetime),
            status: JobRunStatus::parse(&status).unwrap_or(JobRunStatus::Failed),
            error_message: row.get("error_message")?,
            triggered_by: row.get("triggered_by")?,
        })
    }

    fn row_to_schedule_state(row: &Row) -> rusqlite::Result<JobScheduleState> {
        let next_run_at: String = row.get("next_run_at")?;
        let last_run_at: Option<String> = row.get("last_run_at")?;

        Ok(JobScheduleState {
            job_id: row.get("job_id")?,
            next_run_at: Self::parse_datetime(&next_run_at).unwrap_or_else(Utc::now),
            last_run_at: last_run_at.as_deref().and_then(Self::parse_datetime),
        })
    }

    fn row_to_audit_entry(row: &Row) -> rusqlite::Result<JobAuditEntry> {
        let event_type: String = row.get("event_type")?;
        let timestamp: String = row.get("timestamp")?;
        let details: Option<String> = row.get("details")?;

        Ok(JobAuditEntry {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            event_type: JobAuditEventType::parse(&event_type)
                .unwrap_or(JobAuditEventType::Progress),
            timestamp: Self::parse_datetime(&timestamp).unwrap_or_else(Utc::now),
            duration_ms: row.get("duration_ms")?,
            details: details.and_then(|d| serde_json::from_str(&d).ok()),
            error: row.get("error")?,
        })
    }
}

impl ServerStore for SqliteServerStore {
    fn record_job_start(&self, job_id: &str, triggered_by: &str) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO job_runs (job_id, started_at, status, triggered_by)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                job_id,
                Self::format_datetime(&Utc::now()),
                JobRunStatus::Running.as_str(),
                triggered_by
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn record_job_finish(
        &self,
        run_id: i64,
        status: JobRunStatus,
        error_message: Option<String>,
    ) -> Result<()> {
        self.lock().execute(
            "UPDATE job_runs SET finished_at = ?1, status = ?2, error_message = ?3 WHERE id = ?4",
            params![
                Self::format_datetime(&Utc::now()),
                status.as_str(),
                error_message,
                run_id
            ],
        )?;
        Ok(())
    }

    fn get_running_jobs(&self) -> Result<Vec<JobRun>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM job_runs WHERE status = ?1 ORDER BY started_at DESC",
            JOB_RUN_COLUMNS
        ))?;
        let runs = stmt
            .query_map(
                params![JobRunStatus::Running.as_str()],
                Self::row_to_job_run,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    fn get_job_history(&self, job_id: &str, limit: usize) -> Result<Vec<JobRun>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM job_runs WHERE job_id = ?1
             ORDER BY started_at DESC, id DESC LIMIT ?2",
            JOB_RUN_COLUMNS
        ))?;
        let runs = stmt
            .query_map(params![job_id, limit as i64], Self::row_to_job_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    fn get_last_run(&self, job_id: &str) -> Result<Option<JobRun>> {
        let conn = self.lock();
        let run = conn
            .query_row(
                &format!(
                    "SELECT {} FROM job_runs WHERE job_id = ?1
                     ORDER BY started_at DESC, id DESC LIMIT 1",
                    JOB_RUN_COLUMNS
                ),
                params![job_id],
                Self::row_to_job_run,
            )
            .optional()?;
        Ok(run)
    }

    fn mark_stale_jobs_failed(&self) -> Result<usize> {
        let count = self.lock().execute(
            "UPDATE job_runs SET status = ?1, finished_at = ?2, error_message = ?3
             WHERE status = ?4",
            params![
                JobRunStatus::Failed.as_str(),
                Self::format_datetime(&Utc::now()),
                "Job was interrupted (server restart)",
                JobRunStatus::Running.as_str()
            ],
        )?;
        Ok(count)
    }

    fn get_schedule_state(&self, job_id: &str) -> Result<Option<JobScheduleState>> {
        let state = self
            .lock()
            .query_row(
                "SELECT job_id, next_run_at, last_run_at FROM job_schedules WHERE job_id = ?1",
                params![job_id],
                Self::row_to_schedule_state,
            )
            .optional()?;
        Ok(state)
    }

    fn update_schedule_state(&self, state: &JobScheduleState) -> Result<()> {
        self.lock().execute(
            "INSERT INTO job_schedules (job_id, next_run_at, last_run_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(job_id) DO UPDATE SET next_run_at = ?2, last_run_at = ?3",
            params![
                state.job_id,
                Self::format_datetime(&state.next_run_at),
                state.last_run_at.as_ref().map(Self::format_datetime)
            ],
        )?;
        Ok(())
    }

    fn log_job_audit(
        &self,
        job_id: &str,
        event_type: JobAuditEventType,
        duration_ms: Option<i64>,
        details: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO job_audit_log (job_id, event_type, timestamp, duration_ms, details, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                job_id,
                event_type.as_str(),
                Self::format_datetime(&Utc::now()),
                duration_ms,
                details.map(|d| d.to_string()),
                error
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_job_audit_log_by_job(
        &self,
        job_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<JobAuditEntry>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, job_id, event_type, timestamp, duration_ms, details, error
             FROM job_audit_log
             WHERE job_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let entries = stmt
            .query_map(
                params![job_id, limit as i64, offset as i64],
                Self::row_to_audit_entry,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}
