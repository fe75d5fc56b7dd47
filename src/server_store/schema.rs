//! SQLite schema of the server database: background job runs, schedules and audit log.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Job runs and schedules
// =============================================================================

const JOB_RUNS_TABLE: Table = Table {
    name: "job_runs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("job_id", &SqlType::Text, non_null = true),
        sqlite_column!("started_at", &SqlType::Text, non_null = true),
        sqlite_column!("finished_at", &SqlType::Text),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("error_message", &SqlType::Text),
        sqlite_column!("triggered_by", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_job_runs_job_id_started", "job_id, started_at DESC"),
        ("idx_job_runs_status", "status"),
    ],
};

/// Next run time of each scheduled job, so schedules survive restarts.
const JOB_SCHEDULES_TABLE: Table = Table {
    name: "job_schedules",
    columns: &[
        sqlite_column!("job_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("next_run_at", &SqlType::Text, non_null = true),
        sqlite_column!("last_run_at", &SqlType::Text),
    ],
    indices: &[],
};

// =============================================================================
// Version 2 - Job audit log
// =============================================================================

const JOB_AUDIT_LOG_TABLE: Table = Table {
    name: "job_audit_log",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("job_id", &SqlType::Text, non_null = true),
        sqlite_column!("event_type", &SqlType::Text, non_null = true),
        sqlite_column!("timestamp", &SqlType::Text, non_null = true),
        sqlite_column!("duration_ms", &SqlType::Integer),
        sqlite_column!("details", &SqlType::Text),
        sqlite_column!("error", &SqlType::Text),
    ],
    indices: &[
        ("idx_job_audit_log_job_id", "job_id"),
        ("idx_job_audit_log_timestamp", "timestamp DESC"),
    ],
};

fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    JOB_AUDIT_LOG_TABLE.create(conn)
}

pub const SERVER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[JOB_RUNS_TABLE, JOB_SCHEDULES_TABLE],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[JOB_RUNS_TABLE, JOB_SCHEDULES_TABLE, JOB_AUDIT_LOG_TABLE],
        migration: Some(migrate_v1_to_v2),
    },
];
