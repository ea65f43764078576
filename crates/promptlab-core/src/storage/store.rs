//! SQLite-backed result store. Owns the write path; the browsing UI and the
//! CLI read subcommands share the read path.
//!
//! Clones share one connection behind a mutex, so writers are serialized by
//! the store and each insert is a single atomic statement. The unique index
//! on (run_id, prompt_id, case_id, model) is the correctness backstop: a
//! duplicate write is rejected, never replaced.

use crate::errors::StoreError;
use crate::model::{RunSnapshot, TrialStatus};
use crate::storage::rows::{ResultRow, RunRow, RunSummary};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS runs (
    id            TEXT PRIMARY KEY,
    started_at    TEXT NOT NULL,
    finished_at   TEXT,
    status        TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed', 'cancelled')),
    config_json   TEXT,
    total_trials  INTEGER NOT NULL,
    succeeded     INTEGER
);

CREATE TABLE IF NOT EXISTS results (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id           TEXT NOT NULL,
    prompt_id        TEXT NOT NULL,
    case_id          TEXT NOT NULL,
    model            TEXT NOT NULL,
    system_message   TEXT NOT NULL,
    user_message     TEXT NOT NULL,
    response_content TEXT,
    status           TEXT NOT NULL CHECK(status IN (
        'success', 'timeout', 'rate_limited', 'authentication_error',
        'invalid_request', 'provider_error', 'unknown_error'
    )),
    error_detail     TEXT,
    created_at       TEXT NOT NULL,
    UNIQUE(run_id, prompt_id, case_id, model)
);

CREATE INDEX IF NOT EXISTS idx_results_run_id ON results(run_id);
CREATE INDEX IF NOT EXISTS idx_results_status ON results(status);
CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at);
";

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Create a run row in `running` state and return its fresh identifier.
    pub fn create_run(
        &self,
        snapshot: &RunSnapshot,
        total_trials: u64,
    ) -> Result<String, StoreError> {
        let run_id = Uuid::new_v4().to_string();
        let config_json =
            serde_json::to_string(snapshot).map_err(|e| StoreError::Encode(e.to_string()))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO runs(id, started_at, status, config_json, total_trials)
             VALUES (?1, ?2, 'running', ?3, ?4)",
            params![run_id, Utc::now().to_rfc3339(), config_json, total_trials],
        )?;
        Ok(run_id)
    }

    /// Mark a run finished. Written exactly once per run by the dispatcher.
    pub fn finalize_run(
        &self,
        run_id: &str,
        status: &str,
        succeeded: u64,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, succeeded = ?3 WHERE id = ?4",
            params![Utc::now().to_rfc3339(), status, succeeded, run_id],
        )?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        Ok(())
    }

    /// Append one result row. A second write for the same (run, prompt,
    /// case, model) tuple fails with `Duplicate` and leaves the existing
    /// row untouched.
    pub fn insert_result(&self, row: &ResultRow) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let outcome = conn.execute(
            "INSERT INTO results(
                run_id, prompt_id, case_id, model,
                system_message, user_message, response_content,
                status, error_detail, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                row.run_id,
                row.prompt_id,
                row.case_id,
                row.model,
                row.system_message,
                row.user_message,
                row.response_content,
                row.status.as_str(),
                row.error_detail,
                row.created_at,
            ],
        );
        match outcome {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate {
                run_id: row.run_id.clone(),
                prompt_id: row.prompt_id.clone(),
                case_id: row.case_id.clone(),
                model: row.model.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn run_row(&self, run_id: &str) -> Result<RunRow, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, started_at, finished_at, status, config_json, total_trials, succeeded
             FROM runs WHERE id = ?1",
            params![run_id],
            row_to_run,
        )
        .optional()?
        .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))
    }

    pub fn list_runs(&self) -> Result<Vec<RunRow>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, started_at, finished_at, status, config_json, total_trials, succeeded
             FROM runs ORDER BY started_at",
        )?;
        let rows = stmt.query_map([], row_to_run)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn latest_run_id(&self) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id FROM runs ORDER BY started_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Per-status counts plus the run row, for the summary read path.
    pub fn run_summary(&self, run_id: &str) -> Result<RunSummary, StoreError> {
        let run = self.run_row(run_id)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM results WHERE run_id = ?1 GROUP BY status",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;
        let mut by_status = BTreeMap::new();
        let mut recorded = 0;
        for row in rows {
            let (status, count) = row?;
            recorded += count;
            by_status.insert(status, count);
        }
        Ok(RunSummary {
            run,
            recorded,
            by_status,
        })
    }

    /// All results for a run, oldest first, optionally filtered by status
    /// column value (`success`, a failure kind, or `failed` for any
    /// non-success row).
    pub fn results_for_run(
        &self,
        run_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<ResultRow>, StoreError> {
        let conn = self.lock()?;
        let (sql, filter): (&str, Option<&str>) = match status {
            None => (
                "SELECT run_id, prompt_id, case_id, model, system_message, user_message,
                        response_content, status, error_detail, created_at
                 FROM results WHERE run_id = ?1 ORDER BY created_at, id",
                None,
            ),
            Some("failed") => (
                "SELECT run_id, prompt_id, case_id, model, system_message, user_message,
                        response_content, status, error_detail, created_at
                 FROM results WHERE run_id = ?1 AND status != 'success' ORDER BY created_at, id",
                None,
            ),
            Some(value) => (
                "SELECT run_id, prompt_id, case_id, model, system_message, user_message,
                        response_content, status, error_detail, created_at
                 FROM results WHERE run_id = ?1 AND status = ?2 ORDER BY created_at, id",
                Some(value),
            ),
        };
        let mut stmt = conn.prepare(sql)?;
        let mut out = Vec::new();
        match filter {
            Some(value) => {
                let rows = stmt.query_map(params![run_id, value], row_to_result)?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let rows = stmt.query_map(params![run_id], row_to_result)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRow> {
    Ok(RunRow {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        status: row.get(3)?,
        config_json: row.get(4)?,
        total_trials: row.get(5)?,
        succeeded: row.get(6)?,
    })
}

fn row_to_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResultRow> {
    Ok(ResultRow {
        run_id: row.get(0)?,
        prompt_id: row.get(1)?,
        case_id: row.get(2)?,
        model: row.get(3)?,
        system_message: row.get(4)?,
        user_message: row.get(5)?,
        response_content: row.get(6)?,
        status: TrialStatus::parse(&row.get::<_, String>(7)?),
        error_detail: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    // Specifically UNIQUE, not any constraint: a CHECK failure must surface
    // as a plain sqlite error, not as a duplicate.
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == ErrorCode::ConstraintViolation
                && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
