//! libSQL backend: implements [`RespondentStore`] and [`RosterStore`].
//!
//! Supports local file and in-memory databases. Answers are stored one row per
//! `(phone_number, question_index)`, so merging an answer is a single upsert.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{RespondentStore, RosterStore};
use crate::survey::model::{AnswerEntry, RespondentRecord, RosterEntry, RosterStatus};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

const ANSWER_COLUMNS: &str = "phone_number, question_index, question_text, answer_text";

/// Fold answer rows (ordered by phone number, then index) into records.
async fn collect_records(mut rows: libsql::Rows) -> Result<Vec<RespondentRecord>, DatabaseError> {
    let mut records: Vec<RespondentRecord> = Vec::new();

    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("read answers: {e}")))?
    {
        let (phone_number, index, entry) = row_to_answer(&row)
            .map_err(|e| DatabaseError::Query(format!("answer row parse: {e}")))?;

        match records.last_mut() {
            Some(record) if record.phone_number == phone_number => record.merge(index, entry),
            _ => {
                let mut record = RespondentRecord::new(phone_number);
                record.merge(index, entry);
                records.push(record);
            }
        }
    }

    Ok(records)
}

/// Column order matches ANSWER_COLUMNS.
fn row_to_answer(row: &libsql::Row) -> Result<(String, usize, AnswerEntry), libsql::Error> {
    let phone_number: String = row.get(0)?;
    let index: i64 = row.get(1)?;
    let question: String = row.get(2)?;
    let answer: String = row.get(3)?;
    Ok((
        phone_number,
        usize::try_from(index).unwrap_or_default(),
        AnswerEntry { question, answer },
    ))
}

fn row_to_staff(row: &libsql::Row) -> Result<RosterEntry, libsql::Error> {
    let status_str: String = row.get(3)?;
    Ok(RosterEntry {
        id: row.get(0)?,
        branch: row.get(1)?,
        phone_number: row.get(2)?,
        status: status_str.parse().unwrap_or(RosterStatus::Unsent),
    })
}

fn index_to_i64(index: usize) -> Result<i64, DatabaseError> {
    i64::try_from(index)
        .map_err(|_| DatabaseError::Query(format!("question index {index} does not fit in i64")))
}

// ── RespondentStore ─────────────────────────────────────────────────

#[async_trait]
impl RespondentStore for LibSqlBackend {
    async fn upsert_answer(
        &self,
        phone_number: &str,
        index: usize,
        question: &str,
        answer: &str,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO answers (phone_number, question_index, question_text, answer_text, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (phone_number, question_index)
                 DO UPDATE SET question_text = ?3, answer_text = ?4, updated_at = ?5",
                params![phone_number, index_to_i64(index)?, question, answer, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_answer: {e}")))?;

        debug!(phone_number, index, "Answer upserted");
        Ok(())
    }

    async fn get_respondent(
        &self,
        phone_number: &str,
    ) -> Result<Option<RespondentRecord>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ANSWER_COLUMNS} FROM answers WHERE phone_number = ?1
                     ORDER BY question_index ASC"
                ),
                params![phone_number],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_respondent: {e}")))?;

        Ok(collect_records(rows).await?.into_iter().next())
    }

    async fn list_respondents(&self) -> Result<Vec<RespondentRecord>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ANSWER_COLUMNS} FROM answers
                     ORDER BY phone_number ASC, question_index ASC"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_respondents: {e}")))?;

        collect_records(rows).await
    }

    async fn purge_respondents(&self) -> Result<usize, DatabaseError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM answers", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("purge_respondents: {e}")))?;
        info!(deleted, "Purged collected answers");
        Ok(deleted as usize)
    }
}

// ── RosterStore ─────────────────────────────────────────────────────

#[async_trait]
impl RosterStore for LibSqlBackend {
    async fn add_staff(&self, branch: &str, phone_number: &str) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "INSERT INTO staff (branch, phone_number, status) VALUES (?1, ?2, 'unsent')
                 RETURNING id",
                params![branch, phone_number],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("add_staff: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("add_staff: {e}")))?
            .ok_or_else(|| DatabaseError::Query("add_staff: no id returned".into()))?;

        row.get::<i64>(0)
            .map_err(|e| DatabaseError::Query(format!("add_staff row parse: {e}")))
    }

    async fn add_staff_if_absent(
        &self,
        branch: &str,
        phone_number: &str,
    ) -> Result<bool, DatabaseError> {
        let inserted = self
            .conn()
            .execute(
                "INSERT INTO staff (branch, phone_number, status)
                 SELECT ?1, ?2, 'unsent'
                 WHERE NOT EXISTS (SELECT 1 FROM staff WHERE branch = ?1 AND phone_number = ?2)",
                params![branch, phone_number],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("add_staff_if_absent: {e}")))?;
        Ok(inserted > 0)
    }

    async fn list_staff_by_status(
        &self,
        status: RosterStatus,
    ) -> Result<Vec<RosterEntry>, DatabaseError> {
        // Imported rows may carry an empty status, which counts as unsent.
        let filter = match status {
            RosterStatus::Unsent => "status IN ('unsent', '')",
            RosterStatus::Sent => "status = 'sent'",
        };
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT id, branch, phone_number, status FROM staff WHERE {filter} ORDER BY id ASC"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_staff_by_status: {e}")))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_staff_by_status: {e}")))?
        {
            entries.push(
                row_to_staff(&row)
                    .map_err(|e| DatabaseError::Query(format!("staff row parse: {e}")))?,
            );
        }
        Ok(entries)
    }

    async fn update_staff_status(
        &self,
        id: i64,
        status: RosterStatus,
    ) -> Result<(), DatabaseError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE staff SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_staff_status: {e}")))?;

        if updated == 0 {
            return Err(DatabaseError::NotFound {
                entity: "staff".into(),
                id: id.to_string(),
            });
        }
        debug!(id, status = %status, "Staff status updated");
        Ok(())
    }
}
