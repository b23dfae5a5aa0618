//! Store traits: async interfaces for respondent answers and the staff roster.
//!
//! Both are implemented by [`LibSqlBackend`](super::LibSqlBackend) and injected
//! as `Arc<dyn …>` so tests can swap in fakes.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::survey::model::{RespondentRecord, RosterEntry, RosterStatus};

/// Persistent phone number → answers mapping.
#[async_trait]
pub trait RespondentStore: Send + Sync {
    /// Merge one answer into the record for `phone_number`, creating it if absent.
    ///
    /// Must be a single atomic operation: concurrent calls for the same phone
    /// number never lose each other's answers.
    async fn upsert_answer(
        &self,
        phone_number: &str,
        index: usize,
        question: &str,
        answer: &str,
    ) -> Result<(), DatabaseError>;

    /// Point lookup of one respondent.
    async fn get_respondent(
        &self,
        phone_number: &str,
    ) -> Result<Option<RespondentRecord>, DatabaseError>;

    /// Every respondent, sorted by phone number ascending.
    async fn list_respondents(&self) -> Result<Vec<RespondentRecord>, DatabaseError>;

    /// Delete every collected answer. Returns the number of answer rows removed.
    async fn purge_respondents(&self) -> Result<usize, DatabaseError>;
}

/// Staff directory used by the startup distribution sweep.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Add a roster entry with status `unsent`. Returns its id.
    async fn add_staff(&self, branch: &str, phone_number: &str) -> Result<i64, DatabaseError>;

    /// Add a roster entry unless the same `(branch, phone_number)` pair already
    /// exists in any status. Returns whether a row was inserted.
    async fn add_staff_if_absent(
        &self,
        branch: &str,
        phone_number: &str,
    ) -> Result<bool, DatabaseError>;

    /// All entries with the given status, in insertion order.
    async fn list_staff_by_status(
        &self,
        status: RosterStatus,
    ) -> Result<Vec<RosterEntry>, DatabaseError>;

    /// Set the status of one entry.
    async fn update_staff_status(&self, id: i64, status: RosterStatus)
    -> Result<(), DatabaseError>;
}
