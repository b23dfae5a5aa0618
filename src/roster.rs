//! Staff roster import from a CSV file with `branch` and `phone_number` columns.
//!
//! Runs at startup before the distribution sweep. Pairs already in the roster
//! are left alone whatever their status, so re-importing the same file never
//! re-queues staff who were already sent their questions.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::RosterImportError;
use crate::store::RosterStore;

/// One row of the roster file. Extra columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterRow {
    pub branch: String,
    pub phone_number: String,
}

/// Per-import counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// New roster entries created as `unsent`.
    pub added: usize,
    /// Rows whose pair was already in the roster.
    pub existing: usize,
    /// Rows with an empty branch or phone number.
    pub skipped: usize,
}

/// Parse roster rows, trimming every field.
pub fn parse_roster_csv(csv_bytes: &[u8]) -> Result<Vec<RosterRow>, RosterImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(csv_bytes);

    reader
        .deserialize()
        .map(|row| row.map_err(|e| RosterImportError::Malformed(e.to_string())))
        .collect()
}

/// Read `path` and add every new `(branch, phone_number)` pair to `roster`.
pub async fn import_roster(
    roster: &dyn RosterStore,
    path: &Path,
) -> Result<ImportSummary, RosterImportError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| RosterImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let rows = parse_roster_csv(&bytes)?;

    let mut summary = ImportSummary::default();
    for (line, row) in rows.iter().enumerate() {
        if row.branch.is_empty() || row.phone_number.is_empty() {
            warn!(row = line + 1, "Roster row missing branch or phone number");
            summary.skipped += 1;
            continue;
        }
        if roster.add_staff_if_absent(&row.branch, &row.phone_number).await? {
            summary.added += 1;
        } else {
            summary.existing += 1;
        }
    }

    info!(
        path = %path.display(),
        added = summary.added,
        existing = summary.existing,
        skipped = summary.skipped,
        "Staff roster imported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;
    use crate::survey::model::RosterStatus;

    fn write_roster(dir: &Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("staff.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_named_columns_in_any_order() {
        let rows =
            parse_roster_csv(b"phone_number,branch,manager\n 9101 , Andheri ,Asha\n9102,Bandra,\n")
                .unwrap();
        assert_eq!(
            rows,
            vec![
                RosterRow {
                    branch: "Andheri".into(),
                    phone_number: "9101".into()
                },
                RosterRow {
                    branch: "Bandra".into(),
                    phone_number: "9102".into()
                },
            ]
        );
    }

    #[test]
    fn missing_column_is_malformed() {
        let err = parse_roster_csv(b"branch\nAndheri\n").unwrap_err();
        assert!(matches!(err, RosterImportError::Malformed(_)));
    }

    #[tokio::test]
    async fn import_adds_new_pairs_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_roster(
            dir.path(),
            "branch,phone_number\nAndheri,9101\nBandra,9102\n,9103\nAndheri,9101\n",
        );
        let db = LibSqlBackend::new_memory().await.unwrap();

        let first = import_roster(&db, &path).await.unwrap();
        assert_eq!(
            first,
            ImportSummary {
                added: 2,
                existing: 1,
                skipped: 1
            }
        );

        let second = import_roster(&db, &path).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.existing, 3);

        let unsent = db.list_staff_by_status(RosterStatus::Unsent).await.unwrap();
        let branches: Vec<&str> = unsent.iter().map(|e| e.branch.as_str()).collect();
        assert_eq!(branches, vec!["Andheri", "Bandra"]);
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let db = LibSqlBackend::new_memory().await.unwrap();
        let err = import_roster(&db, Path::new("/definitely/not/staff.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, RosterImportError::Read { .. }));
    }
}
