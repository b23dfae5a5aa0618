//! Report compiler: flattens every respondent record into a dated CSV and sends it.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::channels::Messenger;
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::store::RespondentStore;
use crate::survey::model::RespondentRecord;
use crate::survey::questions::QuestionSource;

/// Result of one compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub path: PathBuf,
    /// Data rows written (one per respondent).
    pub rows: usize,
    /// Respondents who answered every question of the current list.
    pub complete_respondents: usize,
    pub delivered: bool,
    /// Answer rows removed after delivery, when purging is enabled.
    pub purged: Option<usize>,
}

/// File name of the report for `date`: `answer_YYYY-MM-DD.csv`.
pub fn report_file_name(date: NaiveDate) -> String {
    format!("answer_{}.csv", date.format("%Y-%m-%d"))
}

/// Render records as CSV.
///
/// Columns: `phone_number`, then for each question index seen in any record (ascending)
/// `question_i` followed by `answer_i`. Rows keep the order of `records`; cells for
/// indices a respondent never answered are empty.
pub fn render_report(records: &[RespondentRecord]) -> Result<Vec<u8>, ReportError> {
    let indices: BTreeSet<usize> = records
        .iter()
        .flat_map(|r| r.answers.keys().copied())
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = Vec::with_capacity(1 + indices.len() * 2);
    header.push("phone_number".to_string());
    for i in &indices {
        header.push(format!("question_{i}"));
        header.push(format!("answer_{i}"));
    }
    writer.write_record(&header)?;

    for record in records {
        let mut row: Vec<&str> = Vec::with_capacity(header.len());
        row.push(&record.phone_number);
        for i in &indices {
            match record.answers.get(i) {
                Some(entry) => {
                    row.push(&entry.question);
                    row.push(&entry.answer);
                }
                None => {
                    row.push("");
                    row.push("");
                }
            }
        }
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::Render(e.to_string()))
}

/// Compiles the daily answer report and delivers it to the operator.
pub struct ReportCompiler {
    store: Arc<dyn RespondentStore>,
    questions: Arc<dyn QuestionSource>,
    messenger: Arc<dyn Messenger>,
    config: ReportConfig,
    /// Held for the duration of a run so two runs never write the same file.
    running: Mutex<()>,
}

impl ReportCompiler {
    pub fn new(
        store: Arc<dyn RespondentStore>,
        questions: Arc<dyn QuestionSource>,
        messenger: Arc<dyn Messenger>,
        config: ReportConfig,
    ) -> Self {
        Self {
            store,
            questions,
            messenger,
            config,
            running: Mutex::new(()),
        }
    }

    /// Compile, write, and deliver the report for `date`.
    ///
    /// A delivery failure is logged and reported through [`ReportOutcome::delivered`];
    /// the written file is kept either way.
    pub async fn compile(&self, date: NaiveDate) -> Result<ReportOutcome, ReportError> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| ReportError::AlreadyRunning)?;

        info!(%date, "Report generation started");

        let mut records = self.store.list_respondents().await?;
        records.sort_by(|a, b| a.phone_number.cmp(&b.phone_number));

        let question_count = self.questions.questions().await.len();
        let complete_respondents = records
            .iter()
            .filter(|r| r.is_complete(question_count))
            .count();

        let bytes = render_report(&records)?;

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| ReportError::Write {
                path: self.config.output_dir.clone(),
                source,
            })?;
        let path = self.config.output_dir.join(report_file_name(date));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| ReportError::Write {
                path: path.clone(),
                source,
            })?;

        info!(
            path = %path.display(),
            rows = records.len(),
            complete = complete_respondents,
            "Report written"
        );

        let delivered = match self
            .messenger
            .send_file(&self.config.operator_phone, &path, &self.config.caption)
            .await
        {
            Ok(()) => {
                info!(to = %self.config.operator_phone, "Report delivered");
                true
            }
            Err(e) => {
                error!(to = %self.config.operator_phone, error = %e, "Report delivery failed");
                false
            }
        };

        let purged = if delivered && self.config.purge_after_delivery {
            match self.store.purge_respondents().await {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(error = %e, "Failed to purge answers after delivery");
                    None
                }
            }
        } else {
            None
        };

        Ok(ReportOutcome {
            path,
            rows: records.len(),
            complete_respondents,
            delivered,
            purged,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::DeliveryError;
    use crate::store::LibSqlBackend;
    use crate::survey::questions::StaticQuestionSource;

    /// Records every file send; optionally fails them.
    #[derive(Default)]
    struct FakeMessenger {
        fail: bool,
        files: StdMutex<Vec<(String, PathBuf, String)>>,
    }

    #[async_trait]
    impl Messenger for FakeMessenger {
        async fn send_text(&self, _phone: &str, _text: &str) -> Result<(), DeliveryError> {
            Ok(())
        }
        async fn send_image(&self, _phone: &str, _image: &Path, _caption: &str) -> Result<(), DeliveryError> {
            Ok(())
        }
        async fn send_file(&self, phone: &str, file: &Path, caption: &str) -> Result<(), DeliveryError> {
            self.files
                .lock()
                .unwrap()
                .push((phone.to_string(), file.to_path_buf(), caption.to_string()));
            if self.fail {
                return Err(DeliveryError::SendFailed {
                    kind: "file",
                    phone_number: phone.to_string(),
                    reason: "provider down".into(),
                });
            }
            Ok(())
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    async fn compiler(
        dir: &Path,
        messenger: Arc<FakeMessenger>,
        purge: bool,
    ) -> (ReportCompiler, Arc<LibSqlBackend>) {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let questions = Arc::new(StaticQuestionSource::new(["Q1", "Q2"]));
        let mut config = ReportConfig::new(dir, "917892409211");
        config.purge_after_delivery = purge;
        (
            ReportCompiler::new(store.clone(), questions, messenger, config),
            store,
        )
    }

    #[test]
    fn file_name_encodes_date() {
        assert_eq!(report_file_name(date()), "answer_2026-10-16.csv");
    }

    #[test]
    fn render_empty_is_header_only() {
        let bytes = render_report(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "phone_number\n");
    }

    #[test]
    fn render_sparse_columns_in_index_order() {
        let records = vec![
            RespondentRecord::new("9001")
                .with_answer(2, "Q2", "b")
                .with_answer(10, "Q10", "j"),
            RespondentRecord::new("9002").with_answer(1, "Q1", "yes, mostly"),
        ];
        let csv = String::from_utf8(render_report(&records).unwrap()).unwrap();
        assert_eq!(
            csv,
            "phone_number,question_1,answer_1,question_2,answer_2,question_10,answer_10\n\
             9001,,,Q2,b,Q10,j\n\
             9002,Q1,\"yes, mostly\",,,,\n"
        );
    }

    #[test]
    fn render_is_byte_stable() {
        let records = vec![
            RespondentRecord::new("a").with_answer(1, "Q1", "x"),
            RespondentRecord::new("b").with_answer(3, "Q3", "y"),
        ];
        assert_eq!(render_report(&records).unwrap(), render_report(&records).unwrap());
    }

    #[tokio::test]
    async fn compile_writes_and_delivers() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let (compiler, store) = compiler(dir.path(), messenger.clone(), false).await;

        store.upsert_answer("9002", 1, "Q1", "b1").await.unwrap();
        store.upsert_answer("9001", 1, "Q1", "a1").await.unwrap();
        store.upsert_answer("9001", 2, "Q2", "a2").await.unwrap();

        let outcome = compiler.compile(date()).await.unwrap();
        assert_eq!(outcome.rows, 2);
        assert_eq!(outcome.complete_respondents, 1);
        assert!(outcome.delivered);
        assert_eq!(outcome.purged, None);
        assert_eq!(outcome.path, dir.path().join("answer_2026-10-16.csv"));

        let contents = std::fs::read_to_string(&outcome.path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("9001,"));
        assert!(lines[2].starts_with("9002,"));

        let files = messenger.files.lock().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "917892409211");
        assert_eq!(files[0].1, outcome.path);
        assert_eq!(files[0].2, "Your daily report");
    }

    #[tokio::test]
    async fn delivery_failure_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(FakeMessenger {
            fail: true,
            ..Default::default()
        });
        let (compiler, store) = compiler(dir.path(), messenger, true).await;
        store.upsert_answer("9001", 1, "Q1", "a1").await.unwrap();

        let outcome = compiler.compile(date()).await.unwrap();
        assert!(!outcome.delivered);
        assert!(outcome.path.exists());
        // No purge when the operator never got the report.
        assert_eq!(outcome.purged, None);
        assert_eq!(store.list_respondents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn purge_after_successful_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let (compiler, store) = compiler(dir.path(), Arc::new(FakeMessenger::default()), true).await;
        store.upsert_answer("9001", 1, "Q1", "a1").await.unwrap();
        store.upsert_answer("9001", 2, "Q2", "a2").await.unwrap();

        let outcome = compiler.compile(date()).await.unwrap();
        assert_eq!(outcome.purged, Some(2));
        assert!(store.list_respondents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_store_produces_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let (compiler, _store) = compiler(dir.path(), Arc::new(FakeMessenger::default()), false).await;

        let outcome = compiler.compile(date()).await.unwrap();
        assert_eq!(outcome.rows, 0);
        assert_eq!(std::fs::read_to_string(&outcome.path).unwrap(), "phone_number\n");
    }

    #[tokio::test]
    async fn concurrent_run_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (compiler, _store) = compiler(dir.path(), Arc::new(FakeMessenger::default()), false).await;

        let _held = compiler.running.lock().await;
        let err = compiler.compile(date()).await.unwrap_err();
        assert!(matches!(err, ReportError::AlreadyRunning));
    }
}
