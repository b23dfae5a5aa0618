//! Question sources: the ordered question list, fetched fresh on every call.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SourceError;

/// Read-only provider of the ordered question list.
///
/// Implementations never fail past this boundary: an unreachable or malformed
/// source yields an empty list.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn questions(&self) -> Vec<String>;
}

/// Questions from the first column of a spreadsheet, read through its CSV export URL.
pub struct SheetQuestionSource {
    client: reqwest::Client,
    csv_url: String,
}

impl SheetQuestionSource {
    /// `client` should carry a request timeout.
    pub fn new(client: reqwest::Client, csv_url: impl Into<String>) -> Self {
        Self {
            client,
            csv_url: csv_url.into(),
        }
    }

    async fn fetch(&self) -> Result<Vec<String>, SourceError> {
        let resp = self
            .client
            .get(&self.csv_url)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "sheet export returned {}",
                resp.status()
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        parse_first_column(&body)
    }
}

#[async_trait]
impl QuestionSource for SheetQuestionSource {
    async fn questions(&self) -> Vec<String> {
        match self.fetch().await {
            Ok(questions) => {
                debug!(count = questions.len(), "Fetched questions from sheet");
                questions
            }
            Err(e) => {
                warn!(url = %self.csv_url, error = %e, "Error fetching questions from sheet");
                Vec::new()
            }
        }
    }
}

/// Fixed question list, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticQuestionSource {
    questions: Vec<String>,
}

impl StaticQuestionSource {
    pub fn new<I, S>(questions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            questions: questions.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionSource {
    async fn questions(&self) -> Vec<String> {
        self.questions.clone()
    }
}

/// Non-blank cells of the first CSV column, trimmed, in sheet order.
pub fn parse_first_column(csv_bytes: &[u8]) -> Result<Vec<String>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_bytes);

    let mut questions = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SourceError::Malformed(e.to_string()))?;
        if let Some(cell) = record.get(0).map(str::trim).filter(|c| !c.is_empty()) {
            questions.push(cell.to_string());
        }
    }
    Ok(questions)
}
