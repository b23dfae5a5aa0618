//! Response recorder: turns one inbound message into a stored answer.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::RecordError;
use crate::store::RespondentStore;
use crate::survey::extract;
use crate::survey::questions::QuestionSource;

/// What was stored for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAnswer {
    pub phone_number: String,
    pub index: usize,
    pub question: String,
    pub answer: String,
}

/// Matches inbound messages to questions and merges them into respondent records.
pub struct ResponseRecorder {
    questions: Arc<dyn QuestionSource>,
    store: Arc<dyn RespondentStore>,
}

impl ResponseRecorder {
    pub fn new(questions: Arc<dyn QuestionSource>, store: Arc<dyn RespondentStore>) -> Self {
        Self { questions, store }
    }

    /// Record `raw_message` from `phone_number`.
    ///
    /// Nothing is written when the message carries no usable index or the index
    /// falls outside the current question list.
    pub async fn record(
        &self,
        phone_number: &str,
        raw_message: &str,
    ) -> Result<RecordedAnswer, RecordError> {
        let questions = self.questions.questions().await;
        let extracted = extract::extract(raw_message);
        debug!(phone_number, index = ?extracted.index, "Extracted question index");

        let index = extracted.index.ok_or(RecordError::NoQuestionIndex)?;
        let question = index
            .checked_sub(1)
            .and_then(|i| questions.get(i))
            .ok_or(RecordError::QuestionIndexOutOfRange {
                index,
                available: questions.len(),
            })?;

        self.store
            .upsert_answer(phone_number, index, question, extracted.answer)
            .await?;

        info!(phone_number, index, "Recorded answer");
        Ok(RecordedAnswer {
            phone_number: phone_number.to_string(),
            index,
            question: question.clone(),
            answer: extracted.answer.to_string(),
        })
    }
}
