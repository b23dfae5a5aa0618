//! Respondent records, respondent state, and staff roster entries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One recorded answer: the question text at the time of answering, and the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question: String,
    pub answer: String,
}

impl AnswerEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// All answers collected from one phone number, keyed by 1-based question index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondentRecord {
    pub phone_number: String,
    pub answers: BTreeMap<usize, AnswerEntry>,
}

impl RespondentRecord {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            answers: BTreeMap::new(),
        }
    }

    /// Merge one answer. Overwrites the same index, leaves every other index alone.
    pub fn merge(&mut self, index: usize, entry: AnswerEntry) {
        self.answers.insert(index, entry);
    }

    pub fn with_answer(mut self, index: usize, question: &str, answer: &str) -> Self {
        self.merge(index, AnswerEntry::new(question, answer));
        self
    }

    /// Where this respondent stands against a question list of `question_count` entries.
    ///
    /// Answers recorded for indices past the end of the current list are ignored.
    pub fn state(&self, question_count: usize) -> RespondentState {
        let answered = self
            .answers
            .keys()
            .filter(|&&i| i >= 1 && i <= question_count)
            .count();

        if answered == 0 {
            RespondentState::Unanswered
        } else if answered == question_count {
            RespondentState::Complete
        } else {
            RespondentState::Partial {
                answered,
                total: question_count,
            }
        }
    }

    /// True once every question of the current list has an answer.
    pub fn is_complete(&self, question_count: usize) -> bool {
        self.state(question_count) == RespondentState::Complete
    }
}

/// Progress of one respondent through the question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespondentState {
    Unanswered,
    Partial { answered: usize, total: usize },
    Complete,
}

impl fmt::Display for RespondentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unanswered => write!(f, "unanswered"),
            Self::Partial { answered, total } => write!(f, "partial ({answered}/{total})"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Distribution status of a roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterStatus {
    Unsent,
    Sent,
}

impl RosterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsent => "unsent",
            Self::Sent => "sent",
        }
    }
}

impl fmt::Display for RosterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RosterStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Rows imported from the staff directory carry an empty status until sent.
            "unsent" | "" => Ok(Self::Unsent),
            "sent" => Ok(Self::Sent),
            other => Err(format!("unknown roster status: {other}")),
        }
    }
}

/// One staff member / branch eligible for the startup distribution sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: i64,
    pub branch: String,
    pub phone_number: String,
    pub status: RosterStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_same_index_only() {
        let mut record = RespondentRecord::new("917890000001")
            .with_answer(1, "Q1", "first")
            .with_answer(2, "Q2", "second");

        record.merge(1, AnswerEntry::new("Q1", "revised"));

        assert_eq!(record.answers.len(), 2);
        assert_eq!(record.answers[&1].answer, "revised");
        assert_eq!(record.answers[&2].answer, "second");
    }

    #[test]
    fn state_progression() {
        let record = RespondentRecord::new("p");
        assert_eq!(record.state(3), RespondentState::Unanswered);

        let record = record.with_answer(2, "Q2", "a");
        assert_eq!(
            record.state(3),
            RespondentState::Partial {
                answered: 1,
                total: 3
            }
        );

        let record = record.with_answer(1, "Q1", "a").with_answer(3, "Q3", "a");
        assert_eq!(record.state(3), RespondentState::Complete);
        assert!(record.is_complete(3));
    }

    #[test]
    fn state_ignores_indices_beyond_list() {
        let record = RespondentRecord::new("p")
            .with_answer(1, "Q1", "a")
            .with_answer(7, "Q7", "stale");
        assert_eq!(
            record.state(2),
            RespondentState::Partial {
                answered: 1,
                total: 2
            }
        );
    }

    #[test]
    fn empty_question_list_is_never_complete() {
        let record = RespondentRecord::new("p").with_answer(1, "Q1", "a");
        assert_eq!(record.state(0), RespondentState::Unanswered);
    }

    #[test]
    fn roster_status_parse() {
        assert_eq!("sent".parse::<RosterStatus>().unwrap(), RosterStatus::Sent);
        assert_eq!("".parse::<RosterStatus>().unwrap(), RosterStatus::Unsent);
        assert!("bogus".parse::<RosterStatus>().is_err());
        assert_eq!(RosterStatus::Unsent.to_string(), "unsent");
    }
}
