//! Survey core: answer extraction, respondent records, question sources, recording.

pub mod extract;
pub mod model;
pub mod questions;
pub mod recorder;

pub use model::{AnswerEntry, RespondentRecord, RespondentState, RosterEntry, RosterStatus};
pub use questions::{QuestionSource, SheetQuestionSource, StaticQuestionSource};
pub use recorder::{RecordedAnswer, ResponseRecorder};
