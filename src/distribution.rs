//! Startup distribution sweep: sends each unsent roster entry its branch image
//! and the question list, then marks the entry sent.
//!
//! An entry whose deliveries succeeded but whose status update failed to persist
//! stays `unsent` and is sent again on the next start.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::channels::Messenger;
use crate::config::SweepConfig;
use crate::error::DatabaseError;
use crate::store::RosterStore;
use crate::survey::model::{RosterEntry, RosterStatus};
use crate::survey::questions::QuestionSource;

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Entries delivered and marked sent.
    pub sent: usize,
    /// Entries left unsent because no branch image exists.
    pub missing_image: usize,
    /// Entries skipped for an empty branch or phone number.
    pub invalid: usize,
    /// Entries left unsent (or unmarked) after a delivery or status failure.
    pub failed: usize,
}

impl std::fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sent, {} missing image, {} invalid, {} failed",
            self.sent, self.missing_image, self.invalid, self.failed
        )
    }
}

/// How a single roster entry ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Sent,
    MissingImage,
    Invalid,
    Failed,
}

/// One-shot distribution of branch images and questions to the staff roster.
pub struct DistributionSweep {
    roster: Arc<dyn RosterStore>,
    questions: Arc<dyn QuestionSource>,
    messenger: Arc<dyn Messenger>,
    config: SweepConfig,
}

impl DistributionSweep {
    pub fn new(
        roster: Arc<dyn RosterStore>,
        questions: Arc<dyn QuestionSource>,
        messenger: Arc<dyn Messenger>,
        config: SweepConfig,
    ) -> Self {
        Self {
            roster,
            questions,
            messenger,
            config,
        }
    }

    /// Run the sweep over every unsent entry.
    ///
    /// Only a failure to read the roster is returned; everything per entry is logged.
    pub async fn run(&self) -> Result<SweepSummary, DatabaseError> {
        let entries = self.roster.list_staff_by_status(RosterStatus::Unsent).await?;
        let mut summary = SweepSummary::default();
        if entries.is_empty() {
            info!("No unsent roster entries");
            return Ok(summary);
        }

        let questions = self.questions.questions().await;
        if questions.is_empty() {
            warn!("Question list is empty; images will be sent without questions");
        }

        for entry in &entries {
            match self.process_entry(entry, &questions).await {
                EntryOutcome::Sent => summary.sent += 1,
                EntryOutcome::MissingImage => summary.missing_image += 1,
                EntryOutcome::Invalid => summary.invalid += 1,
                EntryOutcome::Failed => summary.failed += 1,
            }
        }

        info!(
            sent = summary.sent,
            missing_image = summary.missing_image,
            invalid = summary.invalid,
            failed = summary.failed,
            "Distribution sweep complete"
        );
        Ok(summary)
    }

    async fn process_entry(&self, entry: &RosterEntry, questions: &[String]) -> EntryOutcome {
        let branch = entry.branch.trim();
        let phone_number = entry.phone_number.trim();
        if branch.is_empty() || phone_number.is_empty() {
            warn!(id = entry.id, "Roster entry missing branch or phone number");
            return EntryOutcome::Invalid;
        }

        let Some(image) =
            find_branch_image(&self.config.image_dir, branch, &self.config.image_extensions)
        else {
            warn!(branch, "No image found for branch");
            return EntryOutcome::MissingImage;
        };

        let caption = format!("Here is your image for branch {branch}");
        if let Err(e) = self.messenger.send_image(phone_number, &image, &caption).await {
            error!(branch, phone_number, error = %e, "Branch image delivery failed");
            return EntryOutcome::Failed;
        }
        info!(branch, phone_number, image = %image.display(), "Branch image sent");

        let mut question_failures = 0;
        for question in questions {
            if let Err(e) = self.messenger.send_text(phone_number, question).await {
                question_failures += 1;
                warn!(phone_number, error = %e, "Question delivery failed");
            }
        }
        info!(
            branch,
            phone_number,
            sent = questions.len() - question_failures,
            failed = question_failures,
            "Questions sent"
        );

        match self.roster.update_staff_status(entry.id, RosterStatus::Sent).await {
            Ok(()) => EntryOutcome::Sent,
            Err(e) => {
                error!(id = entry.id, error = %e, "Failed to mark roster entry sent; it will be re-sent next start");
                EntryOutcome::Failed
            }
        }
    }
}

/// First `<dir>/<branch>.<ext>` that exists, trying `extensions` in order.
pub fn find_branch_image(dir: &Path, branch: &str, extensions: &[String]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| dir.join(format!("{branch}.{}", ext.trim_start_matches('.'))))
        .find(|candidate| candidate.is_file())
}
