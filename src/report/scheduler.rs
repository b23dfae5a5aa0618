//! Report scheduling: a pluggable trigger plus the ticker that drives the compiler.
//!
//! The ticker awaits each compilation before asking the trigger for the next
//! fire time, so runs never overlap.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::ConfigError;
use crate::report::compiler::ReportCompiler;

/// Computes when the next report run is due.
pub trait Trigger: Send + Sync {
    /// First fire time strictly after `after`, or `None` when the trigger is exhausted.
    fn next_fire(&self, after: DateTime<Local>) -> Option<DateTime<Local>>;
}

/// Cron-expression trigger (6 fields: sec min hour dom month dow), local wall clock.
#[derive(Debug, Clone)]
pub struct CronTrigger {
    schedule: cron::Schedule,
}

impl CronTrigger {
    pub fn parse(expr: &str) -> Result<Self, ConfigError> {
        let schedule = cron::Schedule::from_str(expr).map_err(|e| ConfigError::InvalidValue {
            key: "REPORT_SCHEDULE".into(),
            message: format!("invalid cron '{expr}': {e}"),
        })?;
        Ok(Self { schedule })
    }

    /// Every day at `hour:minute:00`.
    pub fn daily_at(hour: u32, minute: u32) -> Result<Self, ConfigError> {
        Self::parse(&format!("0 {minute} {hour} * * *"))
    }
}

impl Trigger for CronTrigger {
    fn next_fire(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        self.schedule.after(&after).next()
    }
}

/// Spawn the report ticker. Runs until the trigger is exhausted.
pub fn spawn_report_scheduler(
    trigger: Arc<dyn Trigger>,
    compiler: Arc<ReportCompiler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(next) = trigger.next_fire(Local::now()) {
            info!(next = %next, "Next report run scheduled");

            let wait = (next - Local::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            match compiler.compile(next.date_naive()).await {
                Ok(outcome) if outcome.delivered => {
                    info!(path = %outcome.path.display(), rows = outcome.rows, "Scheduled report complete");
                }
                Ok(outcome) => {
                    warn!(path = %outcome.path.display(), "Scheduled report written but not delivered");
                }
                Err(e) => error!(error = %e, "Scheduled report failed"),
            }
        }
        info!("Report trigger exhausted, scheduler stopped");
    })
}
