//! Daily answer report: compilation and scheduling.

pub mod compiler;
pub mod scheduler;

pub use compiler::{ReportCompiler, ReportOutcome, render_report, report_file_name};
pub use scheduler::{CronTrigger, Trigger, spawn_report_scheduler};
