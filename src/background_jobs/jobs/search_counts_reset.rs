//! Clears the artist search counters when a new month starts.

use crate::background_jobs::{
    audit_logger::JobAuditLogger,
    context::JobContext,
    job::{BackgroundJob, CalendarTrigger, JobError, JobSchedule, ShutdownBehavior},
};
use serde_json::json;

pub struct SearchCountsResetJob;

impl BackgroundJob for SearchCountsResetJob {
    fn id(&self) -> &'static str {
        "search_counts_reset"
    }

    fn name(&self) -> &'static str {
        "Search Counts Reset"
    }

    fn description(&self) -> &'static str {
        "Drop last month's artist search counters"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Calendar(CalendarTrigger::MonthStart)
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // Single statement, let it finish
        ShutdownBehavior::WaitForCompletion
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let audit = JobAuditLogger::new(ctx.server_store.clone(), self.id());
        audit.log_started(None);

        match ctx.search_counts.reset_search_counts() {
            Ok(removed) => {
                audit.log_completed(Some(json!({ "removed": removed })));
                Ok(())
            }
            Err(e) => {
                audit.log_failed(&e.to_string(), None);
                Err(JobError::ExecutionFailed(e.to_string()))
            }
        }
    }
}
