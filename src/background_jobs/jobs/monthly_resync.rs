//! Re-synchronizes every artist, content and community snapshot from upstream.
//!
//! Runs at each month start by default. A fixed interval can replace the calendar trigger,
//! and the job can additionally run once on startup.

use crate::background_jobs::{
    audit_logger::JobAuditLogger,
    context::JobContext,
    job::{BackgroundJob, CalendarTrigger, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use serde_json::json;
use std::time::Duration;
use tracing::info;

pub struct MonthlyResyncJob {
    interval: Option<Duration>,
    on_startup: bool,
}

impl MonthlyResyncJob {
    pub fn from_settings(resync_interval_secs: Option<u64>, resync_on_startup: bool) -> Self {
        Self {
            interval: resync_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            on_startup: resync_on_startup,
        }
    }
}

impl Default for MonthlyResyncJob {
    fn default() -> Self {
        Self::from_settings(None, false)
    }
}

impl BackgroundJob for MonthlyResyncJob {
    fn id(&self) -> &'static str {
        "monthly_resync"
    }

    fn name(&self) -> &'static str {
        "Monthly Resync"
    }

    fn description(&self) -> &'static str {
        "Refresh artist, content and community statistics from the upstream services"
    }

    fn schedule(&self) -> JobSchedule {
        let (calendar, interval) = match self.interval {
            Some(interval) => (None, Some(interval)),
            None => (Some(CalendarTrigger::MonthStart), None),
        };
        match (self.on_startup, calendar, interval) {
            (true, calendar, interval) => JobSchedule::Combined {
                calendar,
                interval,
                hooks: vec![HookEvent::OnStartup],
            },
            (false, Some(trigger), _) => JobSchedule::Calendar(trigger),
            (false, None, Some(interval)) => JobSchedule::Interval(interval),
            (false, None, None) => JobSchedule::Calendar(CalendarTrigger::MonthStart),
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // Every item is committed on its own; the next run picks up the rest.
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let audit = JobAuditLogger::new(ctx.server_store.clone(), self.id());
        audit.log_started(None);

        let cancelled = |synced: serde_json::Value| {
            info!("Monthly resync cancelled");
            audit.log_failed("cancelled", Some(synced));
            Err(JobError::Cancelled)
        };

        if ctx.is_cancelled() {
            return cancelled(json!({}));
        }

        let token = ctx.cancellation_token.clone();
        let artists = ctx.block_on(
            ctx.synchronizer
                .sync_all_artists_until(move || token.is_cancelled()),
        );
        audit.log_progress(json!({ "artists": artists.len() }));
        if ctx.is_cancelled() {
            return cancelled(json!({ "artists": artists.len() }));
        }

        let token = ctx.cancellation_token.clone();
        let contents = ctx.block_on(
            ctx.synchronizer
                .sync_all_content_until(move || token.is_cancelled()),
        );
        audit.log_progress(json!({ "contents": contents.len() }));
        if ctx.is_cancelled() {
            return cancelled(json!({
                "artists": artists.len(),
                "contents": contents.len(),
            }));
        }

        let token = ctx.cancellation_token.clone();
        let communities = ctx.block_on(
            ctx.synchronizer
                .sync_all_communities_until(move || token.is_cancelled()),
        );

        info!(
            "Monthly resync done: {} artists, {} contents, {} communities",
            artists.len(),
            contents.len(),
            communities.len()
        );
        audit.log_completed(Some(json!({
            "artists": artists.len(),
            "contents": contents.len(),
            "communities": communities.len(),
        })));
        Ok(())
    }
}
