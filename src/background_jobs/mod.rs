//! Background job scheduling and execution.
//!
//! Jobs run on calendar boundaries, fixed intervals or startup hooks, and can be
//! triggered manually through the admin API.

mod audit_logger;
mod context;
mod handle;
mod job;
pub mod jobs;
mod scheduler;

pub use audit_logger::JobAuditLogger;
pub use context::JobContext;
pub use handle::{JobInfo, JobRunInfo, JobScheduleInfo, SchedulerHandle};
pub use job::{
    BackgroundJob, CalendarTrigger, HookEvent, JobError, JobSchedule, ShutdownBehavior,
};
pub use scheduler::{create_scheduler, JobScheduler};
