use super::context::JobContext;
use crate::period::next_month_start;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Calendar boundaries a job can be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarTrigger {
    /// Midnight UTC of the first day of every month.
    MonthStart,
}

impl CalendarTrigger {
    /// The first boundary strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            CalendarTrigger::MonthStart => next_month_start(after),
        }
    }
}

impl std::fmt::Display for CalendarTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarTrigger::MonthStart => write!(f, "month_start"),
        }
    }
}

/// Schedule for when a job should run.
#[derive(Debug, Clone, PartialEq)]
pub enum JobSchedule {
    /// Run at calendar boundaries
    Calendar(CalendarTrigger),
    /// Run at fixed intervals
    Interval(Duration),
    /// Run only in response to hooks
    Hook(HookEvent),
    /// Combination of scheduled and hook-triggered
    Combined {
        calendar: Option<CalendarTrigger>,
        interval: Option<Duration>,
        hooks: Vec<HookEvent>,
    },
}

impl JobSchedule {
    fn timed_parts(&self) -> (Option<CalendarTrigger>, Option<Duration>) {
        match self {
            JobSchedule::Calendar(trigger) => (Some(*trigger), None),
            JobSchedule::Interval(interval) => (None, Some(*interval)),
            JobSchedule::Hook(_) => (None, None),
            JobSchedule::Combined {
                calendar, interval, ..
            } => (*calendar, *interval),
        }
    }

    pub fn has_calendar(&self) -> bool {
        self.timed_parts().0.is_some()
    }

    pub fn has_interval(&self) -> bool {
        self.timed_parts().1.is_some()
    }

    /// Next time-based run after `after`: the earliest of the calendar boundary and the
    /// interval. None for hook-only schedules.
    pub fn next_run_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let (calendar, interval) = self.timed_parts();
        let by_calendar = calendar.map(|trigger| trigger.next_after(after));
        let by_interval =
            interval.map(|i| after + chrono::Duration::from_std(i).unwrap_or_default());
        match (by_calendar, by_interval) {
            (Some(c), Some(i)) => Some(c.min(i)),
            (c, i) => c.or(i),
        }
    }

    pub fn listens_to(&self, event: HookEvent) -> bool {
        match self {
            JobSchedule::Hook(hook) => *hook == event,
            JobSchedule::Combined { hooks, .. } => hooks.contains(&event),
            _ => false,
        }
    }
}

/// Events that can trigger hook-based jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    OnStartup,
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookEvent::OnStartup => write!(f, "OnStartup"),
        }
    }
}

/// How a job should be handled during server shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownBehavior {
    /// Job is signalled through its cancellation token
    #[default]
    Cancellable,
    /// Job is left to finish on its own
    WaitForCompletion,
}

#[derive(Debug, PartialEq, Eq)]
pub enum JobError {
    NotFound,
    AlreadyRunning,
    ExecutionFailed(String),
    Cancelled,
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::NotFound => write!(f, "Job not found"),
            JobError::AlreadyRunning => write!(f, "Job is already running"),
            JobError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            JobError::Cancelled => write!(f, "Job was cancelled"),
        }
    }
}

impl std::error::Error for JobError {}

/// A unit of background work.
///
/// Jobs run synchronously on a blocking worker thread; async work goes through
/// [`JobContext::block_on`]. Long jobs should poll [`JobContext::is_cancelled`].
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier, used in the API and the job history.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn schedule(&self) -> JobSchedule;

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::default()
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
