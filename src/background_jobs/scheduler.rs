use super::context::JobContext;
use super::handle::{SchedulerCommand, SchedulerHandle, SharedJobState};
use super::job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
use crate::server::metrics;
use crate::server_store::{JobRunStatus, JobScheduleState, ServerStore};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Upper bound of a single scheduler sleep.
const MAX_IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// How long shutdown waits for each running job.
const SHUTDOWN_JOB_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages background job scheduling and execution.
pub struct JobScheduler {
    shared_state: Arc<RwLock<SharedJobState>>,

    /// Task handles of running jobs, owned by the scheduler loop
    running_handles: HashMap<String, JoinHandle<()>>,

    job_cancel_tokens: HashMap<String, CancellationToken>,

    server_store: Arc<dyn ServerStore>,

    command_receiver: mpsc::Receiver<SchedulerCommand>,

    shutdown_token: CancellationToken,

    job_context: JobContext,
}

impl JobScheduler {
    pub fn new(
        server_store: Arc<dyn ServerStore>,
        command_receiver: mpsc::Receiver<SchedulerCommand>,
        shutdown_token: CancellationToken,
        job_context: JobContext,
        shared_state: Arc<RwLock<SharedJobState>>,
    ) -> Self {
        Self {
            shared_state,
            running_handles: HashMap::new(),
            job_cancel_tokens: HashMap::new(),
            server_store,
            command_receiver,
            shutdown_token,
            job_context,
        }
    }

    /// Registers a job. Registering the same id twice is a no-op and returns false.
    ///
    /// Calendar-bound jobs without persisted state get their next boundary stored right
    /// away, so a boundary crossed while the process is down is still detected as due on
    /// the next start.
    pub async fn register_job(&mut self, job: Arc<dyn BackgroundJob>) -> bool {
        let job_id = job.id().to_string();
        {
            let mut state = self.shared_state.write().await;
            if state.jobs.contains_key(&job_id) {
                warn!("Job {} is already registered, ignoring", job_id);
                return false;
            }
            info!("Registering job: {} - {}", job_id, job.description());
            state.jobs.insert(job_id.clone(), Arc::clone(&job));
        }

        let schedule = job.schedule();
        if schedule.has_calendar() {
            match self.server_store.get_schedule_state(&job_id) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    if let Some(next_run_at) = schedule.next_run_after(Utc::now()) {
                        self.store_schedule_state(&job_id, next_run_at, None);
                    }
                }
                Err(e) => warn!("Failed to read schedule state for {}: {}", job_id, e),
            }
        }
        true
    }

    pub async fn job_count(&self) -> usize {
        self.shared_state.read().await.jobs.len()
    }

    /// Main scheduler loop. Returns once the shutdown token is cancelled and running jobs
    /// have been dealt with.
    pub async fn run(&mut self) {
        let job_count = self.job_count().await;
        info!("Starting job scheduler with {} registered jobs", job_count);

        match self.server_store.mark_stale_jobs_failed() {
            Ok(count) if count > 0 => {
                info!("Marked {} stale jobs as failed from previous run", count);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to mark stale jobs: {}", e);
            }
        }

        self.trigger_jobs_for_hook(HookEvent::OnStartup).await;

        loop {
            self.cleanup_completed_jobs().await;

            let sleep_duration = self.time_until_next_scheduled_job().await;
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs().await;
                }
                Some(cmd) = self.command_receiver.recv() => {
                    self.handle_command(cmd).await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    async fn handle_command(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::TriggerJob { job_id, response } => {
                let result = self.trigger_job(&job_id).await;
                let _ = response.send(result);
            }
        }
    }

    async fn trigger_job(&mut self, job_id: &str) -> Result<(), JobError> {
        {
            let state = self.shared_state.read().await;
            if !state.jobs.contains_key(job_id) {
                return Err(JobError::NotFound);
            }
            if state.running_jobs.contains(job_id) {
                return Err(JobError::AlreadyRunning);
            }
        }

        self.spawn_job(job_id, "manual").await;
        Ok(())
    }

    async fn time_until_next_scheduled_job(&self) -> Duration {
        let mut min_duration = MAX_IDLE_CHECK_INTERVAL;

        let state = self.shared_state.read().await;
        for (job_id, job) in &state.jobs {
            if state.running_jobs.contains(job_id) {
                continue;
            }

            if let Some(next_run) = self.get_next_run_time(job_id, &job.schedule()) {
                let now = Utc::now();
                if next_run <= now {
                    return Duration::ZERO;
                }
                let duration = (next_run - now).to_std().unwrap_or(Duration::from_secs(1));
                min_duration = min_duration.min(duration);
            }
        }

        min_duration
    }

    /// Persisted next run when present. Otherwise interval jobs are due immediately and
    /// calendar jobs wait for their next boundary. Hook-only jobs are never due.
    fn get_next_run_time(&self, job_id: &str, schedule: &JobSchedule) -> Option<DateTime<Utc>> {
        if !schedule.has_calendar() && !schedule.has_interval() {
            return None;
        }
        match self.server_store.get_schedule_state(job_id) {
            Ok(Some(state)) => Some(state.next_run_at),
            Ok(None) if schedule.has_calendar() => schedule.next_run_after(Utc::now()),
            Ok(None) => Some(Utc::now()),
            Err(e) => {
                warn!("Failed to read schedule state for {}: {}", job_id, e);
                None
            }
        }
    }

    async fn run_due_jobs(&mut self) {
        let now = Utc::now();
        let mut jobs_to_run = Vec::new();

        {
            let state = self.shared_state.read().await;
            for (job_id, job) in &state.jobs {
                if state.running_jobs.contains(job_id) {
                    continue;
                }
                if let Some(next_run) = self.get_next_run_time(job_id, &job.schedule()) {
                    if next_run <= now {
                        jobs_to_run.push(job_id.clone());
                    }
                }
            }
        }

        for job_id in jobs_to_run {
            self.spawn_job(&job_id, "schedule").await;
        }
    }

    async fn trigger_jobs_for_hook(&mut self, event: HookEvent) {
        let mut jobs_to_trigger = Vec::new();

        {
            let state = self.shared_state.read().await;
            for (job_id, job) in &state.jobs {
                if state.running_jobs.contains(job_id) {
                    debug!("Skipping hook trigger for already running job: {}", job_id);
                    continue;
                }
                if job.schedule().listens_to(event) {
                    jobs_to_trigger.push(job_id.clone());
                }
            }
        }

        for job_id in jobs_to_trigger {
            let trigger = format!("hook:{}", event);
            self.spawn_job(&job_id, &trigger).await;
        }
    }

    fn store_schedule_state(
        &self,
        job_id: &str,
        next_run_at: DateTime<Utc>,
        last_run_at: Option<DateTime<Utc>>,
    ) {
        let state = JobScheduleState {
            job_id: job_id.to_string(),
            next_run_at,
            last_run_at,
        };
        if let Err(e) = self.server_store.update_schedule_state(&state) {
            error!("Failed to update schedule state for {}: {}", job_id, e);
        }
    }

    async fn spawn_job(&mut self, job_id: &str, triggered_by: &str) {
        let job = {
            let state = self.shared_state.read().await;
            match state.jobs.get(job_id) {
                Some(job) => Arc::clone(job),
                None => {
                    error!("Attempted to spawn unknown job: {}", job_id);
                    return;
                }
            }
        };

        let run_id = match self.server_store.record_job_start(job_id, triggered_by) {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to record job start for {}: {}", job_id, e);
                return;
            }
        };

        info!(
            "Starting job: {} (run_id: {}, triggered_by: {})",
            job_id, run_id, triggered_by
        );

        {
            let mut state = self.shared_state.write().await;
            state.running_jobs.insert(job_id.to_string());
        }

        // Move the next run forward before the job finishes so a slow run is not
        // picked up again as due.
        let last_run_at = self
            .server_store
            .get_schedule_state(job_id)
            .ok()
            .flatten()
            .and_then(|s| s.last_run_at);
        if let Some(next_run_at) = job.schedule().next_run_after(Utc::now()) {
            self.store_schedule_state(job_id, next_run_at, last_run_at);
        }

        metrics::set_background_job_running(job_id, true);

        let cancel_token = self.job_context.cancellation_token.child_token();
        self.job_cancel_tokens
            .insert(job_id.to_string(), cancel_token.clone());
        let ctx = self.job_context.with_cancellation_token(cancel_token);

        let server_store = Arc::clone(&self.server_store);
        let job_id_owned = job_id.to_string();
        let shared_state = Arc::clone(&self.shared_state);

        let handle = tokio::spawn(async move {
            let start_time = Instant::now();
            let result = tokio::task::spawn_blocking(move || job.execute(&ctx)).await;
            let elapsed = start_time.elapsed();

            let (status, error_msg, status_label) = match result {
                Ok(Ok(())) => {
                    info!(
                        "Job {} completed successfully in {:?}",
                        job_id_owned, elapsed
                    );
                    (JobRunStatus::Completed, None, "success")
                }
                Ok(Err(JobError::Cancelled)) => {
                    info!("Job {} was cancelled after {:?}", job_id_owned, elapsed);
                    (
                        JobRunStatus::Failed,
                        Some("Cancelled".to_string()),
                        "cancelled",
                    )
                }
                Ok(Err(e)) => {
                    error!("Job {} failed after {:?}: {}", job_id_owned, elapsed, e);
                    (JobRunStatus::Failed, Some(e.to_string()), "failed")
                }
                Err(e) => {
                    error!("Job {} panicked after {:?}: {}", job_id_owned, elapsed, e);
                    (
                        JobRunStatus::Failed,
                        Some(format!("Task panic: {}", e)),
                        "panic",
                    )
                }
            };

            metrics::record_background_job_execution(&job_id_owned, status_label, elapsed);
            metrics::set_background_job_running(&job_id_owned, false);

            if let Err(e) = server_store.record_job_finish(run_id, status, error_msg) {
                error!("Failed to record job finish for {}: {}", job_id_owned, e);
            }

            shared_state.write().await.running_jobs.remove(&job_id_owned);
        });

        self.running_handles.insert(job_id.to_string(), handle);
    }

    async fn update_schedule_after_run(&self, job_id: &str) {
        let job = {
            let state = self.shared_state.read().await;
            match state.jobs.get(job_id) {
                Some(job) => Arc::clone(job),
                None => return,
            }
        };

        let now = Utc::now();
        if let Some(next_run_at) = job.schedule().next_run_after(now) {
            self.store_schedule_state(job_id, next_run_at, Some(now));
        }
    }

    async fn cleanup_completed_jobs(&mut self) {
        let completed: Vec<String> = self
            .running_handles
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(job_id, _)| job_id.clone())
            .collect();

        for job_id in completed {
            if let Some(handle) = self.running_handles.remove(&job_id) {
                let _ = handle.await;
            }
            self.job_cancel_tokens.remove(&job_id);
            self.update_schedule_after_run(&job_id).await;
        }
    }

    async fn shutdown(&mut self) {
        info!("Shutting down scheduler...");

        let mut wait_jobs = Vec::new();
        {
            let state = self.shared_state.read().await;
            for (job_id, handle) in self.running_handles.drain() {
                let behavior = state
                    .jobs
                    .get(&job_id)
                    .map(|j| j.shutdown_behavior())
                    .unwrap_or_default();
                if behavior == ShutdownBehavior::Cancellable {
                    if let Some(token) = self.job_cancel_tokens.get(&job_id) {
                        debug!("Cancelling job: {}", job_id);
                        token.cancel();
                    }
                } else {
                    info!("Waiting for job {} to complete...", job_id);
                }
                wait_jobs.push((job_id, handle));
            }
        }

        for (job_id, handle) in wait_jobs {
            if tokio::time::timeout(SHUTDOWN_JOB_TIMEOUT, handle)
                .await
                .is_err()
            {
                warn!("Job {} did not finish within {:?}", job_id, SHUTDOWN_JOB_TIMEOUT);
            }
        }

        self.job_cancel_tokens.clear();
        info!("Scheduler shutdown complete");
    }
}

/// Creates a scheduler and the handle used by the HTTP layer to talk to it.
pub fn create_scheduler(
    server_store: Arc<dyn ServerStore>,
    shutdown_token: CancellationToken,
    job_context: JobContext,
) -> (JobScheduler, SchedulerHandle) {
    let (command_tx, command_rx) = mpsc::channel(100);
    let shared_state = Arc::new(RwLock::new(SharedJobState {
        jobs: HashMap::new(),
        running_jobs: HashSet::new(),
    }));

    let scheduler = JobScheduler::new(
        server_store.clone(),
        command_rx,
        shutdown_token,
        job_context,
        Arc::clone(&shared_state),
    );

    let handle = SchedulerHandle::new(command_tx, shared_state, server_store);

    (scheduler, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background_jobs::job::CalendarTrigger;
    use crate::server_store::SqliteServerStore;
    use crate::stats::test_support::TestStats;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct TestJob {
        id: &'static str,
        schedule: JobSchedule,
        execution_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    impl TestJob {
        fn new(id: &'static str, schedule: JobSchedule) -> Self {
            Self {
                id,
                schedule,
                execution_count: Arc::new(AtomicUsize::new(0)),
                should_fail: false,
            }
        }

        fn failing(mut self) -> Self {
            self.should_fail = true;
            self
        }
    }

    impl BackgroundJob for TestJob {
        fn id(&self) -> &'static str {
            self.id
        }

        fn name(&self) -> &'static str {
            "Test Job"
        }

        fn description(&self) -> &'static str {
            "A test job for unit tests"
        }

        fn schedule(&self) -> JobSchedule {
            self.schedule.clone()
        }

        fn execute(&self, _ctx: &JobContext) -> Result<(), JobError> {
            self.execution_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(JobError::ExecutionFailed("Test failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        scheduler: JobScheduler,
        handle: SchedulerHandle,
        server_store: Arc<SqliteServerStore>,
        shutdown_token: CancellationToken,
        _stats: TestStats,
        _temp_dir: TempDir,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let server_store =
            Arc::new(SqliteServerStore::new(temp_dir.path().join("server.db")).unwrap());
        let stats = TestStats::new();
        let shutdown_token = CancellationToken::new();

        let job_context = JobContext::new(
            CancellationToken::new(),
            server_store.clone(),
            stats.synchronizer.clone(),
            stats.search_counts.clone(),
            tokio::runtime::Handle::current(),
        );
        let (scheduler, handle) =
            create_scheduler(server_store.clone(), shutdown_token.clone(), job_context);

        Fixture {
            scheduler,
            handle,
            server_store,
            shutdown_token,
            _stats: stats,
            _temp_dir: temp_dir,
        }
    }

    async fn wait_for_runs(handle: &SchedulerHandle, job_id: &str, expected: usize) {
        for _ in 0..40 {
            let history = handle.get_job_history(job_id, 10).unwrap();
            if history.len() >= expected && history.iter().all(|r| r.status != "running") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lists_registered_jobs_sorted() {
        let mut f = fixture();
        for id in ["job_c", "job_a", "job_b"] {
            let job = TestJob::new(id, JobSchedule::Hook(HookEvent::OnStartup));
            assert!(f.scheduler.register_job(Arc::new(job)).await);
        }

        let jobs = f.handle.list_jobs().await.unwrap();
        let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["job_a", "job_b", "job_c"]);
        assert!(!jobs[0].is_running);
        assert!(jobs[0].last_run.is_none());
        assert!(f.handle.job_exists("job_b").await);
        assert!(!f.handle.job_exists("nonexistent").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_registration_is_ignored() {
        let mut f = fixture();
        let first = TestJob::new("dup", JobSchedule::Hook(HookEvent::OnStartup));
        let second = TestJob::new("dup", JobSchedule::Interval(Duration::from_secs(10)));

        assert!(f.scheduler.register_job(Arc::new(first)).await);
        assert!(!f.scheduler.register_job(Arc::new(second)).await);

        assert_eq!(f.scheduler.job_count().await, 1);
        let job = f.handle.get_job("dup").await.unwrap().unwrap();
        assert_eq!(job.schedule.schedule_type, "hook");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn calendar_job_state_is_persisted_at_registration() {
        let mut f = fixture();
        let job = TestJob::new("monthly", JobSchedule::Calendar(CalendarTrigger::MonthStart));
        f.scheduler.register_job(Arc::new(job)).await;

        let state = f.server_store.get_schedule_state("monthly").unwrap().unwrap();
        assert_eq!(state.next_run_at, crate::period::next_month_start(Utc::now()));
        assert!(state.last_run_at.is_none());

        let info = f.handle.get_job("monthly").await.unwrap().unwrap();
        assert_eq!(info.schedule.calendar, Some("month_start".to_string()));
        assert!(info.next_run_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn startup_hook_runs_job() {
        let mut f = fixture();
        let job = TestJob::new("startup_job", JobSchedule::Hook(HookEvent::OnStartup));
        let exec_count = job.execution_count.clone();
        f.scheduler.register_job(Arc::new(job)).await;

        let mut scheduler = f.scheduler;
        let sched_task = tokio::spawn(async move { scheduler.run().await });
        wait_for_runs(&f.handle, "startup_job", 1).await;

        assert_eq!(exec_count.load(Ordering::SeqCst), 1);
        let history = f.handle.get_job_history("startup_job", 10).unwrap();
        assert_eq!(history[0].status, "completed");
        assert_eq!(history[0].triggered_by, "hook:OnStartup");

        f.shutdown_token.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(2), sched_task).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_job_records_error() {
        let mut f = fixture();
        let job = TestJob::new("failing_job", JobSchedule::Hook(HookEvent::OnStartup)).failing();
        f.scheduler.register_job(Arc::new(job)).await;

        let mut scheduler = f.scheduler;
        let sched_task = tokio::spawn(async move { scheduler.run().await });
        wait_for_runs(&f.handle, "failing_job", 1).await;

        let history = f.handle.get_job_history("failing_job", 10).unwrap();
        assert_eq!(history[0].status, "failed");
        assert!(history[0]
            .error_message
            .as_ref()
            .unwrap()
            .contains("Test failure"));

        f.shutdown_token.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(2), sched_task).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missed_calendar_boundary_fires_on_start() {
        let mut f = fixture();
        let failing = TestJob::new(
            "broken_monthly",
            JobSchedule::Calendar(CalendarTrigger::MonthStart),
        )
        .failing();
        let healthy = TestJob::new("monthly", JobSchedule::Calendar(CalendarTrigger::MonthStart));
        let exec_count = healthy.execution_count.clone();

        // Both boundaries were crossed while the process was down.
        let missed = Utc::now() - chrono::Duration::days(2);
        for id in ["broken_monthly", "monthly"] {
            f.server_store
                .update_schedule_state(&JobScheduleState {
                    job_id: id.to_string(),
                    next_run_at: missed,
                    last_run_at: None,
                })
                .unwrap();
        }
        f.scheduler.register_job(Arc::new(failing)).await;
        f.scheduler.register_job(Arc::new(healthy)).await;

        let mut scheduler = f.scheduler;
        let sched_task = tokio::spawn(async move { scheduler.run().await });
        wait_for_runs(&f.handle, "monthly", 1).await;
        wait_for_runs(&f.handle, "broken_monthly", 1).await;

        assert_eq!(exec_count.load(Ordering::SeqCst), 1);
        let history = f.handle.get_job_history("monthly", 10).unwrap();
        assert_eq!(history[0].status, "completed");
        assert_eq!(history[0].triggered_by, "schedule");
        let broken = f.handle.get_job_history("broken_monthly", 10).unwrap();
        assert_eq!(broken[0].status, "failed");

        let state = f.server_store.get_schedule_state("monthly").unwrap().unwrap();
        assert!(state.next_run_at > Utc::now());

        f.shutdown_token.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(2), sched_task).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn manual_trigger_of_unknown_job_is_rejected() {
        let mut f = fixture();
        let job = TestJob::new("manual_job", JobSchedule::Hook(HookEvent::OnStartup));
        f.scheduler.register_job(Arc::new(job)).await;

        let mut scheduler = f.scheduler;
        let sched_task = tokio::spawn(async move { scheduler.run().await });

        assert_eq!(
            f.handle.trigger_job("nonexistent").await,
            Err(JobError::NotFound)
        );

        wait_for_runs(&f.handle, "manual_job", 1).await;
        f.handle.trigger_job("manual_job").await.unwrap();
        wait_for_runs(&f.handle, "manual_job", 2).await;

        let history = f.handle.get_job_history("manual_job", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].triggered_by, "manual");

        f.shutdown_token.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(2), sched_task).await;
    }
}
