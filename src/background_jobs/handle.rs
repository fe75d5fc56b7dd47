use super::job::{BackgroundJob, JobError, JobSchedule};
use crate::server_store::{JobAuditEntry, JobRun, ServerStore};
use anyhow::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Information about a registered job for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub schedule: JobScheduleInfo,
    pub is_running: bool,
    pub last_run: Option<JobRunInfo>,
    pub next_run_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobScheduleInfo {
    #[serde(rename = "type")]
    pub schedule_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Vec<String>>,
}

impl From<JobSchedule> for JobScheduleInfo {
    fn from(schedule: JobSchedule) -> Self {
        match schedule {
            JobSchedule::Calendar(trigger) => JobScheduleInfo {
                schedule_type: "calendar".to_string(),
                calendar: Some(trigger.to_string()),
                value_secs: None,
                hooks: None,
            },
            JobSchedule::Interval(duration) => JobScheduleInfo {
                schedule_type: "interval".to_string(),
                value_secs: Some(duration.as_secs()),
                calendar: None,
                hooks: None,
            },
            JobSchedule::Hook(event) => JobScheduleInfo {
                schedule_type: "hook".to_string(),
                hooks: Some(vec![event.to_string()]),
                value_secs: None,
                calendar: None,
            },
            JobSchedule::Combined {
                calendar,
                interval,
                hooks,
            } => JobScheduleInfo {
                schedule_type: "combined".to_string(),
                calendar: calendar.map(|c| c.to_string()),
                value_secs: interval.map(|d| d.as_secs()),
                hooks: Some(hooks.iter().map(|h| h.to_string()).collect()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRunInfo {
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub triggered_by: String,
}

impl From<JobRun> for JobRunInfo {
    fn from(run: JobRun) -> Self {
        JobRunInfo {
            started_at: run.started_at.to_rfc3339(),
            finished_at: run.finished_at.map(|dt| dt.to_rfc3339()),
            status: run.status.as_str().to_string(),
            error_message: run.error_message,
            triggered_by: run.triggered_by,
        }
    }
}

pub enum SchedulerCommand {
    TriggerJob {
        job_id: String,
        response: oneshot::Sender<Result<(), JobError>>,
    },
}

/// State shared between the scheduler loop and its handles.
pub struct SharedJobState {
    /// Set at registration, never changes afterwards
    pub jobs: HashMap<String, Arc<dyn BackgroundJob>>,
    pub running_jobs: HashSet<String>,
}

/// Handle to interact with the job scheduler from HTTP handlers.
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    shared_state: Arc<RwLock<SharedJobState>>,
    server_store: Arc<dyn ServerStore>,
}

impl SchedulerHandle {
    pub fn new(
        command_tx: mpsc::Sender<SchedulerCommand>,
        shared_state: Arc<RwLock<SharedJobState>>,
        server_store: Arc<dyn ServerStore>,
    ) -> Self {
        Self {
            command_tx,
            shared_state,
            server_store,
        }
    }

    fn job_info(&self, job: &Arc<dyn BackgroundJob>, is_running: bool) -> Result<JobInfo> {
        let job_id = job.id();
        let last_run = self
            .server_store
            .get_last_run(job_id)?
            .map(JobRunInfo::from);
        let next_run_at = self
            .server_store
            .get_schedule_state(job_id)?
            .map(|s| s.next_run_at.to_rfc3339());

        Ok(JobInfo {
            id: job_id.to_string(),
            name: job.name().to_string(),
            description: job.description().to_string(),
            schedule: job.schedule().into(),
            is_running,
            last_run,
            next_run_at,
        })
    }

    /// All registered jobs, sorted by id.
    pub async fn list_jobs(&self) -> Result<Vec<JobInfo>> {
        let state = self.shared_state.read().await;
        let mut jobs = state
            .jobs
            .iter()
            .map(|(job_id, job)| self.job_info(job, state.running_jobs.contains(job_id)))
            .collect::<Result<Vec<_>>>()?;
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(jobs)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobInfo>> {
        let state = self.shared_state.read().await;
        match state.jobs.get(job_id) {
            Some(job) => Ok(Some(
                self.job_info(job, state.running_jobs.contains(job_id))?,
            )),
            None => Ok(None),
        }
    }

    /// Asks the scheduler to start a job now. Resolves once the job has been spawned,
    /// not when it finishes.
    pub async fn trigger_job(&self, job_id: &str) -> Result<(), JobError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(SchedulerCommand::TriggerJob {
                job_id: job_id.to_string(),
                response: response_tx,
            })
            .await
            .map_err(|_| JobError::ExecutionFailed("Scheduler not available".to_string()))?;

        response_rx
            .await
            .map_err(|_| JobError::ExecutionFailed("Scheduler did not respond".to_string()))?
    }

    pub fn get_job_history(&self, job_id: &str, limit: usize) -> Result<Vec<JobRunInfo>> {
        let history = self.server_store.get_job_history(job_id, limit)?;
        Ok(history.into_iter().map(JobRunInfo::from).collect())
    }

    pub async fn is_job_running(&self, job_id: &str) -> bool {
        self.shared_state.read().await.running_jobs.contains(job_id)
    }

    pub async fn job_exists(&self, job_id: &str) -> bool {
        self.shared_state.read().await.jobs.contains_key(job_id)
    }

    pub fn get_job_audit_log_by_job(
        &self,
        job_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<JobAuditEntry>> {
        self.server_store
            .get_job_audit_log_by_job(job_id, limit, offset)
    }
}
