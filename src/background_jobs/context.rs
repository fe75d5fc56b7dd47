use crate::server_store::ServerStore;
use crate::stats::{SearchCountRecorder, StatsSynchronizer};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Context provided to jobs during execution.
#[derive(Clone)]
pub struct JobContext {
    /// Cancelled when the scheduler shuts down a cancellable job.
    pub cancellation_token: CancellationToken,

    /// Job history, schedules and audit log.
    pub server_store: Arc<dyn ServerStore>,

    pub synchronizer: Arc<StatsSynchronizer>,

    pub search_counts: Arc<SearchCountRecorder>,

    runtime: Handle,
}

impl JobContext {
    pub fn new(
        cancellation_token: CancellationToken,
        server_store: Arc<dyn ServerStore>,
        synchronizer: Arc<StatsSynchronizer>,
        search_counts: Arc<SearchCountRecorder>,
        runtime: Handle,
    ) -> Self {
        Self {
            cancellation_token,
            server_store,
            synchronizer,
            search_counts,
            runtime,
        }
    }

    /// Same context, different cancellation token.
    pub fn with_cancellation_token(&self, cancellation_token: CancellationToken) -> Self {
        Self {
            cancellation_token,
            ..self.clone()
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Drives `future` to completion on the server runtime. Only valid from the blocking
    /// thread a job executes on.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
