//! Worker-side state of queued mass edit jobs.
//!
//! Jobs run outside the request that submitted them and their outcome is not
//! reported back to that request. This module keeps the last known status of
//! every job so operators can look a job up by id (`GET /api/jobs/{job_id}`).
//!
//! - `JobsState`: clonable, shared map of job id to `JobStatus`, plus the sender
//!   used to update it. Injected into the Actix application in `main.rs`.
//! - `JobUpdate`: one status change, sent by the dispatcher (`Pending`) and by
//!   the worker (`InProgress`, `Completed`, `Failed`).
//! - `start_job_updater`: the single task that applies updates to the map.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

#[derive(Clone)]
pub struct JobsState {
    /// Job id to its latest status. Only `start_job_updater` writes to it.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Producers (dispatcher, worker) report through this channel instead of
    /// locking the map themselves.
    pub tx: mpsc::Sender<JobUpdate>,
}

impl JobsState {
    pub fn new(tx: mpsc::Sender<JobUpdate>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        }
    }
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

/// Applies every `JobUpdate` received on `rx` to the shared map until all
/// senders are gone. Spawned once from `main.rs`.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id, update.status);
    }
}
