//! Hands validated mass edits to the background worker.

use crate::job_controller::state::JobUpdate;
use crate::massadmin::registry::ModelDescriptor;
use common::jobs::JobStatus;
use common::model::batch::IdentifierBatch;
use common::model::mass_edit::MassEditJob;
use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Fire-and-forget job queue. Nothing about the job's outcome flows back.
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, job: MassEditJob);
}

/// In-process queue feeding `worker::start_worker`.
#[derive(Clone)]
pub struct ChannelQueue {
    tx: mpsc::UnboundedSender<MassEditJob>,
    updates: mpsc::Sender<JobUpdate>,
}

impl ChannelQueue {
    pub fn new(tx: mpsc::UnboundedSender<MassEditJob>, updates: mpsc::Sender<JobUpdate>) -> Self {
        Self { tx, updates }
    }
}

impl TaskQueue for ChannelQueue {
    fn enqueue(&self, job: MassEditJob) {
        let job_id = job.job_id.clone();
        if let Err(e) = self.updates.try_send(JobUpdate {
            job_id: job_id.clone(),
            status: JobStatus::Pending,
        }) {
            warn!("Could not record job {} as pending: {}", job_id, e);
        }
        if self.tx.send(job).is_err() {
            error!("Mass edit worker is gone; job {} was dropped", job_id);
        }
    }
}

/// Everything the worker needs to repeat one edit across a selection.
pub struct Submission<'a> {
    pub batch: &'a IdentifierBatch,
    pub model: &'a ModelDescriptor,
    pub mass_changes_fields: &'a [String],
    pub template_object_id: &'a str,
    /// Sanitized request context.
    pub request: Value,
    pub snapshot: Value,
}

/// Enqueues exactly one job for `submission` and returns without waiting.
pub fn enqueue_mass_edit(queue: &dyn TaskQueue, submission: Submission<'_>) {
    let job = MassEditJob {
        job_id: Uuid::new_v4().to_string(),
        object_ids: submission.batch.joined(),
        app_name: submission.model.app_label.clone(),
        model_name: submission.model.model_name.clone(),
        mass_changes_fields: submission.mass_changes_fields.to_vec(),
        template_object_id: submission.template_object_id.to_string(),
        request: submission.request,
        snapshot: submission.snapshot,
    };
    info!(
        "Queued mass edit {} of {} on {} record(s), fields {:?}",
        job.job_id,
        submission.model.label(),
        submission.batch.len(),
        job.mass_changes_fields
    );
    queue.enqueue(job);
}
