//! Applies queued mass edits, outside of any request.
//!
//! Two strategies implement the same `apply_mass_edit` interface:
//!
//! - `TemplateRecordStrategy` (default): the capture form has already saved the
//!   template record, so the worker reads the selected fields from it and issues
//!   one `UPDATE ... WHERE pk IN (...)` over the rest of the batch.
//! - `RequestReplayStrategy`: re-binds the submitted form data against every
//!   record of the batch, validates each one and saves them one by one. Any
//!   invalid record rolls the whole batch back.
//!
//! Both run inside a single transaction, so a job either changes every target
//! row or none. Outcomes are logged and recorded in the job state; the user who
//! submitted the edit is not notified.

use crate::config::WorkerStrategy;
use crate::db;
use crate::error::MassEditError;
use crate::job_controller::state::JobUpdate;
use crate::massadmin::form::{self, FormErrors};
use crate::massadmin::records::{self, Record};
use crate::massadmin::registry::{FieldDescriptor, ModelAdmin, ModelDescriptor, ModelRegistry, QuerySet};
use crate::massadmin::request::MultiMap;
use common::jobs::JobStatus;
use common::model::batch::IdentifierBatch;
use common::model::mass_edit::MassEditJob;
use log::{error, info, warn};
use rusqlite::Connection;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub trait MassEditStrategy: Send + Sync {
    /// Applies `job` and returns the number of rows written.
    fn apply_mass_edit(
        &self,
        conn: &mut Connection,
        admin: &dyn ModelAdmin,
        job: &MassEditJob,
    ) -> Result<usize, MassEditError>;
}

pub fn strategy_for(kind: WorkerStrategy) -> Arc<dyn MassEditStrategy> {
    match kind {
        WorkerStrategy::TemplateRecord => Arc::new(TemplateRecordStrategy),
        WorkerStrategy::RequestReplay => Arc::new(RequestReplayStrategy),
    }
}

/// Resolves the job's field names against the model. Unknown names fail the
/// job before any row is touched; excluded fields are dropped.
fn checked_fields<'m>(
    admin: &'m dyn ModelAdmin,
    names: &[String],
) -> Result<Vec<&'m FieldDescriptor>, MassEditError> {
    let model = admin.model();
    let mut fields: Vec<&FieldDescriptor> = Vec::new();
    for name in names {
        let field = model.field(name).ok_or_else(|| MassEditError::UnknownField {
            model: model.label(),
            field: name.clone(),
        })?;
        if !form::is_mass_editable(model, field) {
            return Err(MassEditError::Validation(format!(
                "field '{}' of {} cannot be mass edited",
                name,
                model.label()
            )));
        }
        if admin.massadmin_exclude().contains(name) {
            warn!("Ignoring excluded field '{}' of {}", name, model.label());
            continue;
        }
        if !fields.iter().any(|seen| seen.name == field.name) {
            fields.push(field);
        }
    }
    Ok(fields)
}

pub struct TemplateRecordStrategy;

impl MassEditStrategy for TemplateRecordStrategy {
    fn apply_mass_edit(
        &self,
        conn: &mut Connection,
        admin: &dyn ModelAdmin,
        job: &MassEditJob,
    ) -> Result<usize, MassEditError> {
        let model = admin.model();
        let fields = checked_fields(admin, &job.mass_changes_fields)?;
        let targets = IdentifierBatch::parse(&job.object_ids).without(&job.template_object_id);

        let tx = conn.transaction()?;
        let template = records::fetch(&tx, &QuerySet::all(model), &job.template_object_id)?
            .ok_or_else(|| model.not_found(&job.template_object_id))?;

        let values: Record = fields
            .iter()
            .map(|field| {
                let value = template.get(&field.name).cloned().unwrap_or(Value::Null);
                (field.name.clone(), value)
            })
            .collect();

        let updated = records::bulk_update(&tx, model, &targets, &values)?;
        tx.commit()?;
        Ok(updated)
    }
}

pub struct RequestReplayStrategy;

impl MassEditStrategy for RequestReplayStrategy {
    fn apply_mass_edit(
        &self,
        conn: &mut Connection,
        admin: &dyn ModelAdmin,
        job: &MassEditJob,
    ) -> Result<usize, MassEditError> {
        let model = admin.model();
        let names: Vec<String> = checked_fields(admin, &job.mass_changes_fields)?
            .into_iter()
            .map(|field| field.name.clone())
            .collect();
        let post = MultiMap::from_json(job.request.get("POST").unwrap_or(&Value::Null));
        let batch = IdentifierBatch::parse(&job.object_ids);
        let first = batch.first().ok_or(MassEditError::EmptySelection)?;

        let tx = conn.transaction()?;
        let all = QuerySet::all(model);
        if records::fetch(&tx, &all, first)?.is_none() {
            return Err(model.not_found(first));
        }

        let mut objects_count = 0;
        let mut changed_count = 0;
        let mut errors = FormErrors::new();

        for pk in batch.ids() {
            if records::fetch(&tx, &all, pk)?.is_none() {
                continue;
            }
            objects_count += 1;

            let values = match form::bind(model, &post, &names) {
                Ok(values) => values,
                Err(field_errors) => {
                    merge_errors(&mut errors, field_errors);
                    continue;
                }
            };
            let clashes = unique_clashes(&tx, model, pk, &values)?;
            if !clashes.is_empty() {
                merge_errors(&mut errors, clashes);
                continue;
            }

            records::save_fields(&tx, model, pk, &values)?;
            changed_count += 1;
        }

        if changed_count != objects_count {
            error!("Mass edit {} rejected: {:?}", job.job_id, errors);
            // Dropping `tx` rolls back the records saved so far.
            return Err(MassEditError::Validation(format!(
                "{} of {} records failed validation ({})",
                objects_count - changed_count,
                objects_count,
                errors
                    .iter()
                    .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
                    .collect::<Vec<_>>()
                    .join("; ")
            )));
        }

        tx.commit()?;
        Ok(changed_count)
    }
}

fn merge_errors(into: &mut FormErrors, from: FormErrors) {
    for (field, messages) in from {
        let entry = into.entry(field).or_default();
        for message in messages {
            if !entry.contains(&message) {
                entry.push(message);
            }
        }
    }
}

/// Unique fields whose new value is already held by another row.
fn unique_clashes(
    conn: &Connection,
    model: &ModelDescriptor,
    pk: &str,
    values: &Record,
) -> Result<FormErrors, MassEditError> {
    let mut clashes = FormErrors::new();
    for (name, value) in values {
        let Some(field) = model.field(name) else {
            continue;
        };
        if !field.is_unique() || value.is_null() {
            continue;
        }
        if records::exists_other(conn, model, name, value, pk)? {
            clashes.entry(name.clone()).or_default().push(format!(
                "{} with this {} already exists.",
                model.verbose_name,
                field.label()
            ));
        }
    }
    Ok(clashes)
}

/// Runs jobs against the database and reports their state.
#[derive(Clone)]
pub struct Worker {
    registry: Arc<ModelRegistry>,
    database: PathBuf,
    strategy: Arc<dyn MassEditStrategy>,
    updates: mpsc::Sender<JobUpdate>,
}

impl Worker {
    pub fn new(
        registry: Arc<ModelRegistry>,
        database: PathBuf,
        strategy: WorkerStrategy,
        updates: mpsc::Sender<JobUpdate>,
    ) -> Self {
        Self {
            registry,
            database,
            strategy: strategy_for(strategy),
            updates,
        }
    }

    /// Blocking part of a job: open the database and apply the edit.
    pub fn execute(&self, job: &MassEditJob) -> Result<usize, MassEditError> {
        let admin = self.registry.admin_for(&job.app_name, &job.model_name)?;
        let mut conn = db::open(&self.database)?;
        self.strategy.apply_mass_edit(&mut conn, admin.as_ref(), job)
    }

    pub async fn run(&self, job: MassEditJob) {
        let job_id = job.job_id.clone();
        self.report(&job_id, JobStatus::InProgress).await;
        info!(
            "Mass edit {} started on {}.{} (requested by {})",
            job_id,
            job.app_name,
            job.model_name,
            job.requested_by().unwrap_or("unknown")
        );

        let worker = self.clone();
        let handle = tokio::task::spawn_blocking(move || worker.execute(&job));

        let status = match handle.await {
            Ok(Ok(updated)) => {
                info!("Mass edit {} updated {} record(s)", job_id, updated);
                JobStatus::Completed(format!("{} record(s) updated", updated))
            }
            Ok(Err(e)) => {
                error!("Mass edit {} failed: {}", job_id, e);
                JobStatus::Failed(e.to_string())
            }
            Err(e) => {
                error!("Mass edit {} panicked: {}", job_id, e);
                JobStatus::Failed(format!("Task join error: {}", e))
            }
        };
        self.report(&job_id, status).await;
    }

    async fn report(&self, job_id: &str, status: JobStatus) {
        let update = JobUpdate {
            job_id: job_id.to_string(),
            status,
        };
        if let Err(e) = self.updates.send(update).await {
            warn!("Could not record status {:?} of job {}: {}", e.0.status, job_id, e);
        }
    }
}

/// Consumes the queue, one spawned task per job. Jobs are not ordered
/// relative to each other.
pub async fn start_worker(worker: Worker, mut rx: mpsc::UnboundedReceiver<MassEditJob>) {
    while let Some(job) = rx.recv().await {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run(job).await });
    }
}
