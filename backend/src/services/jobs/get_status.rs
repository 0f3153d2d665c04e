use crate::app_state::AppState;
use crate::auth;
use crate::db;
use crate::error::MassEditError;
use crate::job_controller::state::JobsState;
use actix_web::{web, HttpRequest, HttpResponse};

/// `GET /api/jobs/{job_id}`: latest worker-side status of a mass edit job.
/// Staff only; the job id appears in the server log when the job is queued.
pub(crate) async fn process(
    req: HttpRequest,
    job_id: web::Path<String>,
    app: web::Data<AppState>,
    state: web::Data<JobsState>,
) -> Result<HttpResponse, MassEditError> {
    let conn = db::open(&app.config.database)?;
    let user = auth::remote_user(&conn, &req)?;
    auth::require_staff(user.as_ref())?;

    let jobs = state.jobs.read().await;
    match jobs.get(job_id.as_str()) {
        Some(status) => Ok(HttpResponse::Ok().json(status)),
        None => Ok(HttpResponse::NotFound().body("Job ID not found")),
    }
}
