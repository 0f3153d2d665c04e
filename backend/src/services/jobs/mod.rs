mod get_status;

use actix_web::web;

const API_PATH: &str = "/api/jobs";

/// Configures and returns the Actix `Scope` for job telemetry routes.
pub fn configure_routes() -> actix_web::Scope {
    web::scope(API_PATH).route("/{job_id}", web::get().to(get_status::process))
}
