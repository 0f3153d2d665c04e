use crate::app_state::AppState;
use crate::auth;
use crate::db;
use crate::error::MassEditError;
use crate::massadmin::encoder;
use crate::massadmin::request::RequestContext;
use crate::massadmin::session::{MemorySession, SessionStore, SqliteSession};
use crate::massadmin::view;
use actix_web::{web, HttpRequest, HttpResponse};

/// The mass change form, for both display (GET) and submission (POST).
///
/// Responds with the form context as JSON; rendering it is up to the admin
/// front end.
pub(crate) async fn process(
    req: HttpRequest,
    path: web::Path<(String, String, String)>,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, MassEditError> {
    let (app_name, model_name, object_ids) = path.into_inner();
    let admin = state.registry.admin_for(&app_name, &model_name)?;

    let conn = db::open(&state.config.database)?;
    let user = auth::remote_user(&conn, &req)?;
    auth::require_staff(user.as_ref())?;

    let session: Box<dyn SessionStore + '_> = match super::session_key(&req) {
        Some(key) => Box::new(SqliteSession::load(&conn, &key, state.config.session_ttl)?),
        None => Box::new(MemorySession::default()),
    };
    let batch = encoder::resolve_token(&object_ids, &*session)
        .filter(|batch| !batch.is_empty())
        .ok_or_else(|| {
            MassEditError::NotFound(format!(
                "The selection {} is not available in this session",
                object_ids
            ))
        })?;

    let request = RequestContext::from_http(&req, &body, user);
    let context = view::async_mass_change_view(
        &conn,
        admin.as_ref(),
        state.queue.as_ref(),
        &request,
        &batch,
    )?;
    Ok(HttpResponse::Ok().json(context))
}
