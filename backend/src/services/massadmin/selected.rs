use crate::app_state::AppState;
use crate::auth;
use crate::config::SESSION_COOKIE;
use crate::db;
use crate::error::MassEditError;
use crate::massadmin::encoder;
use crate::massadmin::session::SqliteSession;
use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use common::model::batch::IdentifierBatch;
use common::requests::MassChangeSelectedRequest;
use log::info;

/// The "Mass Edit" change list action.
///
/// Encodes the selection into the mass change URL and redirects there. A
/// browser without a session gets one, since long selections are stored in it.
pub(crate) async fn process(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
    payload: web::Json<MassChangeSelectedRequest>,
) -> Result<HttpResponse, MassEditError> {
    let (app_name, model_name) = path.into_inner();
    let payload = payload.into_inner();
    let admin = state.registry.admin_for(&app_name, &model_name)?;

    let conn = db::open(&state.config.database)?;
    let user = auth::remote_user(&conn, &req)?;
    auth::require_staff(user.as_ref())?;
    if !admin.has_change_permission(user.as_ref(), None) {
        return Err(MassEditError::PermissionDenied);
    }

    if let Some(key) = payload.pks.iter().find(|key| !key.is_batchable()) {
        return Err(MassEditError::InvalidIdentifier(key.to_string()));
    }
    let batch = IdentifierBatch::new(payload.pks.iter());
    let existing_key = super::session_key(&req);
    let session_key = existing_key.clone().unwrap_or_else(SqliteSession::new_key);
    let mut session = SqliteSession::load(&conn, &session_key, state.config.session_ttl)?;

    let url = encoder::get_mass_change_redirect_url(
        &state.config.mount,
        admin.model(),
        &batch,
        &mut session,
        state.config.session_threshold,
    )?;
    let url = encoder::add_preserved_filters(&url, payload.preserved_filters.as_deref());
    info!(
        "Mass edit of {} {} record(s) selected, redirecting to {}",
        batch.len(),
        admin.model().label(),
        url
    );

    let mut response = HttpResponse::Found();
    response.insert_header((header::LOCATION, url));
    if existing_key.is_none() {
        response.cookie(
            Cookie::build(SESSION_COOKIE, session_key)
                .path("/")
                .http_only(true)
                .finish(),
        );
    }
    Ok(response.finish())
}
