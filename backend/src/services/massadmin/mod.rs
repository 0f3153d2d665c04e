//! HTTP surface of the mass edit screens.
//!
//! - `POST {mount}/{app_name}/{model_name}/mass_change_selected`: the change list
//!   action. Takes the selected primary keys and answers `302 Found` pointing at
//!   the mass change form; long selections are parked in the session.
//! - `GET {mount}/{app_name}/{model_name}/{object_ids}/`: renders the form
//!   context for the first selected record.
//! - `POST {mount}/{app_name}/{model_name}/{object_ids}/`: validates the
//!   submitted fields, saves the first record, queues the mass edit and renders
//!   the form context again.
//!
//! `{object_ids}` is either `1,2,3` or a `session-<md5>` token.

mod change;
mod selected;

use crate::config::SESSION_COOKIE;
use actix_web::web::{get, post, scope};
use actix_web::{HttpRequest, Scope};

pub fn configure_routes(mount: &str) -> Scope {
    scope(mount)
        .route(
            "/{app_name}/{model_name}/mass_change_selected",
            post().to(selected::process),
        )
        .route("/{app_name}/{model_name}/{object_ids}/", get().to(change::process))
        .route("/{app_name}/{model_name}/{object_ids}/", post().to(change::process))
}

fn session_key(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|key| !key.is_empty())
}
