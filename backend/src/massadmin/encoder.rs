//! Turns a change list selection into the URL of the mass edit screen.
//!
//! Short selections travel in the URL as-is (`1,2,3`). Long ones are parked in
//! the session under `session-<md5>` and the URL carries only that key.

use crate::error::MassEditError;
use crate::massadmin::registry::ModelDescriptor;
use crate::massadmin::session::SessionStore;
use common::model::batch::IdentifierBatch;
use url::form_urlencoded;

pub const SESSION_TOKEN_PREFIX: &str = "session-";

/// The session key a joined selection is stored under. Same selection, same key.
pub fn session_key_for(object_ids: &str) -> String {
    format!(
        "{}{:x}",
        SESSION_TOKEN_PREFIX,
        md5::compute(object_ids.as_bytes())
    )
}

/// The token for `batch`: the joined ids, or a session key when they are longer
/// than `threshold`.
pub fn encode_token(
    batch: &IdentifierBatch,
    session: &mut dyn SessionStore,
    threshold: usize,
) -> Result<String, MassEditError> {
    if batch.is_empty() {
        return Err(MassEditError::EmptySelection);
    }
    let object_ids = batch.joined();
    if object_ids.len() <= threshold {
        return Ok(object_ids);
    }

    let key = session_key_for(&object_ids);
    session.set(&key, object_ids);
    session.save()?;
    Ok(key)
}

pub fn get_mass_change_redirect_url(
    mount: &str,
    model: &ModelDescriptor,
    batch: &IdentifierBatch,
    session: &mut dyn SessionStore,
    threshold: usize,
) -> Result<String, MassEditError> {
    let token = encode_token(batch, session, threshold)?;
    Ok(format!(
        "{}/{}/{}/{}/",
        mount, model.app_label, model.model_name, token
    ))
}

/// Carries the change list filters over so "back" lands on the same filtered list.
pub fn add_preserved_filters(url: &str, preserved_filters: Option<&str>) -> String {
    match preserved_filters.map(str::trim).filter(|f| !f.is_empty()) {
        Some(filters) => {
            let encoded: String = form_urlencoded::Serializer::new(String::new())
                .append_pair("_changelist_filters", filters)
                .finish();
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{}{}{}", url, separator, encoded)
        }
        None => url.to_string(),
    }
}

/// Resolves a URL token back into a selection. `None` when a session token is
/// not (or no longer) in the session.
pub fn resolve_token(token: &str, session: &dyn SessionStore) -> Option<IdentifierBatch> {
    if token.starts_with(SESSION_TOKEN_PREFIX) {
        session
            .get(token)
            .map(|object_ids| IdentifierBatch::parse(&object_ids))
    } else {
        Some(IdentifierBatch::parse(token))
    }
}
