//! Who is asking, and may they change this model.
//!
//! Authentication itself happens in front of this service: the proxy puts the
//! authenticated username in `X-Remote-User`. Staff status and permissions are
//! looked up in the `users` / `user_permissions` tables.

use crate::error::MassEditError;
use actix_web::HttpRequest;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashSet;

pub const REMOTE_USER_HEADER: &str = "X-Remote-User";

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub username: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub permissions: HashSet<String>,
}

impl User {
    pub fn is_staff_member(&self) -> bool {
        self.is_active && self.is_staff
    }

    pub fn has_perm(&self, codename: &str) -> bool {
        self.is_active && (self.is_superuser || self.permissions.contains(codename))
    }
}

pub fn load_user(conn: &Connection, username: &str) -> Result<Option<User>, MassEditError> {
    let user = conn
        .query_row(
            "SELECT username, is_active, is_staff, is_superuser FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok(User {
                    username: row.get(0)?,
                    is_active: row.get::<_, i64>(1)? != 0,
                    is_staff: row.get::<_, i64>(2)? != 0,
                    is_superuser: row.get::<_, i64>(3)? != 0,
                    permissions: HashSet::new(),
                })
            },
        )
        .optional()?;

    let Some(mut user) = user else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT codename FROM user_permissions WHERE username = ?1")?;
    user.permissions = stmt
        .query_map(params![username], |row| row.get::<_, String>(0))?
        .collect::<Result<_, _>>()?;

    Ok(Some(user))
}

/// The user named by the proxy header, if any and if known.
pub fn remote_user(conn: &Connection, req: &HttpRequest) -> Result<Option<User>, MassEditError> {
    let username = req
        .headers()
        .get(REMOTE_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty());

    match username {
        Some(name) => load_user(conn, name),
        None => Ok(None),
    }
}

/// The admin screens are for active staff only.
pub fn require_staff(user: Option<&User>) -> Result<(), MassEditError> {
    if user.is_some_and(User::is_staff_member) {
        Ok(())
    } else {
        Err(MassEditError::PermissionDenied)
    }
}
