//! Start-up configuration, read once from the environment in `main.rs`.
//!
//! Every setting has a default so the server runs with no environment at all.
//! Values that are present but malformed are a start-up error rather than a
//! silent fallback.

use crate::error::MassEditError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Name of the cookie that carries the session key.
pub const SESSION_COOKIE: &str = "massadmin_session";

/// Which mass apply implementation the worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStrategy {
    /// Copy the saved template record's values with one bulk UPDATE.
    TemplateRecord,
    /// Re-bind the submitted form against every record and save them one by one.
    RequestReplay,
}

impl FromStr for WorkerStrategy {
    type Err = MassEditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "template" => Ok(WorkerStrategy::TemplateRecord),
            "replay" => Ok(WorkerStrategy::RequestReplay),
            other => Err(MassEditError::Config(format!(
                "unknown worker strategy '{}' (expected 'template' or 'replay')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite file holding the edited tables, users and sessions.
    pub database: PathBuf,
    /// JSON file describing the models that can be mass edited.
    pub registry: PathBuf,
    /// Selections whose comma-joined form is longer than this go through the session.
    pub session_threshold: usize,
    pub session_ttl: Duration,
    /// URL prefix of the mass edit screens.
    pub mount: String,
    pub strategy: WorkerStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("massedit.sqlite"),
            registry: PathBuf::from("massadmin.json"),
            session_threshold: 500,
            session_ttl: Duration::from_secs(60 * 60 * 24 * 14),
            mount: "/admin/massadmin".to_string(),
            strategy: WorkerStrategy::TemplateRecord,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, MassEditError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MassEditError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("MASSEDIT_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("MASSEDIT_PORT") {
            config.port = parse_number("MASSEDIT_PORT", &port)?;
        }
        if let Some(database) = lookup("MASSEDIT_DATABASE") {
            config.database = PathBuf::from(database);
        }
        if let Some(registry) = lookup("MASSEDIT_REGISTRY") {
            config.registry = PathBuf::from(registry);
        }
        if let Some(threshold) = lookup("MASSEDIT_SESSION_THRESHOLD") {
            config.session_threshold = parse_number("MASSEDIT_SESSION_THRESHOLD", &threshold)?;
        }
        if let Some(ttl) = lookup("MASSEDIT_SESSION_TTL_SECS") {
            config.session_ttl =
                Duration::from_secs(parse_number("MASSEDIT_SESSION_TTL_SECS", &ttl)?);
        }
        if let Some(mount) = lookup("MASSEDIT_MOUNT") {
            config.mount = normalize_mount(&mount);
        }
        if let Some(strategy) = lookup("MASSEDIT_WORKER_STRATEGY") {
            config.strategy = strategy.parse()?;
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, MassEditError> {
    raw.trim()
        .parse()
        .map_err(|_| MassEditError::Config(format!("{} must be a number, got '{}'", key, raw)))
}

// "admin/mass/" -> "/admin/mass"
fn normalize_mount(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.session_threshold, 500);
        assert_eq!(config.mount, "/admin/massadmin");
        assert_eq!(config.strategy, WorkerStrategy::TemplateRecord);
    }

    #[test]
    fn overrides_are_read_and_mount_is_normalized() {
        let config = Config::from_lookup(lookup_from(&[
            ("MASSEDIT_PORT", "9000"),
            ("MASSEDIT_SESSION_THRESHOLD", "64"),
            ("MASSEDIT_MOUNT", "backoffice/mass/"),
            ("MASSEDIT_WORKER_STRATEGY", "Replay"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.session_threshold, 64);
        assert_eq!(config.mount, "/backoffice/mass");
        assert_eq!(config.strategy, WorkerStrategy::RequestReplay);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[("MASSEDIT_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, MassEditError::Config(_)));
    }
}
