use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::application::todo_store::DeleteAllPolicy;
use crate::infrastructure::http_remote::DEFAULT_BASE_URL;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_LOG_FILE: &str = "todo-tui.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value `{value}`: {reason}")]
    Invalid { name: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub remote_base_url: String,
    pub remote_timeout: Option<Duration>,
    pub delete_all_policy: DeleteAllPolicy,
    pub bind_addr: SocketAddr,
    pub log_file: PathBuf,
}

impl Settings {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string());

        let remote_timeout = match lookup("REMOTE_TIMEOUT_SECS").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(Duration::from_secs(parse("REMOTE_TIMEOUT_SECS", &raw, |v| v.trim().parse::<u64>().map_err(|e| e.to_string()))?)),
            None => None,
        };
        let policy = var("DELETE_ALL_POLICY", "all-or-nothing");
        let bind_addr = var("BIND_ADDR", DEFAULT_BIND_ADDR);

        Ok(Self {
            database_url: var("DATABASE_URL", DEFAULT_DATABASE_URL),
            remote_base_url: var("REMOTE_BASE_URL", DEFAULT_BASE_URL),
            remote_timeout,
            delete_all_policy: parse("DELETE_ALL_POLICY", &policy, |v| v.parse())?,
            bind_addr: parse("BIND_ADDR", &bind_addr, |v| v.parse::<SocketAddr>().map_err(|e| e.to_string()))?,
            log_file: PathBuf::from(var("TODO_LOG_FILE", DEFAULT_LOG_FILE)),
        })
    }
}

fn parse<T>(name: &'static str, value: &str, f: impl FnOnce(&str) -> Result<T, String>) -> Result<T, ConfigError> {
    f(value).map_err(|reason| ConfigError::Invalid { name, value: value.to_string(), reason })
}
