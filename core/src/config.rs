//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::session::{FileTokenStore, Session};
use crate::transport::UreqTransport;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub login_path: String,
    /// Persist tokens in this JSON file; memory only when unset.
    pub token_file: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            token_file: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_url: lookup("CLINIC_API_URL").unwrap_or(defaults.api_url),
            login_path: lookup("CLINIC_LOGIN_PATH").unwrap_or(defaults.login_path),
            token_file: lookup("CLINIC_TOKEN_FILE")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            timeout: lookup("CLINIC_TIMEOUT_SECS")
                .and_then(|secs| secs.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Session backed by the configured token file, or by memory.
    pub fn session(&self) -> Session {
        match &self.token_file {
            Some(path) => Session::new(FileTokenStore::open(path)),
            None => Session::in_memory(),
        }
    }

    pub fn transport(&self) -> UreqTransport {
        UreqTransport::new(Some(self.timeout))
    }
}
