//! Core configuration

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use uuid::Uuid;

/// Default operator session timeout (5 minutes)
const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);

/// Default number of history entries attached to assignment notifications
const DEFAULT_RECENT_HISTORY_COUNT: usize = 10;

/// Default upper bound on comment body length
const DEFAULT_MAX_COMMENT_LENGTH: usize = 10_000;

/// Configuration consumed by the hand-off core
#[derive(Debug, Clone)]
pub struct Config {
    /// Operator session timeout applied when a tenant has no override
    pub session_timeout: Duration,
    /// Per-tenant session timeout overrides
    pub tenant_session_timeouts: HashMap<Uuid, Duration>,
    /// Conversation history entries carried by assignment notifications
    pub recent_history_count: usize,
    /// Maximum comment body length in bytes
    pub max_comment_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            tenant_session_timeouts: HashMap::new(),
            recent_history_count: DEFAULT_RECENT_HISTORY_COUNT,
            max_comment_length: DEFAULT_MAX_COMMENT_LENGTH,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            session_timeout: Duration::from_secs(parse_var(
                "HANDRAISE_SESSION_TIMEOUT_SECS",
                300u64,
            )?),
            tenant_session_timeouts: HashMap::new(),
            recent_history_count: parse_var(
                "HANDRAISE_RECENT_HISTORY_COUNT",
                DEFAULT_RECENT_HISTORY_COUNT,
            )?,
            max_comment_length: parse_var(
                "HANDRAISE_MAX_COMMENT_LENGTH",
                DEFAULT_MAX_COMMENT_LENGTH,
            )?,
        })
    }

    /// Override the session timeout for a single tenant
    pub fn with_tenant_timeout(mut self, tenant_id: Uuid, timeout: Duration) -> Self {
        self.tenant_session_timeouts.insert(tenant_id, timeout);
        self
    }

    /// Session timeout for a tenant, falling back to the default
    pub fn session_timeout_for(&self, tenant_id: Uuid) -> Duration {
        self.tenant_session_timeouts
            .get(&tenant_id)
            .copied()
            .unwrap_or(self.session_timeout)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    Invalid(&'static str),
}
