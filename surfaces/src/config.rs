//! Configuration for surface hosts.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration a surface host loads at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend order-service base URL
    pub api_base_url: String,
    /// Realtime channel WebSocket URL
    pub ws_url: String,
    /// Per-request timeout for backend calls, in seconds
    pub request_timeout: u64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("TABLEFLOW_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api".to_string()),
            ws_url: env::var("TABLEFLOW_WS_URL")
                .unwrap_or_else(|_| "ws://localhost:8000/ws".to_string()),
            request_timeout: env::var("TABLEFLOW_REQUEST_TIMEOUT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(10),
            log_level: env::var("TABLEFLOW_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
