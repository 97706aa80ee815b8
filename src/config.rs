//! Runtime configuration
//!
//! Defaults come from [`crate::constants`]. `MonitorConfig::from_env` layers
//! `EQMM_*` environment variables on top; values that fail to parse are
//! logged and ignored.

use crate::constants::{
    COMMAND_MARKER, DEFAULT_BASE_URL, DEFAULT_SERVER_NAME, ITEM_DELAY_MS, PASS_DELAY_SECS,
    REQUEST_TIMEOUT_SECS, TAIL_POLL_INTERVAL_MS,
};
use chrono::{FixedOffset, Offset, Utc};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "EQMM_BASE_URL";
pub const ENV_SERVER: &str = "EQMM_SERVER";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "EQMM_REQUEST_TIMEOUT_SECS";
pub const ENV_ITEM_DELAY_MS: &str = "EQMM_ITEM_DELAY_MS";
pub const ENV_PASS_DELAY_SECS: &str = "EQMM_PASS_DELAY_SECS";
pub const ENV_COMMAND_MARKER: &str = "EQMM_COMMAND_MARKER";
pub const ENV_SALES_UTC_OFFSET_SECS: &str = "EQMM_SALES_UTC_OFFSET_SECS";

/// Settings shared by the provider, the tracking loop and the log monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Auction service base URL, without trailing slash
    pub base_url: String,
    /// Server name sent with every request
    pub server_name: String,
    /// Upper bound for a single HTTP request
    pub request_timeout: Duration,
    /// Pause between items within one tracking pass
    pub item_delay: Duration,
    /// Pause after a full pass over the watch list
    pub pass_delay: Duration,
    /// Wait between tail attempts when the log has nothing new
    pub tail_poll_interval: Duration,
    /// Chat token that starts a price check
    pub command_marker: String,
    /// Offset of the naive timestamps in the sales log
    pub sales_utc_offset: FixedOffset,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            item_delay: Duration::from_millis(ITEM_DELAY_MS),
            pass_delay: Duration::from_secs(PASS_DELAY_SECS),
            tail_poll_interval: Duration::from_millis(TAIL_POLL_INTERVAL_MS),
            command_marker: COMMAND_MARKER.to_string(),
            sales_utc_offset: utc(),
        }
    }
}

impl MonitorConfig {
    /// Builds the configuration from defaults plus `EQMM_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from defaults plus values returned by `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup(ENV_BASE_URL)) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(server) = non_empty(lookup(ENV_SERVER)) {
            config.server_name = server;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_ITEM_DELAY_MS) {
            config.item_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_PASS_DELAY_SECS) {
            config.pass_delay = Duration::from_secs(secs);
        }
        if let Some(marker) = non_empty(lookup(ENV_COMMAND_MARKER)) {
            config.command_marker = marker;
        }
        if let Some(secs) = parse_var::<i32>(&lookup, ENV_SALES_UTC_OFFSET_SECS) {
            match FixedOffset::east_opt(secs) {
                Some(offset) => config.sales_utc_offset = offset,
                None => tracing::warn!(
                    key = ENV_SALES_UTC_OFFSET_SECS,
                    value = secs,
                    "UTC offset out of range, keeping default"
                ),
            }
        }

        config
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = non_empty(lookup(key))?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring invalid configuration value");
            None
        }
    }
}
