//! Configuration types

use serde::Deserialize;
use std::time::Duration;

/// User-defined configuration (config.toml)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub capture: CaptureSection,
    #[serde(default)]
    pub channel: ChannelSection,
    #[serde(default)]
    pub log: LogSection,
}

/// `[capture]` section: what to observe and how much of it to keep.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSection {
    /// Interface to attach to.
    pub interface: String,
    /// Payload bytes retained per frame.
    #[serde(default = "default_snap_len")]
    pub snap_len: usize,
    /// Percentage of frames captured, 0-100.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

/// `[channel]` section: ring channel and consumer tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSection {
    /// Slot count; must be a nonzero power of two.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Consumer sleep between empty polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum events drained after shutdown.
    #[serde(default = "default_drain_limit")]
    pub drain_limit: usize,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            poll_interval_ms: default_poll_interval_ms(),
            drain_limit: default_drain_limit(),
        }
    }
}

impl ChannelSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_snap_len() -> usize {
    frametap_common::DEFAULT_SNAP_LEN
}

fn default_sample_rate() -> u32 {
    100
}

fn default_capacity() -> usize {
    4096
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_drain_limit() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
