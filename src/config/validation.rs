//! Configuration validation

use frametap_common::SNAP_CAP;

use super::Config;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_capture(config, &mut result);
    validate_channel(config, &mut result);

    result
}

fn validate_capture(config: &Config, result: &mut ValidationResult) {
    let capture = &config.capture;

    if capture.interface.is_empty() {
        result.error("capture.interface: must not be empty");
    }

    if capture.snap_len == 0 {
        result.error("capture.snap_len: must be at least 1");
    } else if capture.snap_len > SNAP_CAP {
        result.error(format!(
            "capture.snap_len: {} exceeds the slot capacity of {}",
            capture.snap_len, SNAP_CAP
        ));
    }

    if capture.sample_rate > 100 {
        result.error(format!(
            "capture.sample_rate: {} is not a percentage (0-100)",
            capture.sample_rate
        ));
    } else if capture.sample_rate == 0 {
        result.warn("capture.sample_rate: 0 captures nothing");
    }
}

fn validate_channel(config: &Config, result: &mut ValidationResult) {
    let channel = &config.channel;

    // The ring constructor re-checks this; failing here surfaces it before
    // any socket is opened.
    if channel.capacity == 0 || !channel.capacity.is_power_of_two() {
        result.error(format!(
            "channel.capacity: {} is not a nonzero power of two",
            channel.capacity
        ));
    } else if channel.capacity < 16 {
        result.warn(format!(
            "channel.capacity: {} is very small, expect drops under load",
            channel.capacity
        ));
    }

    if channel.poll_interval_ms == 0 {
        result.warn("channel.poll_interval_ms: 0 busy-spins the consumer when idle");
    }

    if channel.drain_limit == 0 {
        result.warn("channel.drain_limit: 0 discards everything left at shutdown");
    }
}
