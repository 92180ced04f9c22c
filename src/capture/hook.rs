//! Per-frame capture hook.
//!
//! Runs synchronously in the packet-receive context, once per inbound
//! frame. The hot path is a timestamp read, a bounded payload copy, and a
//! single publish attempt: no allocation, no locks, no syscalls beyond the
//! clock read.

use frametap_common::PacketEvent;
use std::sync::Arc;

use crate::ring::{Producer, Publish};
use crate::telemetry::CaptureMetrics;

/// Forwarding verdict returned to the packet path.
///
/// Capture is observe-only: the hook always returns `Pass`, whether or not
/// the event fit into the channel. `Drop` exists for hooks that filter,
/// which this one never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Drop,
}

/// Capture hook settings fixed for one attachment.
#[derive(Debug, Clone)]
pub struct HookConfig {
    /// Maximum payload bytes copied per frame.
    pub snap_len: usize,
    /// Percentage of frames to capture, 0-100.
    pub sample_rate: u32,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            snap_len: frametap_common::DEFAULT_SNAP_LEN,
            sample_rate: 100,
        }
    }
}

/// The per-frame observer: builds an event and publishes it best-effort.
pub struct CaptureHook {
    producer: Producer<PacketEvent>,
    snap_len: usize,
    sample_rate: u32,
    // Sampling credit in percent; a frame is captured when the accumulated
    // credit crosses 100.
    credit: u32,
    metrics: Arc<CaptureMetrics>,
}

impl CaptureHook {
    pub fn new(
        producer: Producer<PacketEvent>,
        config: HookConfig,
        metrics: Arc<CaptureMetrics>,
    ) -> Self {
        Self {
            producer,
            snap_len: config.snap_len,
            sample_rate: config.sample_rate.min(100),
            credit: 0,
            metrics,
        }
    }

    /// Observes one frame. `frame` is valid only for the duration of the
    /// call; `wire_len` is the original on-wire length, which may exceed
    /// `frame.len()` if the receive buffer already truncated.
    ///
    /// A full channel is not an error here: the event is dropped, counted,
    /// and the frame continues on its way.
    pub fn on_frame(&mut self, frame: &[u8], wire_len: usize) -> Verdict {
        self.metrics.frames_seen.inc();
        self.metrics.bytes_seen.add(wire_len as u64);

        self.credit += self.sample_rate;
        if self.credit < 100 {
            self.metrics.sampled_out.inc();
            return Verdict::Pass;
        }
        self.credit -= 100;

        let event = PacketEvent::capture(
            monotonic_ns(),
            frame,
            wire_len.min(u32::MAX as usize) as u32,
            self.snap_len,
        );

        match self.producer.try_publish(event) {
            Publish::Published => self.metrics.published.inc(),
            Publish::Dropped => self.metrics.publish_drops.inc(),
        }

        Verdict::Pass
    }
}

/// Monotonic nanosecond clock, the userspace analog of the kernel's
/// ktime timestamps.
pub fn monotonic_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
}
