//! Packet sources feeding the capture hook.
//!
//! A source is the packet-receive context: it hands every inbound frame to
//! the hook and otherwise leaves the frame's fate alone. The in-process
//! backend is an AF_PACKET socket; the kernel-resident XDP rendition lives
//! in the `frametap-ebpf` workspace member and is attached out of process.

mod af_packet;
mod hook;

pub use af_packet::AfPacketSocket;
pub use hook::{monotonic_ns, CaptureHook, HookConfig, Verdict};

use crate::Result;
use std::future::Future;

/// Packet source trait.
///
/// `recv` fills `buf` with the next inbound frame and returns its length.
pub trait Capture: Send {
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize>> + Send;
}
