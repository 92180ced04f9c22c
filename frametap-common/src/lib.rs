//! Capture event record shared between the packet-path producers and the
//! userspace consumer.
//!
//! The layout is `#[repr(C)]` with fields ordered largest-alignment first so
//! the eBPF program and the host agree on the exact byte layout with no
//! internal padding.

#![cfg_attr(not(test), no_std)]

/// Slot capacity for the captured payload prefix, in bytes.
pub const SNAP_CAP: usize = 256;

/// Default truncation length applied by capture hooks.
pub const DEFAULT_SNAP_LEN: usize = 64;

/// Size in bytes of one encoded [`PacketEvent`].
pub const EVENT_SIZE: usize = core::mem::size_of::<PacketEvent>();

/// Metadata and truncated payload for one captured frame.
///
/// Produced once at capture time and never mutated afterwards; moves from
/// producer to consumer by copy.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PacketEvent {
    /// Monotonic capture time in nanoseconds.
    pub timestamp_ns: u64,
    /// Original frame length on the wire. May exceed `cap_len`.
    pub packet_len: u32,
    /// Number of payload bytes actually captured. Always <= `packet_len`
    /// and <= `SNAP_CAP`.
    pub cap_len: u32,
    /// Truncated prefix of the frame; only the first `cap_len` bytes are
    /// meaningful.
    pub payload: [u8; SNAP_CAP],
}

/// Errors surfaced by the defensive decode path.
///
/// These should not occur when producer and consumer were built from the
/// same layout, but the consumer treats the boundary as untrusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The byte buffer is smaller than one encoded event.
    Truncated { len: usize },
    /// `cap_len` exceeds the slot capacity or the claimed wire length.
    CapLenRange { cap_len: u32, packet_len: u32 },
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CodecError::Truncated { len } => {
                write!(f, "event buffer too short: {} bytes, need {}", len, EVENT_SIZE)
            }
            CodecError::CapLenRange { cap_len, packet_len } => {
                write!(
                    f,
                    "cap_len {} out of range (packet_len {}, slot capacity {})",
                    cap_len, packet_len, SNAP_CAP
                )
            }
        }
    }
}

impl PacketEvent {
    /// An all-zero event, used to initialize slot storage.
    pub const fn empty() -> Self {
        Self {
            timestamp_ns: 0,
            packet_len: 0,
            cap_len: 0,
            payload: [0u8; SNAP_CAP],
        }
    }

    /// Builds an event from a received frame, copying at most `snap_len`
    /// bytes of payload. `wire_len` is the original on-wire length and may
    /// exceed `frame.len()` when the caller's buffer already truncated.
    pub fn capture(timestamp_ns: u64, frame: &[u8], wire_len: u32, snap_len: usize) -> Self {
        let mut event = Self::empty();
        event.timestamp_ns = timestamp_ns;
        event.packet_len = wire_len;

        let take = frame.len().min(wire_len as usize).min(snap_len).min(SNAP_CAP);
        event.payload[..take].copy_from_slice(&frame[..take]);
        event.cap_len = take as u32;
        event
    }

    /// The captured payload prefix.
    pub fn payload(&self) -> &[u8] {
        let len = (self.cap_len as usize).min(SNAP_CAP);
        &self.payload[..len]
    }

    /// Checks the record invariants. Used by the consumer before handing an
    /// event to a sink.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.cap_len as usize > SNAP_CAP || self.cap_len > self.packet_len {
            return Err(CodecError::CapLenRange {
                cap_len: self.cap_len,
                packet_len: self.packet_len,
            });
        }
        Ok(())
    }

    /// Raw bytes of the encoded event.
    ///
    /// The layout has no internal padding, so every byte is initialized.
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self as *const Self as *const u8, EVENT_SIZE) }
    }

    /// Decodes an event from raw bytes, e.g. a kernel ring buffer record.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < EVENT_SIZE {
            return Err(CodecError::Truncated { len: data.len() });
        }
        let event = unsafe { (data.as_ptr() as *const Self).read_unaligned() };
        event.validate()?;
        Ok(event)
    }
}

impl Default for PacketEvent {
    fn default() -> Self {
        Self::empty()
    }
}

impl core::fmt::Debug for PacketEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PacketEvent")
            .field("timestamp_ns", &self.timestamp_ns)
            .field("packet_len", &self.packet_len)
            .field("cap_len", &self.cap_len)
            .finish_non_exhaustive()
    }
}
