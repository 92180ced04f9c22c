//! Delivery targets for decoded capture events.

use std::io::Write;

use frametap_common::PacketEvent;
use tracing::info;

use crate::{Error, Result};

/// Receives one decoded event at a time from the consumer loop.
///
/// A failed delivery affects only that event; the consumer loop logs it
/// and moves on.
pub trait EventSink: Send {
    fn deliver(&mut self, event: &PacketEvent) -> Result<()>;
}

/// Emits each event as a structured log line.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn deliver(&mut self, event: &PacketEvent) -> Result<()> {
        info!(
            timestamp_ns = event.timestamp_ns,
            packet_len = event.packet_len,
            cap_len = event.cap_len,
            "packet captured"
        );
        Ok(())
    }
}

/// Writes a one-line hex dump of the captured prefix per event.
pub struct HexSink<W: Write + Send> {
    out: W,
}

impl HexSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write + Send> HexSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> EventSink for HexSink<W> {
    fn deliver(&mut self, event: &PacketEvent) -> Result<()> {
        let mut line = String::with_capacity(32 + event.payload().len() * 3);
        line.push_str(&format!(
            "{} len={} cap={}",
            event.timestamp_ns, event.packet_len, event.cap_len
        ));
        for byte in event.payload() {
            line.push_str(&format!(" {:02x}", byte));
        }
        writeln!(self.out, "{}", line).map_err(Error::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_sink_formats_payload() {
        let mut out = Vec::new();
        {
            let mut sink = HexSink::new(&mut out);
            let event = PacketEvent::capture(5, &[0xde, 0xad, 0xbe, 0xef], 4, 64);
            sink.deliver(&event).unwrap();
        }

        let line = String::from_utf8(out).unwrap();
        assert_eq!(line, "5 len=4 cap=4 de ad be ef\n");
    }

    #[test]
    fn test_log_sink_never_fails() {
        let mut sink = LogSink;
        let event = PacketEvent::capture(1, &[1, 2, 3], 3, 64);
        assert!(sink.deliver(&event).is_ok());
    }
}
