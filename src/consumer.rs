//! Consumer loop draining the ring channel.
//!
//! Runs on its own OS thread, decoupled from the packet-receive context.
//! Idle polls back off with a bounded sleep; a one-shot shutdown flag is
//! observed at poll boundaries, after which a bounded drain flushes what
//! is left in the channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use frametap_common::PacketEvent;
use tracing::warn;

use crate::ring::Consumer;
use crate::sink::EventSink;
use crate::telemetry::CaptureMetrics;
use crate::Result;

/// Consumer loop tuning, fixed per run.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Sleep between empty polls.
    pub poll_interval: Duration,
    /// Maximum events drained after shutdown is signaled.
    pub drain_limit: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            drain_limit: 1024,
        }
    }
}

/// Drains the channel and hands events to the sink.
pub struct ConsumerLoop {
    rx: Consumer<PacketEvent>,
    sink: Box<dyn EventSink>,
    metrics: Arc<CaptureMetrics>,
    config: ConsumerConfig,
}

impl ConsumerLoop {
    pub fn new(
        rx: Consumer<PacketEvent>,
        sink: Box<dyn EventSink>,
        metrics: Arc<CaptureMetrics>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            rx,
            sink,
            metrics,
            config,
        }
    }

    /// Runs until `shutdown` is set, then drains up to `drain_limit`
    /// further events and returns.
    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        while !shutdown.load(Ordering::Relaxed) {
            match self.rx.try_consume() {
                Some(event) => self.deliver(&event),
                None => thread::sleep(self.config.poll_interval),
            }
        }

        for _ in 0..self.config.drain_limit {
            match self.rx.try_consume() {
                Some(event) => self.deliver(&event),
                None => break,
            }
        }
    }

    /// Moves the loop onto its own thread.
    pub fn spawn(self) -> Result<ConsumerHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let thread = thread::Builder::new()
            .name("frametap-consumer".to_string())
            .spawn(move || self.run(flag))
            .map_err(crate::Error::Io)?;

        Ok(ConsumerHandle { shutdown, thread })
    }

    fn deliver(&mut self, event: &PacketEvent) {
        // The producer side should never hand us a malformed record, but
        // the boundary is treated as untrusted.
        if let Err(e) = event.validate() {
            self.metrics.decode_errors.inc();
            warn!(error = %e, "skipping malformed capture event");
            return;
        }

        self.metrics.consumed.inc();

        if let Err(e) = self.sink.deliver(event) {
            self.metrics.sink_errors.inc();
            warn!(
                error = %e,
                timestamp_ns = event.timestamp_ns,
                "sink failed to deliver event"
            );
        }
    }
}

/// Handle to a spawned consumer loop.
pub struct ConsumerHandle {
    shutdown: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

impl ConsumerHandle {
    /// Signals shutdown and waits for the bounded drain to finish.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if self.thread.join().is_err() {
            warn!("consumer thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::{Producer, RingChannel};
    use crate::Error;
    use std::sync::Mutex;

    /// Records delivered packet lengths; fails on lengths in `poison`.
    struct CollectSink {
        seen: Arc<Mutex<Vec<u32>>>,
        poison: Vec<u32>,
    }

    impl EventSink for CollectSink {
        fn deliver(&mut self, event: &PacketEvent) -> crate::Result<()> {
            if self.poison.contains(&event.packet_len) {
                return Err(Error::Sink("poisoned event".to_string()));
            }
            self.seen.lock().unwrap().push(event.packet_len);
            Ok(())
        }
    }

    fn pipeline(
        capacity: usize,
        config: ConsumerConfig,
        poison: Vec<u32>,
    ) -> (
        Producer<PacketEvent>,
        ConsumerLoop,
        Arc<Mutex<Vec<u32>>>,
        Arc<CaptureMetrics>,
    ) {
        let ring = RingChannel::with_capacity(capacity).unwrap();
        let (tx, rx) = ring.split();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let metrics = Arc::new(CaptureMetrics::new());
        let sink = CollectSink {
            seen: seen.clone(),
            poison,
        };
        let consumer = ConsumerLoop::new(rx, Box::new(sink), metrics.clone(), config);
        (tx, consumer, seen, metrics)
    }

    fn event_of_len(len: u32) -> PacketEvent {
        let frame = vec![0u8; len as usize];
        PacketEvent::capture(1, &frame, len, 64)
    }

    #[test]
    fn test_drain_delivers_in_order() {
        let (mut tx, consumer, seen, _) = pipeline(16, ConsumerConfig::default(), vec![]);

        for len in [10, 20, 30, 40] {
            tx.try_publish(event_of_len(len));
        }

        // Shutdown already set: run() goes straight to the bounded drain.
        consumer.run(Arc::new(AtomicBool::new(true)));

        assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_drain_limit_is_respected() {
        let config = ConsumerConfig {
            poll_interval: Duration::from_millis(1),
            drain_limit: 3,
        };
        let (mut tx, consumer, seen, _) = pipeline(16, config, vec![]);

        for len in 1..=8 {
            tx.try_publish(event_of_len(len));
        }

        consumer.run(Arc::new(AtomicBool::new(true)));

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_sink_error_does_not_stop_loop() {
        let (mut tx, consumer, seen, metrics) =
            pipeline(16, ConsumerConfig::default(), vec![20]);

        for len in [10, 20, 30] {
            tx.try_publish(event_of_len(len));
        }

        consumer.run(Arc::new(AtomicBool::new(true)));

        assert_eq!(*seen.lock().unwrap(), vec![10, 30]);
        assert_eq!(metrics.sink_errors.get(), 1);
        assert_eq!(metrics.consumed.get(), 3);
    }

    #[test]
    fn test_malformed_event_is_skipped() {
        let (mut tx, consumer, seen, metrics) = pipeline(16, ConsumerConfig::default(), vec![]);

        let mut bad = PacketEvent::empty();
        bad.packet_len = 4;
        bad.cap_len = 100; // violates cap_len <= packet_len

        tx.try_publish(event_of_len(10));
        tx.try_publish(bad);
        tx.try_publish(event_of_len(30));

        consumer.run(Arc::new(AtomicBool::new(true)));

        assert_eq!(*seen.lock().unwrap(), vec![10, 30]);
        assert_eq!(metrics.decode_errors.get(), 1);
        assert_eq!(metrics.consumed.get(), 2);
    }

    #[test]
    fn test_spawned_consumer_delivers_and_stops() {
        let config = ConsumerConfig {
            poll_interval: Duration::from_millis(1),
            drain_limit: 64,
        };
        let (mut tx, consumer, seen, _) = pipeline(16, config, vec![]);

        let handle = consumer.spawn().unwrap();

        for len in [10, 20, 30] {
            tx.try_publish(event_of_len(len));
        }

        // Wait for the background thread to drain the channel.
        for _ in 0..500 {
            if seen.lock().unwrap().len() == 3 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }

        handle.stop();
        assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30]);
    }
}
