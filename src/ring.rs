//! Lock-free single-producer/single-consumer ring channel.
//!
//! Moves captured events from the packet-receive context to the consumer
//! without locks, heap allocation per event, or blocking on either side.
//! The channel is lossy under load: a publish into a full ring drops the
//! new event and counts it, it never overwrites unread slots and never
//! stalls the producer.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{Error, Result};

/// Outcome of a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The event was written into a slot and is visible to the consumer.
    Published,
    /// The channel was full; the event was discarded and counted.
    Dropped,
}

/// Storage and indices shared by the two halves.
///
/// Synchronization discipline: `write_index` is written only by the
/// producer, `read_index` only by the consumer. The release store on an
/// index paired with the acquire load on the other side makes the slot
/// contents visible before the index move is observed.
struct Shared<T> {
    slots: Box<[UnsafeCell<T>]>,
    mask: u64,
    capacity: u64,
    write_index: AtomicU64,
    read_index: AtomicU64,
    drops: Arc<AtomicU64>,
}

// Slot access is exclusive by construction: the producer touches only the
// slot at write_index, the consumer only the slot at read_index, and the
// index protocol keeps those disjoint.
unsafe impl<T: Copy + Send> Send for Shared<T> {}
unsafe impl<T: Copy + Send> Sync for Shared<T> {}

/// A fixed-capacity SPSC channel, created once per pipeline run.
pub struct RingChannel<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Copy + Default + Send> RingChannel<T> {
    /// Creates a channel with `capacity` slots.
    ///
    /// The capacity must be a nonzero power of two; anything else is
    /// refused rather than rounded.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(Error::InvalidCapacity { capacity });
        }

        let slots: Box<[UnsafeCell<T>]> =
            (0..capacity).map(|_| UnsafeCell::new(T::default())).collect();

        Ok(Self {
            shared: Arc::new(Shared {
                slots,
                mask: capacity as u64 - 1,
                capacity: capacity as u64,
                write_index: AtomicU64::new(0),
                read_index: AtomicU64::new(0),
                drops: Arc::new(AtomicU64::new(0)),
            }),
        })
    }

    /// A monitoring handle for the drop counter, readable at any time
    /// without blocking either side.
    pub fn drop_counter(&self) -> DropCounter {
        DropCounter(self.shared.drops.clone())
    }

    /// Splits the channel into its two halves.
    ///
    /// Neither half is cloneable; exclusive ownership of each half is the
    /// single-producer/single-consumer discipline.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let consumer = Consumer {
            shared: self.shared.clone(),
        };
        let producer = Producer {
            shared: self.shared,
        };
        (producer, consumer)
    }
}

/// Publishing half. Owned by exactly one execution context.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Copy + Send> Producer<T> {
    /// Attempts to publish an event. Bounded time, no allocation, never
    /// blocks; on a full channel the event is dropped and counted.
    pub fn try_publish(&mut self, event: T) -> Publish {
        let shared = &*self.shared;
        // write_index is owned by this half; no ordering needed to read it.
        let write = shared.write_index.load(Ordering::Relaxed);
        let read = shared.read_index.load(Ordering::Acquire);

        if write - read == shared.capacity {
            shared.drops.fetch_add(1, Ordering::Relaxed);
            return Publish::Dropped;
        }

        let slot = shared.slots[(write & shared.mask) as usize].get();
        // The slot at write_index is outside the readable window, so the
        // consumer cannot be touching it.
        unsafe { slot.write(event) };

        // Publish: slot contents happen-before the index becoming visible.
        shared.write_index.store(write + 1, Ordering::Release);
        Publish::Published
    }

    /// Total events dropped so far.
    pub fn drops(&self) -> u64 {
        self.shared.drops.load(Ordering::Relaxed)
    }

    /// Number of slots currently occupied, as seen from the producer.
    pub fn len(&self) -> u64 {
        let write = self.shared.write_index.load(Ordering::Relaxed);
        let read = self.shared.read_index.load(Ordering::Acquire);
        write - read
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> u64 {
        self.shared.capacity
    }
}

/// Consuming half. Owned by exactly one execution context.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Copy + Send> Consumer<T> {
    /// Copies out the oldest unread event, or returns `None` if the channel
    /// is empty. An empty poll does not move `read_index`.
    pub fn try_consume(&mut self) -> Option<T> {
        let shared = &*self.shared;
        let read = shared.read_index.load(Ordering::Relaxed);
        let write = shared.write_index.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        // The acquire load above makes the producer's slot write visible.
        let event = unsafe { *shared.slots[(read & shared.mask) as usize].get() };

        // Release the slot back to the producer.
        shared.read_index.store(read + 1, Ordering::Release);
        Some(event)
    }

    /// Total events dropped so far.
    pub fn drops(&self) -> u64 {
        self.shared.drops.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        let read = self.shared.read_index.load(Ordering::Relaxed);
        let write = self.shared.write_index.load(Ordering::Acquire);
        read == write
    }
}

/// Cloneable read/reset handle for the overflow drop counter.
#[derive(Clone)]
pub struct DropCounter(Arc<AtomicU64>);

impl DropCounter {
    /// Current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Reads and resets the counter.
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}
