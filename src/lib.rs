//! Frametap - packet capture pipeline
//!
//! Observes frames on a network interface, truncates them into fixed-size
//! capture events, and moves them through a lock-free SPSC ring channel to
//! a consumer thread that delivers them to a sink. The channel is lossy
//! under load: a full ring drops new events and counts them rather than
//! stalling the packet path.

pub mod capture;
pub mod config;
pub mod consumer;
pub mod error;
pub mod pipeline;
pub mod ring;
pub mod sink;
pub mod telemetry;

pub use error::{Error, Result};
