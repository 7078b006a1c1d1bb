//! # Vantage Events
//!
//! This crate defines the typed real-time events flowing from the data
//! transports into the session engine.
//!
//! As a Layer 0 crate, it depends only on `core-types` and provides the
//! definitive language for all real-time state synchronization. Delivery is a
//! bounded channel: producers feel backpressure instead of the session
//! buffering without limit.

use tokio::sync::mpsc;

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{MarketUpdate, PortfolioUpdate, StreamEvent};

pub type EventSender = mpsc::Sender<StreamEvent>;
pub type EventReceiver = mpsc::Receiver<StreamEvent>;

/// Creates the bounded event channel with the configured capacity.
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}
