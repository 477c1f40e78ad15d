//! Tally - shared wire types and counter logic

pub mod aura;
pub mod event;
pub mod format;
pub mod transport;

pub use event::{EventKind, PollBatch, PushEvent, ServiceType, UpdateEvent};
pub use transport::{Transport, TransportPolicy};
