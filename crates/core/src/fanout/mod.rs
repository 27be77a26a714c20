//! Real-time fanout of state changes
//!
//! Every mutation performed by the state machine or the presence manager is
//! published to all live subscribers of the owning tenant. Delivery is
//! best-effort and at-most-once per subscriber; disconnected subscribers
//! miss events and reconcile with a full list fetch on reconnect.
//!
//! # Architecture
//!
//! - **Events**: the `{resource, type, id, payload}` change envelope
//! - **Subscriber**: one live consumer with a per-connection ordered channel
//! - **Hub**: tenant-scoped subscriber registry and publish loop

pub mod events;
pub mod hub;
pub mod subscriber;

pub use events::{ChangeEvent, ChangeKind, Resource};
pub use hub::FanoutHub;
pub use subscriber::Subscriber;
