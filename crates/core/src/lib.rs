//! Handraise Core
//!
//! Coordinates the hand-off of live conversations from an automated agent to
//! a human operator:
//! - **State machine**: hand-off lifecycle (pending -> assigned -> resolved)
//!   with transition legality rules and idempotent creation
//! - **Presence**: operator sessions with expiring, rearmable timers
//! - **Fanout**: tenant-scoped real-time broadcast of every state change
//! - **Cache**: in-memory thread-to-handoff index for O(1) message routing
//!
//! The durable store and the messaging pipeline are external collaborators,
//! consumed through the traits in [`store`] and [`messaging`].

pub mod cache;
pub mod config;
pub mod fanout;
pub mod messaging;
pub mod presence;
pub mod state_machine;
pub mod store;

pub use cache::ActiveHandoffCache;
pub use config::{Config, ConfigError};
pub use fanout::{ChangeEvent, ChangeKind, FanoutHub, Resource, Subscriber};
pub use messaging::{ConversationEvent, MessagingClient, NotifyPayload};
pub use presence::PresenceManager;
pub use state_machine::HandoffStateMachine;
pub use store::{HandoffPatch, HandoffStore};
