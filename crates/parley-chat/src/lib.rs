//! Direct messaging between two users: canonical conversations, the
//! mutual-follow gated daily limit, read state and per-side soft deletes.

pub mod clock;
pub mod conversation;
pub mod error;
pub mod ports;
pub mod read;
pub mod send;
pub mod service;

#[cfg(test)]
mod testing;

pub use clock::{Clock, LocalClock};
pub use error::{ChatError, Result};
pub use ports::{FollowGraph, NotificationSink};
pub use send::MessageDraft;
pub use service::{ChatService, DEFAULT_DAILY_LIMIT, page_offset};
