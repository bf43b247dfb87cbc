//! Realtime fan-out of pet events to connected co-owners.

pub mod hub;
pub mod messages;

pub use hub::{ConnectionManager, HubStats, Inbound, Outbound};
pub use messages::{ClientMessage, MessageType, ServerEvent};
