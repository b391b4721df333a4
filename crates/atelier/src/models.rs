//! The objects passed around between agents, the coordinator and the
//! completion provider.
//!
//! Messages carry either plain text or structured tool traffic as an
//! explicit tagged variant, so nothing downstream has to sniff payload
//! shapes at dispatch time. The same `Message` type is used in the shared
//! transcript (where `speaker` attributes it to a chat participant) and on
//! the wire to the completion provider (where only `role` matters).
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
