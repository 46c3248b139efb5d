//! Conversation memory for gitsage.
//!
//! Sessions live in process memory and are lost on restart.

pub mod in_memory;

pub use in_memory::InMemorySessionStore;
