//! # gitsage core
//!
//! Domain types, traits, and error definitions for the gitsage coding
//! assistant. This crate has **no framework dependencies**: it defines the
//! model that the provider, tool, memory, and agent crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping the chat backend via configuration
//! - Easy testing with scripted providers and stub tools
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod text;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{DEFAULT_SESSION_ID, Message, Role, Session, SessionId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use text::clean_truncate;
pub use tool::{Observation, Tool, ToolDefinition, ToolRegistry, ToolResult};
