//! LLM provider implementations for gitsage.
//!
//! All providers implement the `gitsage_core::Provider` trait. The only
//! production backend is an OpenAI-compatible chat endpoint; GitHub Models
//! is the default.

pub mod openai_compat;
#[cfg(any(test, feature = "test-util"))]
pub mod test_helpers;

pub use openai_compat::OpenAiCompatProvider;
