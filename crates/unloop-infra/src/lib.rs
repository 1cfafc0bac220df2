//! Infrastructure implementations for Unloop.
//!
//! Implements the traits defined in unloop-core against the outside
//! world: the Gemini API, the JSON session file, the API key chain, and
//! the TOML configuration file.

pub mod config;
pub mod keys;
pub mod llm;
pub mod store;
