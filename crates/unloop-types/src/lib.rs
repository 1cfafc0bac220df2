//! Shared domain types for Unloop.
//!
//! This crate contains the core domain types used across the Unloop
//! application: conversation turns, life snapshots, mentors, session
//! records, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror,
//! and schemars (for the structured-output schema of the life snapshot).

pub mod config;
pub mod error;
pub mod llm;
pub mod mentor;
pub mod session;
pub mod snapshot;
pub mod turn;
