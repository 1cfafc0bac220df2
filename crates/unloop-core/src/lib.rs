//! Business logic and store trait definitions for Unloop.
//!
//! This crate defines the "ports" (the `GenerativeClient` and
//! `SessionStore` traits) that the infrastructure layer implements, plus
//! the logic that runs on top of them: the retrying request executor, the
//! AI gateway, the session flow state machine, and the mentor catalog.
//! It depends only on `unloop-types` -- never on `unloop-infra` or any
//! HTTP/IO crate.

pub mod catalog;
pub mod client;
pub mod flow;
pub mod gateway;
pub mod retry;
pub mod store;
