//! Session persistence backends.

mod json_store;

pub use json_store::JsonSessionStore;
