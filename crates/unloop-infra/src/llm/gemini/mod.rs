//! Gemini backend for the [`GenerativeClient`] trait.
//!
//! [`GenerativeClient`]: unloop_core::client::GenerativeClient

mod client;
mod types;

pub use client::GeminiClient;
