//! Generative model backends.

pub mod gemini;

pub use gemini::GeminiClient;
