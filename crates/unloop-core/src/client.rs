//! GenerativeClient trait definition.
//!
//! This is the seam between unloop-core and the concrete model backend.
//! Uses native async fn in traits (RPITIT, Rust 2024 edition). The Gemini
//! implementation lives in unloop-infra.

use unloop_types::llm::{GenerationRequest, GenerationResponse, LlmError};

/// Trait for generative model backends.
///
/// One method only: every gateway operation is a single-shot generation
/// with a fresh request. There is no streaming surface and no shared
/// per-client state between calls.
pub trait GenerativeClient: Send + Sync {
    /// Send a generation request and receive the full response.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<GenerationResponse, LlmError>> + Send;
}
