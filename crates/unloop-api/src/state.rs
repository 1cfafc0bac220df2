//! Application state wiring the infrastructure together.
//!
//! Commands are generic over the client and store traits in unloop-core;
//! AppState pins them to the Gemini client and the JSON-file store.

use std::path::PathBuf;

use unloop_infra::config::{default_data_dir, load_config};
use unloop_infra::keys::KeyChain;
use unloop_infra::llm::GeminiClient;
use unloop_infra::store::JsonSessionStore;
use unloop_types::config::AppConfig;

/// Shared state for every CLI command.
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Resolve the data directory (`UNLOOP_DATA_DIR` overrides the
    /// default `~/.unloop`) and load the configuration.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = match std::env::var("UNLOOP_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_data_dir(),
        };
        tokio::fs::create_dir_all(&data_dir).await?;
        let config = load_config(&data_dir).await;

        Ok(Self { data_dir, config })
    }

    pub fn key_chain(&self) -> KeyChain {
        KeyChain::new(&self.data_dir)
    }

    pub fn gemini_client(&self) -> GeminiClient {
        GeminiClient::new(self.key_chain())
    }

    pub async fn open_store(&self) -> anyhow::Result<JsonSessionStore> {
        Ok(JsonSessionStore::open(&self.data_dir).await?)
    }
}
