pub mod bedrock_client;
pub mod openai_client;
pub mod stub;

use crate::{
    config::{Config, ModelProvider},
    error::Result,
    models::{FragmentStream, ModelRequest},
};
use async_trait::async_trait;
use std::sync::Arc;

pub use bedrock_client::BedrockVisionClient;
pub use openai_client::OpenAiVisionClient;
pub use stub::StubVisionClient;

/// A vision-capable model that answers one image prompt as a stream of text.
///
/// The returned stream is finite and can only be consumed once. An `Err` item
/// means the call failed mid-stream and nothing after it is delivered.
#[async_trait]
pub trait VisionModel: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn stream(&self, request: &ModelRequest) -> Result<FragmentStream>;
}

/// Builds the client for the configured provider.
pub async fn connect(config: &Config) -> Result<Arc<dyn VisionModel>> {
    let client: Arc<dyn VisionModel> = match config.provider {
        ModelProvider::OpenAi => Arc::new(OpenAiVisionClient::new(config.openai.clone())?),
        ModelProvider::Bedrock => Arc::new(BedrockVisionClient::new(config.bedrock.clone()).await?),
        ModelProvider::Stub => {
            log::warn!("⚠️  Using the stub model, every scan will report no matching dishes");
            Arc::new(StubVisionClient::no_match())
        }
    };
    log::info!("✅ {} vision client ready ({})", client.provider(), config.model());
    Ok(client)
}
