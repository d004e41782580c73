use crate::model::LlmResponse;
use crate::prompt::EvalPrompt;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &EvalPrompt) -> anyhow::Result<LlmResponse>;
    fn provider_name(&self) -> &'static str;
}

pub mod anthropic;
pub mod openai;

#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 2000,
        }
    }
}

/// Builds a client from a `provider:model` identifier. Evaluators only ever
/// see the `LlmClient` capability, so backends swap without touching them.
pub fn for_model(
    model_id: &str,
    api_key: String,
    opts: ClientOptions,
) -> anyhow::Result<Arc<dyn LlmClient>> {
    match model_id.split_once(':') {
        Some(("openai", model)) => Ok(Arc::new(openai::OpenAIClient::new(
            model.to_string(),
            api_key,
            opts,
        ))),
        Some(("anthropic", model)) => Ok(Arc::new(anthropic::AnthropicClient::new(
            model.to_string(),
            api_key,
            opts,
        ))),
        Some((provider, _)) => anyhow::bail!("unknown model provider: {}", provider),
        // Bare model ids default to the OpenAI-compatible endpoint.
        None => Ok(Arc::new(openai::OpenAIClient::new(
            model_id.to_string(),
            api_key,
            opts,
        ))),
    }
}
