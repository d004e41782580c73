use super::{ClientOptions, LlmClient};
use crate::model::{LlmResponse, Usage};
use crate::prompt::EvalPrompt;
use async_trait::async_trait;
use serde_json::json;

pub struct AnthropicClient {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(model: String, api_key: String, opts: ClientOptions) -> Self {
        Self {
            model,
            api_key,
            base_url: "https://api.anthropic.com/v1/messages".to_string(),
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &EvalPrompt) -> anyhow::Result<LlmResponse> {
        let body = json!({
            "model": self.model,
            "system": prompt.system,
            "messages": [
                { "role": "user", "content": prompt.user },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let started = std::time::Instant::now();
        let resp = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic messages API error: {}", error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        let text = json
            .pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Anthropic API response missing content"))?
            .to_string();

        let prompt_tokens = json
            .pointer("/usage/input_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let completion_tokens = json
            .pointer("/usage/output_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        Ok(LlmResponse {
            text,
            provider: "anthropic".to_string(),
            model: self.model.clone(),
            usage: Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}
