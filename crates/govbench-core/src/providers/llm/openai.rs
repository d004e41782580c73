use super::{ClientOptions, LlmClient};
use crate::model::{LlmResponse, Usage};
use crate::prompt::EvalPrompt;
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAIClient {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(model: String, api_key: String, opts: ClientOptions) -> Self {
        Self {
            model,
            api_key,
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, prompt: &EvalPrompt) -> anyhow::Result<LlmResponse> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let started = std::time::Instant::now();
        let resp = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI chat API error: {}", error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("OpenAI API response missing content"))?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "openai".to_string(),
            model: self.model.clone(),
            usage: Usage {
                prompt_tokens: json
                    .pointer("/usage/prompt_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0),
                completion_tokens: json
                    .pointer("/usage/completion_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0),
                total_tokens: json
                    .pointer("/usage/total_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0),
            },
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
