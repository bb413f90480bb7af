//! Answer generation via an OpenAI-compatible chat completions API.
//!
//! A missing `OPENAI_API_KEY` does not fail startup: [`create_generator`]
//! returns `None` and `ask` reports the generator as unavailable.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use docqa_core::answer::Generator;

use crate::config::GeneratorConfig;
use crate::retry;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIGenerator {
    model: String,
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GeneratorConfig, api_key: String) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(OPENAI_API_URL);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let json = retry::post_json(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        let text = parse_chat_response(&json)?;
        debug!(model = %self.model, chars = text.len(), "generated answer");
        Ok(text)
    }
}

/// Extract `choices[0].message.content` from a chat completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}

/// Build the configured generator, or `None` when it is disabled or has no
/// credential.
pub fn create_generator(config: &GeneratorConfig) -> Result<Option<Arc<dyn Generator>>> {
    create_generator_with_key(config, std::env::var("OPENAI_API_KEY").ok())
}

fn create_generator_with_key(
    config: &GeneratorConfig,
    api_key: Option<String>,
) -> Result<Option<Arc<dyn Generator>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" => match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Ok(Some(Arc::new(OpenAIGenerator::new(config, key)?))),
            None => {
                warn!("OPENAI_API_KEY is not set; answer generation is unavailable");
                Ok(None)
            }
        },
        other => Err(anyhow!("Unknown generator provider: {}", other)),
    }
}
