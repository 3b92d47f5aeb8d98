//! Text generation backends.
//!
//! The chat model is consumed as a black box: a prompt goes in, sampled
//! text comes out. [`HttpGenerator`] talks to a text-generation-inference
//! style server (`GET /info`, `POST /generate`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;

use super::ChatError;

/// Sampling configuration sent with every generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub max_new_tokens: u32,
    /// Prompt token budget; longer prompts are truncated from the left.
    pub truncate: u32,
}

impl From<&ChatConfig> for SamplingParams {
    fn from(config: &ChatConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            repetition_penalty: config.repetition_penalty,
            max_new_tokens: config.max_new_tokens,
            truncate: config.truncate,
        }
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

/// A text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync + std::fmt::Debug {
    /// Continue `prompt`, returning only the newly generated text.
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ChatError>;
}

/// `GET /info` response (fields we use).
#[derive(Debug, Deserialize)]
struct InfoResponse {
    model_id: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateParameters<'a> {
    #[serde(flatten)]
    sampling: &'a SamplingParams,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generated_text: String,
}

/// Client for a text-generation-inference compatible server.
#[derive(Clone)]
pub struct HttpGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model_id: String,
}

impl std::fmt::Debug for HttpGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerator")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

impl HttpGenerator {
    /// Connect to the generation service and identify the loaded model.
    ///
    /// # Errors
    ///
    /// [`ChatError::ModelLoad`] if the service is unreachable, too slow to
    /// answer, or does not describe a model. Callers treat this as fatal at
    /// startup.
    pub async fn connect(config: &ChatConfig) -> Result<Self, ChatError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.generation_timeout_secs))
            .build()
            .map_err(|e| ChatError::ModelLoad(format!("http client: {e}")))?;

        let mut rb = http.get(format!("{base_url}/info"));
        if let Some(key) = &config.api_key {
            rb = rb.bearer_auth(key);
        }

        let info: InfoResponse = rb
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ChatError::ModelLoad(format!("{base_url}: {e}")))?
            .json()
            .await
            .map_err(|e| ChatError::ModelLoad(format!("{base_url}: unexpected /info response: {e}")))?;

        if info.model_id != config.model {
            tracing::warn!(
                expected = %config.model,
                loaded = %info.model_id,
                "Generation service runs a different model than configured"
            );
        }
        tracing::info!(
            name: "chat.model.loaded",
            base_url = %base_url,
            model = %info.model_id,
            "Chat model ready"
        );

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
            model_id: info.model_id,
        })
    }

    /// Model id reported by the service.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ChatError> {
        let body = GenerateRequest {
            inputs: prompt,
            parameters: GenerateParameters {
                sampling: params,
                do_sample: true,
                return_full_text: false,
            },
        };

        let mut rb = self
            .http
            .post(format!("{}/generate", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }

        let resp = rb
            .send()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChatError::Generation(format!("{status}: {detail}")));
        }

        let out: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        tracing::trace!(generated_chars = out.generated_text.len(), "Generation complete");
        Ok(out.generated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let params = SamplingParams::default();
        let body = GenerateRequest {
            inputs: "<|user|>\nhi</s>\n<|assistant|>\n",
            parameters: GenerateParameters {
                sampling: &params,
                do_sample: true,
                return_full_text: false,
            },
        };
        let v = serde_json::to_value(&body).unwrap();

        assert_eq!(v["inputs"], "<|user|>\nhi</s>\n<|assistant|>\n");
        let p = &v["parameters"];
        assert_eq!(p["max_new_tokens"], 100);
        assert_eq!(p["truncate"], 512);
        assert_eq!(p["do_sample"], true);
        assert_eq!(p["return_full_text"], false);
        assert!((p["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!((p["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
        assert!((p["repetition_penalty"].as_f64().unwrap() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_sampling_from_config() {
        let config = ChatConfig {
            temperature: 0.7,
            repetition_penalty: 1.1,
            ..ChatConfig::default()
        };
        let params = SamplingParams::from(&config);
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
        assert!((params.repetition_penalty - 1.1).abs() < f32::EPSILON);
        assert_eq!(params.max_new_tokens, 100);
    }
}
