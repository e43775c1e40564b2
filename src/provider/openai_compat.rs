// src/provider/openai_compat.rs — Generic OpenAI-compatible provider
//
// Works against any endpoint exposing `/chat/completions` with bearer
// auth: OpenAI, Groq, DeepSeek, Together, OpenRouter, local gateways.

use async_trait::async_trait;

use super::{ChatProvider, ChatRequest, ChatResponse, TokenUsage};
use crate::infra::errors::ConvoGenError;

pub struct OpenAICompatProvider {
    id_str: String,
    name_str: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            id_str: "openai-compat".into(),
            name_str: "OpenAI-compatible".into(),
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn provider_err(&self, message: String, retriable: bool) -> ConvoGenError {
        ConvoGenError::Provider {
            provider: self.id_str.clone(),
            message,
            retriable,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAICompatProvider {
    fn id(&self) -> &str {
        &self.id_str
    }

    fn name(&self) -> &str {
        &self.name_str
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ConvoGenError> {
        let messages: Vec<serde_json::Value> = {
            let mut msgs = Vec::new();
            if let Some(system) = &request.system {
                msgs.push(serde_json::json!({"role": "system", "content": system}));
            }
            for m in &request.messages {
                msgs.push(serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                }));
            }
            msgs
        };

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(
                "User-Agent",
                format!("convogen/{}", env!("CARGO_PKG_VERSION")),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| self.provider_err(e.to_string(), e.is_timeout()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            let retriable = status.is_server_error() || status.as_u16() == 429;
            return Err(self.provider_err(
                format!("HTTP {status}: {error_body}"),
                retriable,
            ));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.provider_err(e.to_string(), false))?;

        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        if content.is_empty() {
            return Err(self.provider_err("empty completion".into(), false));
        }

        let usage = TokenUsage {
            input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(ChatResponse { content, usage })
    }
}
