//! OpenAI chat completion and embedding clients

use async_trait::async_trait;
use catena_core::domain::params::{OpenAiEmbeddingParams, OpenAiParams};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::http::HttpClient;
use super::{Completion, EmbeddingModel, ModelProcessor};
use crate::error::{ConstructionError, StepError};

const PROVIDER: &str = "openai";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    n: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat completions (`/chat/completions`)
pub struct OpenAiChat {
    http: HttpClient,
    api_key: String,
    params: OpenAiParams,
}

impl OpenAiChat {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        params: OpenAiParams,
    ) -> Result<Self, ConstructionError> {
        let http = HttpClient::new(
            PROVIDER,
            base_url,
            Duration::from_secs(params.request_timeout),
        )?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            params,
        })
    }
}

#[async_trait]
impl ModelProcessor for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<Completion, StepError> {
        let body = ChatRequest {
            model: &self.params.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            n: self.params.n,
        };

        let request = self
            .http
            .post("/chat/completions", &body)
            .bearer_auth(&self.api_key);
        let response: ChatResponse = self.http.send(request).await?;

        // Only the first choice is surfaced when n > 1
        let result = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| StepError::response(PROVIDER, "no completion choices"))?;

        Ok(Completion { result })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI embeddings (`/embeddings`)
pub struct OpenAiEmbedding {
    http: HttpClient,
    api_key: String,
    params: OpenAiEmbeddingParams,
}

impl OpenAiEmbedding {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        params: OpenAiEmbeddingParams,
    ) -> Result<Self, ConstructionError> {
        let http = HttpClient::new(
            PROVIDER,
            base_url,
            Duration::from_secs(params.request_timeout),
        )?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            params,
        })
    }
}

#[async_trait]
impl EmbeddingModel for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StepError> {
        let body = EmbeddingRequest {
            model: &self.params.model,
            input: text,
        };

        let request = self.http.post("/embeddings", &body).bearer_auth(&self.api_key);
        let response: EmbeddingResponse = self.http.send(request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| StepError::response(PROVIDER, "no embedding returned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_shape() {
        let params = OpenAiParams::default();
        let body = ChatRequest {
            model: &params.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            n: params.n,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"][0], json!({"role": "user", "content": "hi"}));
        assert_eq!(value["max_tokens"], 256);
    }

    #[test]
    fn test_chat_response_parse() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Paris"}}]
        }))
        .unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("Paris")
        );
    }
}
