//! Anthropic messages client

use async_trait::async_trait;
use catena_core::domain::params::AnthropicParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::http::HttpClient;
use super::{Completion, ModelProcessor};
use crate::error::{ConstructionError, StepError};

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Anthropic messages API (`/messages`)
pub struct AnthropicChat {
    http: HttpClient,
    api_key: String,
    params: AnthropicParams,
}

impl AnthropicChat {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        params: AnthropicParams,
    ) -> Result<Self, ConstructionError> {
        Ok(Self {
            http: HttpClient::new(PROVIDER, base_url, REQUEST_TIMEOUT)?,
            api_key: api_key.into(),
            params,
        })
    }
}

#[async_trait]
impl ModelProcessor for AnthropicChat {
    async fn complete(&self, prompt: &str) -> Result<Completion, StepError> {
        let body = MessagesRequest {
            model: &self.params.model_name,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .http
            .post("/messages", &body)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION);
        let response: MessagesResponse = self.http.send(request).await?;

        let result: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        Ok(Completion { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_joins_text_blocks() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "world"}
            ]
        }))
        .unwrap();

        let joined: String = response
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text)
            .collect();
        assert_eq!(joined, "Hello, world");
    }
}
