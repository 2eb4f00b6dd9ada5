//! Shared JSON-over-HTTP plumbing for provider clients

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ConstructionError, StepError};

/// HTTP client bound to one provider's API base URL
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    provider: &'static str,
    base_url: String,
    client: Client,
}

impl HttpClient {
    pub(crate) fn new(
        provider: &'static str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ConstructionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// POST request for `path` carrying `body` as JSON
    pub(crate) fn post<B: Serialize>(&self, path: &str, body: &B) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
    }

    /// Sends the request and deserializes a successful JSON response
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StepError> {
        let response = request
            .send()
            .await
            .map_err(|e| StepError::request(self.provider, e))?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StepError::api(self.provider, status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| StepError::response(self.provider, e.to_string()))
    }
}
