//! OpenAI-compatible chat-completions backend over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use insights_core::error::{InsightsError, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::summarizer::{ChatBackend, ChatMessage};

/// Characters of an error body kept in [`InsightsError::ModelRequest`].
const ERROR_BODY_EXCERPT: usize = 300;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

/// Client for `POST {api_base}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    project_id: Option<String>,
}

impl OpenAiBackend {
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        project_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InsightsError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: completions_url(api_base),
            api_key: api_key.into(),
            project_id,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String> {
        let request_err = |message: String| InsightsError::ModelRequest {
            model: model.to_string(),
            message,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model,
                messages,
                temperature,
            });
        if let Some(project) = &self.project_id {
            request = request.header("OpenAI-Project", project);
        }

        debug!(model, endpoint = %self.endpoint, "sending chat completion");
        let response = request.send().await.map_err(|e| request_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(request_err(format!(
                "HTTP {status}: {}",
                excerpt(&body, ERROR_BODY_EXCERPT)
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| request_err(format!("invalid response body: {e}")))?;

        extract_content(&body).ok_or_else(|| request_err("response has no message content".into()))
    }
}

/// `{api_base}/chat/completions`, tolerating a trailing slash.
fn completions_url(api_base: &str) -> String {
    format!("{}/chat/completions", api_base.trim_end_matches('/'))
}

/// Text of `choices[0].message.content`.
pub fn extract_content(body: &Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
