use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::{Value, json};

use super::{ModelError, ModelRequest, TextModel};
use crate::Settings;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone)]
pub struct OpenAiChatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for OpenAiChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatModel")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiChatModel {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            timeout: None,
        }
    }

    /// Per-request timeout. Unset by default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a client for `model` using the endpoint and credentials in `settings`.
    pub fn from_settings(settings: &Settings, model: &str) -> Self {
        let client = Self::new(model, settings.base_url.clone(), settings.api_key.clone());
        match settings.request_timeout_secs {
            Some(secs) => client.with_timeout(Duration::from_secs(secs)),
            None => client,
        }
    }
}

impl TextModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        Box::pin(async move {
            let api_key = self.api_key.as_deref().ok_or(ModelError::MissingApiKey)?;
            let url = format!("{}/chat/completions", self.base_url);
            let body = json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": request.instructions },
                    { "role": "user", "content": request.input },
                ],
            });

            let mut builder = self.client.post(&url).bearer_auth(api_key).json(&body);
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }

            let resp = builder.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ModelError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let data: Value = resp.json().await?;
            parse_chat_content(&data)
        })
    }
}

/// Pull the assistant text out of a chat completion payload.
///
/// Accepts both plain-string content and the list-of-parts form.
pub fn parse_chat_content(data: &Value) -> Result<String, ModelError> {
    let content = &data["choices"][0]["message"]["content"];
    if let Some(text) = content.as_str() {
        return Ok(text.to_string());
    }
    if let Some(parts) = content.as_array() {
        let text: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if !text.is_empty() {
            return Ok(text.join(""));
        }
    }
    if let Some(message) = data["error"]["message"].as_str() {
        return Err(ModelError::MalformedResponse(message.to_string()));
    }
    Err(ModelError::MalformedResponse(
        "missing choices[0].message.content".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_content() {
        let data = json!({
            "choices": [{ "message": { "role": "assistant", "content": "- major: wrong sign" } }]
        });
        assert_eq!(parse_chat_content(&data).unwrap(), "- major: wrong sign");
    }

    #[test]
    fn parses_content_parts() {
        let data = json!({
            "choices": [{ "message": { "content": [
                { "type": "text", "text": "part one, " },
                { "type": "text", "text": "part two" }
            ] } }]
        });
        assert_eq!(parse_chat_content(&data).unwrap(), "part one, part two");
    }

    #[test]
    fn missing_content_is_malformed() {
        let data = json!({ "choices": [] });
        assert!(matches!(
            parse_chat_content(&data),
            Err(ModelError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let model = OpenAiChatModel::new("gpt-5-mini", DEFAULT_BASE_URL, None);
        let request = ModelRequest::new("instructions", "input");
        assert!(matches!(
            model.complete(&request).await,
            Err(ModelError::MissingApiKey)
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed_and_key_redacted() {
        let model = OpenAiChatModel::new("m", "http://localhost:8080/v1/", Some("sk-1".into()));
        let debug = format!("{:?}", model);
        assert!(debug.contains("http://localhost:8080/v1\""));
        assert!(!debug.contains("sk-1"));
    }
}
