//! OpenAI-compatible chat completion client (plain HTTP, no SDK)

use crate::config::AppConfig;
use crate::core::assistant::ChatMessage;
use crate::core::traits::{CompletionError, CompletionProvider};
use anyhow::Context;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OpenAiCompletionClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAiCompletionClient {
    pub fn new(
        api_key: &str,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<OpenAiCompletionClient> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("invalid API key format")?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, authorization);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("failed to create HTTP client")?;

        let base_url: String = base_url.into();

        Ok(OpenAiCompletionClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<OpenAiCompletionClient> {
        Self::new(
            &config.openai_api_key,
            config.openai_base_url.clone(),
            config.completion_timeout,
        )
    }
}

fn request_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout
    } else {
        CompletionError::Transport(e)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, CompletionError> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&CompletionRequest { model, messages })
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("completion API error ({status}): {body}");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout
            } else {
                CompletionError::Decode(e.to_string())
            }
        })?;

        debug!("completion returned {} choices", raw.choices.len());

        Ok(raw
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
