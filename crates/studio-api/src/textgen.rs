//! Text-generation collaborator: an external HTTP endpoint that turns a
//! rendered narrative prompt into free text. Failures here are always
//! recoverable; nothing in the generation or consistency core depends on it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug)]
pub enum TextGenError {
    Http(reqwest::Error),
    Status(u16),
    EmptyResponse,
}

impl fmt::Display for TextGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "text generation request failed: {err}"),
            Self::Status(status) => write!(f, "text generation endpoint returned status {status}"),
            Self::EmptyResponse => write!(f, "text generation endpoint returned an empty body"),
        }
    }
}

impl std::error::Error for TextGenError {}

impl From<reqwest::Error> for TextGenError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

pub trait TextGenerator {
    fn generate_text(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<GeneratedText, TextGenError>> + Send;
}

/// Wire shape of the endpoint response: either a `{title, content}` pair or
/// a bare `{text}` field.
#[derive(Debug, Deserialize)]
struct TextGenResponse {
    title: Option<String>,
    content: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: reqwest::Client,
    endpoint: String,
    /// Attempts per call; network errors and 5xx responses are retried,
    /// client errors are not.
    max_attempts: usize,
}

impl HttpTextGenerator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            max_attempts: 3,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    async fn call_once(&self, prompt: &str) -> Result<GeneratedText, TextGenError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TextGenError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if let Ok(decoded) = serde_json::from_str::<TextGenResponse>(&body) {
            let content = decoded.content.or(decoded.text).unwrap_or_default();
            if !content.trim().is_empty() {
                return Ok(GeneratedText {
                    title: decoded.title,
                    content,
                });
            }
        }
        if body.trim().is_empty() {
            return Err(TextGenError::EmptyResponse);
        }

        // Endpoints that answer with plain text instead of JSON.
        Ok(GeneratedText {
            title: None,
            content: body,
        })
    }

    fn is_retryable(error: &TextGenError) -> bool {
        match error {
            TextGenError::Http(_) => true,
            TextGenError::Status(status) => *status >= 500,
            TextGenError::EmptyResponse => false,
        }
    }
}

impl TextGenerator for HttpTextGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<GeneratedText, TextGenError> {
        let mut last_error = TextGenError::EmptyResponse;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
            }
            match self.call_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(error) if Self::is_retryable(&error) => last_error = error,
                Err(error) => return Err(error),
            }
        }

        Err(last_error)
    }
}
