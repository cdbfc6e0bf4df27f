use crate::error::CompletionError;
use crate::prompt::Prompt;
use crate::traits::{AnswerStream, Completion};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::debug;

/// Streaming completion adapter for OpenAI-compatible `/chat/completions`
/// endpoints. Tokens are yielded as they arrive; dropping the stream aborts
/// the underlying request.
pub struct OpenAiCompletion {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompletion {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Completion for OpenAiCompletion {
    async fn stream(&self, prompt: &Prompt) -> Result<AnswerStream, CompletionError> {
        let body = json!({
            "model": self.model,
            "messages": prompt.messages,
            "stream": true,
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {api_key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let stream = async_stream::stream! {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes_stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(error) => {
                        yield Err(CompletionError::Stream(error.to_string()));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // SSE events are newline-delimited "data: {...}" lines,
                // terminated by "data: [DONE]"
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer = buffer[newline + 1..].to_string();

                    if line.is_empty() {
                        continue;
                    }
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        return;
                    }

                    match serde_json::from_str::<Value>(data) {
                        Ok(event) => {
                            let token = event
                                .pointer("/choices/0/delta/content")
                                .and_then(Value::as_str)
                                .unwrap_or_default();
                            if !token.is_empty() {
                                yield Ok(token.to_string());
                            }
                        }
                        Err(error) => {
                            debug!(%error, "unparseable stream event");
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
