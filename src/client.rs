use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::WireMessage;

/// Everything that can go wrong between sending a turn and reading a reply.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("request timed out")]
    Timeout,
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("{0}")]
    Malformed(&'static str),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("response channel closed before a reply arrived")]
    Interrupted,
}

impl ChatError {
    /// Timeouts get the in-conversation apology; every other failure raises
    /// the alert popup instead.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChatError::Timeout)
    }
}

fn from_transport(err: reqwest::Error) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::Transport(err)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [WireMessage],
    #[serde(rename = "sessionId")]
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Client for the persona chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends the full history plus session id and returns the reply text.
    pub async fn complete(
        &self,
        history: &[WireMessage],
        session_id: &str,
    ) -> Result<String, ChatError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            messages: history,
            session_id,
        };
        tracing::debug!(%url, turns = history.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(from_transport)?;
        let status = response.status();
        let body: Value = response.json().await.map_err(from_transport)?;
        decode_reply(status, body)
    }
}

/// Turns a raw response into the reply text or a structured error.
fn decode_reply(status: StatusCode, body: Value) -> Result<String, ChatError> {
    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(|err| {
                err.as_str().map(str::to_string).or_else(|| {
                    err.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
            })
            .unwrap_or_else(|| status.to_string());
        return Err(ChatError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let response: ChatResponse = serde_json::from_value(body)
        .map_err(|_| ChatError::Malformed("unexpected response shape"))?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or(ChatError::Malformed("response carried no choices"))
}
