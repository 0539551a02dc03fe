//! Client for the web app's own `/api/llm` endpoint. It answers in one piece,
//! so it never streams.

use crate::sse::{map_reqwest_err, map_status_err};
use luke_core::llm::{ChatError, ChatOpts, ChatResult, ChatStream, Message, ModelClient};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Serialize)]
struct LlmRequest<'a> {
    prompt: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    model: &'a str,
    temperature: f32,
    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct LlmResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct UnifiedClient {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl UnifiedClient {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base = Url::parse(endpoint.trim())?;
        let endpoint = base.join("/api/llm")?;
        let http = Client::builder().use_rustls_tls().timeout(timeout).build()?;
        Ok(Self { http, endpoint, api_key })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The endpoint takes one prompt, so the history is flattened into
    /// `role: content` paragraphs.
    fn flatten(msgs: &[Message]) -> String {
        let mut prompt = String::new();
        for m in msgs {
            prompt.push_str(m.role.as_str());
            prompt.push_str(": ");
            prompt.push_str(&m.content);
            prompt.push_str("\n\n");
        }
        prompt
    }
}

#[allow(async_fn_in_trait)]
impl ModelClient for UnifiedClient {
    fn streams(&self) -> bool {
        false
    }

    async fn send_chat(&self, msgs: &[Message], opts: &ChatOpts) -> Result<ChatResult, ChatError> {
        info!(target: "providers::unified", "POST {} model={}", self.endpoint, opts.model);
        let body = LlmRequest {
            prompt: Self::flatten(msgs),
            model: &opts.model,
            temperature: opts.temperature.unwrap_or(0.7),
            max_tokens: opts.max_tokens,
        };
        let mut req = self.http.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(map_status_err(status, resp.text().await.ok()));
        }
        let parsed: LlmResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;
        into_result(parsed)
    }

    async fn stream_chat<'a>(
        &'a self,
        _msgs: Vec<Message>,
        _opts: ChatOpts,
    ) -> Result<ChatStream<'a>, ChatError> {
        Err(ChatError::Protocol("unified endpoint does not stream".into()))
    }
}

fn into_result(parsed: LlmResponse) -> Result<ChatResult, ChatError> {
    match parsed.error {
        Some(e) if !e.is_empty() => Err(ChatError::Protocol(e)),
        _ => Ok(ChatResult { text: parsed.content, ..ChatResult::default() }),
    }
}
