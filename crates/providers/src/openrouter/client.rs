use crate::openrouter::config::OpenRouterConfig;
use crate::sse::{drain_events, map_reqwest_err, map_status_err, parse_chat_sse_event};
use futures::{Stream, StreamExt};
use luke_core::catalog::CatalogSource;
use luke_core::llm::{ChatDelta, ChatError, ChatOpts, ChatResult, ChatStream, Message, ModelClient};
use reqwest::{header, Client};
use serde::Deserialize;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    cfg: OpenRouterConfig,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenRouterClient {
    pub fn new(cfg: OpenRouterConfig) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::HeaderName::from_static("http-referer"),
            header::HeaderValue::from_str(&cfg.referer)?,
        );
        headers.insert(
            header::HeaderName::from_static("x-title"),
            header::HeaderValue::from_str(&cfg.title)?,
        );
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .timeout(cfg.timeout);
        if let Some(p) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        let http = builder.build()?;
        Ok(Self { http, cfg })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder, credential: Option<&str>) -> reqwest::RequestBuilder {
        match credential.or(self.cfg.api_key.as_deref()) {
            Some(key) if !key.is_empty() => req.bearer_auth(key),
            _ => req,
        }
    }

    fn map_messages(msgs: &[Message]) -> Vec<serde_json::Value> {
        msgs.iter()
            .map(|m| serde_json::json!({"role": m.role.as_str(), "content": m.content}))
            .collect()
    }

    fn request_body(msgs: &[Message], opts: &ChatOpts, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": opts.model,
            "messages": Self::map_messages(msgs),
            "stream": stream,
        });
        if let Some(map) = body.as_object_mut() {
            if let Some(t) = opts.temperature {
                map.insert("temperature".into(), serde_json::json!(t));
            }
            if let Some(m) = opts.max_tokens {
                map.insert("max_tokens".into(), serde_json::json!(m));
            }
            if stream {
                map.insert("usage".into(), serde_json::json!({ "include": true }));
            }
        }
        body
    }
}

#[allow(async_fn_in_trait)]
impl ModelClient for OpenRouterClient {
    async fn send_chat(&self, msgs: &[Message], opts: &ChatOpts) -> Result<ChatResult, ChatError> {
        let url = self.url("chat/completions");
        let body = Self::request_body(msgs, opts, false);
        let resp = self
            .authorize(self.http.post(url), None)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(map_status_err(status, resp.text().await.ok()));
        }
        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;
        if let Some(msg) = v["error"]["message"].as_str() {
            return Err(ChatError::Protocol(msg.to_string()));
        }
        Ok(ChatResult {
            text: v["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or("")
                .to_string(),
            finish_reason: v["choices"][0]["finish_reason"].as_str().map(str::to_string),
            prompt_tokens: v["usage"]["prompt_tokens"].as_u64().map(|n| n as u32),
            completion_tokens: v["usage"]["completion_tokens"].as_u64().map(|n| n as u32),
        })
    }

    async fn stream_chat<'a>(
        &'a self,
        msgs: Vec<Message>,
        opts: ChatOpts,
    ) -> Result<ChatStream<'a>, ChatError> {
        let url = self.url("chat/completions");
        info!(target: "providers::openrouter", "start chat stream model={} url={}", opts.model, url);
        let body = Self::request_body(&msgs, &opts, true);
        let max_attempts = self.cfg.stream_max_retries.max(1);
        let idle = self.cfg.stream_idle_timeout;
        let send = || self.authorize(self.http.post(&url), None).json(&body).send();

        // Retries only cover failures before the first byte of the body; once
        // text has been yielded a failure ends the stream.
        let mut attempt = 0u32;
        let resp = loop {
            attempt += 1;
            let res = match send().await {
                Ok(resp) if resp.status().is_success() => Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.ok();
                    error!(target: "providers::openrouter", "chat stream non-200 status={} body={:?}", status, body);
                    Err(map_status_err(status, body))
                }
                Err(e) => Err(map_reqwest_err(e)),
            };
            match res {
                Ok(resp) => break resp,
                Err(e @ (ChatError::Network(_) | ChatError::Timeout(_))) if attempt < max_attempts => {
                    warn!(target: "providers::openrouter", "attempt {} failed: {}; retrying", attempt, e);
                    sleep(Duration::from_millis(300 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        };
        Ok(Box::pin(sse_deltas(resp.bytes_stream(), idle)))
    }
}

fn sse_deltas<S>(stream: S, idle: Duration) -> impl Stream<Item = Result<ChatDelta, ChatError>> + Send
where
    S: Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send,
{
    async_stream::stream! {
        let mut stream = Box::pin(stream);
        let mut buf = bytes::BytesMut::new();
        let mut last = Instant::now();
        'outer: loop {
            tokio::select! {
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(b)) => {
                            buf.extend_from_slice(&b);
                            last = Instant::now();
                            for ev in drain_events(&mut buf) {
                                match parse_chat_sse_event(&ev) {
                                    Ok(deltas) => {
                                        for d in deltas {
                                            let done = matches!(d, ChatDelta::Finish(None));
                                            yield Ok(d);
                                            if done { break 'outer; }
                                        }
                                    }
                                    Err(e) => { yield Err(e); break 'outer; }
                                }
                            }
                        }
                        Some(Err(e)) => { yield Err(map_reqwest_err(e)); break 'outer; }
                        None => { break 'outer; }
                    }
                }
                _ = sleep(Duration::from_millis(500)) => {
                    if last.elapsed() > idle {
                        yield Err(ChatError::Timeout("stream idle".into()));
                        break 'outer;
                    }
                }
            }
        }
    }
}

#[allow(async_fn_in_trait)]
impl CatalogSource for OpenRouterClient {
    async fn fetch_models(&self, credential: Option<&str>) -> Result<Vec<String>, ChatError> {
        let url = self.url("models");
        let resp = self
            .authorize(self.http.get(url), credential)
            .timeout(self.cfg.catalog_timeout)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(map_status_err(status, resp.text().await.ok()));
        }
        let parsed: ModelsResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;
        let ids = model_ids(parsed);
        debug!(target: "providers::openrouter", "fetched {} model ids", ids.len());
        Ok(ids)
    }
}

fn model_ids(parsed: ModelsResponse) -> Vec<String> {
    parsed
        .data
        .into_iter()
        .map(|m| m.id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}
