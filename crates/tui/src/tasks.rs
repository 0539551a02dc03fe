//! Background work. Every task reports back by posting exactly the events
//! the session expects and never touches session state directly.

use std::sync::mpsc::Sender;

use futures::StreamExt;
use luke_core::catalog::CatalogSource;
use luke_core::llm::{ChatDelta, ChatOpts, ModelClient};
use providers::{Backend, OpenRouterClient, OpenRouterConfig};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::app::stream::Usage;
use crate::app::{AppEvent, ChatRequest};

/// Network collaborators for the current credential.
#[derive(Clone)]
pub struct Services {
    backend: Backend,
    catalog: OpenRouterClient,
    unified_endpoint: Option<String>,
}

impl Services {
    pub fn build(credential: Option<String>, unified_endpoint: Option<String>) -> anyhow::Result<Self> {
        let cfg = OpenRouterConfig::resolve(credential);
        let catalog = OpenRouterClient::new(cfg.clone())?;
        let backend = Backend::select(cfg, unified_endpoint.as_deref())?;
        Ok(Self {
            backend,
            catalog,
            unified_endpoint,
        })
    }

    /// Rebuilds the clients around a new credential.
    pub fn rekey(&self, credential: String) -> anyhow::Result<Self> {
        Self::build(Some(credential), self.unified_endpoint.clone())
    }

    pub fn spawn_chat(&self, rt: &Handle, req: ChatRequest, tx: Sender<AppEvent>) {
        let backend = self.backend.clone();
        rt.spawn(async move {
            run_chat(&backend, req, &tx).await;
        });
    }

    pub fn spawn_catalog_fetch(&self, rt: &Handle, credential: Option<String>, tx: Sender<AppEvent>) {
        let client = self.catalog.clone();
        rt.spawn(async move {
            let result = client
                .fetch_models(credential.as_deref())
                .await
                .map_err(|e| e.to_string());
            if tx.send(AppEvent::CatalogFetched(result)).is_err() {
                debug!(target: "tui", "catalog result dropped: session gone");
            }
        });
    }
}

fn usage_of(prompt: Option<u32>, completion: Option<u32>) -> Option<Usage> {
    if prompt.is_none() && completion.is_none() {
        return None;
    }
    Some(Usage {
        prompt: prompt.unwrap_or(0),
        completion: completion.unwrap_or(0),
    })
}

/// Drives one request to its single terminal event. Partial events carry the
/// cumulative text.
pub async fn run_chat<C: ModelClient>(client: &C, req: ChatRequest, tx: &Sender<AppEvent>) {
    let id = req.id;
    let opts = ChatOpts::for_model(req.model);
    let post = |ev: AppEvent| {
        if tx.send(ev).is_err() {
            debug!(target: "tui", "request {} result dropped: session gone", id);
        }
    };

    if !client.streams() {
        match client.send_chat(&req.messages, &opts).await {
            Ok(res) => post(AppEvent::Completed {
                id,
                content: Some(res.text),
                usage: usage_of(res.prompt_tokens, res.completion_tokens),
            }),
            Err(e) => post(AppEvent::Failed { id, error: e.to_string() }),
        }
        return;
    }

    let mut stream = match client.stream_chat(req.messages, opts).await {
        Ok(s) => s,
        Err(e) => {
            post(AppEvent::Failed { id, error: e.to_string() });
            return;
        }
    };
    info!(target: "tui", "request {} streaming", id);
    let mut text = String::new();
    let mut usage = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(ChatDelta::Text(piece)) => {
                if piece.is_empty() {
                    continue;
                }
                text.push_str(&piece);
                post(AppEvent::Partial { id, content: text.clone() });
            }
            Ok(ChatDelta::Usage { prompt_tokens, completion_tokens }) => {
                usage = usage_of(prompt_tokens, completion_tokens);
            }
            Ok(ChatDelta::Finish(reason)) => {
                debug!(target: "tui", "request {} finish reason {:?}", id, reason);
            }
            Err(e) => {
                warn!(target: "tui", "request {} stream error: {}", id, e);
                post(AppEvent::Failed { id, error: e.to_string() });
                return;
            }
        }
    }
    post(AppEvent::Completed { id, content: None, usage });
}
