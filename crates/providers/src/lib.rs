pub mod openrouter {
    pub mod client;
    pub mod config;

    pub use client::OpenRouterClient;
    pub use config::OpenRouterConfig;
}
pub mod unified;

mod sse;

use luke_core::llm::{ChatError, ChatOpts, ChatResult, ChatStream, Message, ModelClient};
use std::time::Duration;
use tracing::info;

pub use openrouter::{OpenRouterClient, OpenRouterConfig};
pub use unified::UnifiedClient;

/// Whichever backend the configuration points at.
#[derive(Clone)]
pub enum Backend {
    OpenRouter(OpenRouterClient),
    Unified(UnifiedClient),
}

impl Backend {
    /// Uses the unified endpoint when it is enabled and set, OpenRouter
    /// otherwise.
    pub fn select(
        cfg: OpenRouterConfig,
        unified_endpoint: Option<&str>,
    ) -> anyhow::Result<Self> {
        if let Some(endpoint) = unified_endpoint.filter(|e| !e.trim().is_empty()) {
            info!(target: "providers", "using unified endpoint {}", endpoint);
            let timeout = cfg.timeout.max(Duration::from_secs(1));
            return Ok(Backend::Unified(UnifiedClient::new(endpoint, cfg.api_key, timeout)?));
        }
        Ok(Backend::OpenRouter(OpenRouterClient::new(cfg)?))
    }
}

#[allow(async_fn_in_trait)]
impl ModelClient for Backend {
    fn streams(&self) -> bool {
        match self {
            Backend::OpenRouter(c) => c.streams(),
            Backend::Unified(c) => c.streams(),
        }
    }

    async fn send_chat(&self, msgs: &[Message], opts: &ChatOpts) -> Result<ChatResult, ChatError> {
        match self {
            Backend::OpenRouter(c) => c.send_chat(msgs, opts).await,
            Backend::Unified(c) => c.send_chat(msgs, opts).await,
        }
    }

    async fn stream_chat<'a>(
        &'a self,
        msgs: Vec<Message>,
        opts: ChatOpts,
    ) -> Result<ChatStream<'a>, ChatError> {
        match self {
            Backend::OpenRouter(c) => c.stream_chat(msgs, opts).await,
            Backend::Unified(c) => c.stream_chat(msgs, opts).await,
        }
    }
}
