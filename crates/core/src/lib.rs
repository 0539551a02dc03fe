//! Contracts shared by the chat session and the collaborators it drives.
//!
//! Nothing in here performs IO. `providers` implements these traits against
//! real backends; the `luke` binary consumes them.

pub mod llm {
    use futures::Stream;
    use serde::{Deserialize, Serialize};
    use std::pin::Pin;
    use thiserror::Error;

    #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        User,
        Assistant,
        System,
    }

    impl Role {
        pub fn as_str(&self) -> &'static str {
            match self {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            }
        }
    }

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub struct Message {
        pub role: Role,
        pub content: String,
    }

    impl Message {
        pub fn user<S: Into<String>>(s: S) -> Self {
            Self { role: Role::User, content: s.into() }
        }
        pub fn assistant<S: Into<String>>(s: S) -> Self {
            Self { role: Role::Assistant, content: s.into() }
        }
        pub fn system<S: Into<String>>(s: S) -> Self {
            Self { role: Role::System, content: s.into() }
        }
    }

    #[derive(Clone, Debug)]
    pub struct ChatOpts {
        pub model: String,
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
    }

    impl ChatOpts {
        pub fn for_model<S: Into<String>>(model: S) -> Self {
            Self { model: model.into(), temperature: None, max_tokens: None }
        }
    }

    /// One increment of a streamed reply. `Text` carries only the new piece.
    #[derive(Clone, Debug, PartialEq)]
    pub enum ChatDelta {
        Text(String),
        Finish(Option<String>),
        Usage { prompt_tokens: Option<u32>, completion_tokens: Option<u32> },
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct ChatResult {
        pub text: String,
        pub finish_reason: Option<String>,
        pub prompt_tokens: Option<u32>,
        pub completion_tokens: Option<u32>,
    }

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum ChatError {
        #[error("auth error: {0}")] Auth(String),
        #[error("rate limit: {0}")] RateLimit(String),
        #[error("timeout: {0}")] Timeout(String),
        #[error("network: {0}")] Network(String),
        #[error("decode: {0}")] Decode(String),
        #[error("protocol: {0}")] Protocol(String),
        #[error("canceled")] Canceled,
        #[error("other: {0}")] Other(String),
    }

    pub type ChatStream<'a> = Pin<Box<dyn Stream<Item = Result<ChatDelta, ChatError>> + Send + 'a>>;

    #[allow(async_fn_in_trait)]
    pub trait ModelClient: Send + Sync {
        /// Whether `stream_chat` yields incremental text. Clients that answer
        /// in one piece are driven through `send_chat` instead.
        fn streams(&self) -> bool {
            true
        }

        async fn send_chat(&self, msgs: &[Message], opts: &ChatOpts) -> Result<ChatResult, ChatError>;

        async fn stream_chat<'a>(
            &'a self,
            msgs: Vec<Message>,
            opts: ChatOpts,
        ) -> Result<ChatStream<'a>, ChatError>;
    }
}

pub mod catalog {
    use crate::llm::ChatError;

    #[allow(async_fn_in_trait)]
    pub trait CatalogSource: Send + Sync {
        /// Ordered model ids (`provider/name`). An empty list is a valid
        /// answer; callers decide whether to keep their previous catalog.
        async fn fetch_models(&self, credential: Option<&str>) -> Result<Vec<String>, ChatError>;
    }
}

pub mod config {
    use std::error::Error as StdError;

    /// String key/value storage for credentials and endpoints.
    pub trait ConfigStore {
        type Error: StdError + Send + Sync + 'static;

        fn get(&self, key: &str) -> Option<String>;
        fn set(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;
    }

    pub const KEY_OPENROUTER_API_KEY: &str = "openrouter_api_key";
    pub const KEY_API_ENDPOINT: &str = "api_endpoint";
    pub const KEY_USE_UNIFIED_API: &str = "use_unified_api";
    pub const KEY_DEFAULT_MODEL: &str = "default_model";
}
