//! HTTP client for the remote chat service
//!
//! Two endpoints are used: `POST {base_url}/chat` for a single
//! question/answer exchange and `POST {base_url}/feedback` for thumbs
//! up/down ratings. Both authenticate with the `X-API-Key` header.

use crate::config::ApiConfig;
use crate::error::{ChatError, Result};
use crate::session::Source;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Fallback text when a non-2xx response carries no `error` field
pub const GENERIC_SERVER_ERROR: &str = "Server error";

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub use_search: bool,
}

/// Successful `POST /chat` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    /// Assistant text, lightweight markdown
    pub reply: String,
    /// Cited sources; absent or `null` means none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<Source>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Source>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Source>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /feedback`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackRequest {
    pub message_id: String,
    /// +1 or -1
    pub rating: i8,
    /// Most recent user message of the session, empty if none
    pub user_message: String,
    pub assistant_message: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Remote chat service
///
/// The conversation controller only talks to this trait, so tests can
/// substitute a scripted service for the HTTP client.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send one user message and wait for the single reply
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Network` if the request did not complete and
    /// `ChatError::Server` for non-2xx responses
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// Submit a rating; any 2xx response counts as success
    async fn feedback(&self, request: &FeedbackRequest) -> Result<()>;
}

/// `ChatService` over HTTP using `reqwest`
///
/// # Examples
///
/// ```
/// use kfupm_chat::client::HttpChatClient;
/// use kfupm_chat::config::ApiConfig;
///
/// let api = ApiConfig {
///     api_key: Some("secret".to_string()),
///     ..ApiConfig::default()
/// };
/// let client = HttpChatClient::new(&api).unwrap();
/// assert_eq!(client.base_url(), "http://localhost:5000");
/// ```
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpChatClient {
    /// Build a client from the API configuration
    ///
    /// # Errors
    ///
    /// Returns `ChatError::MissingCredentials` if no API key is configured
    /// and `ChatError::Config` if the base URL cannot be determined
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ChatError::MissingCredentials(
                    "api.api_key is not set (use KFUPM_CHAT_API_KEY)".to_string(),
                )
            })?;

        let base_url = config.base_url()?;

        let mut builder =
            Client::builder().user_agent(concat!("kfupm-chat/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized chat client: base_url={}", base_url);

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {}", url);

        self.client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Request to {} failed: {}", url, e);
                ChatError::Network(e.to_string()).into()
            })
    }
}

/// Turn a non-2xx response into `ChatError::Server`
///
/// The message is the body's `error` field when present, otherwise the
/// generic "Server error".
async fn server_error(response: reqwest::Response) -> ChatError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string());

    tracing::error!("Chat service returned error {}: {}", status, text);
    ChatError::Server { status, message }
}

#[async_trait]
impl ChatService for HttpChatClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let response = self.post("/chat", request).await?;

        if !response.status().is_success() {
            return Err(server_error(response).await.into());
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse chat response: {}", e);
            ChatError::Network(format!("Invalid response from chat service: {}", e))
        })?;

        tracing::debug!(
            "Received reply ({} chars, {} sources)",
            reply.reply.chars().count(),
            reply.sources.len()
        );
        Ok(reply)
    }

    async fn feedback(&self, request: &FeedbackRequest) -> Result<()> {
        let response = self
            .post("/feedback", request)
            .await
            .map_err(|e| ChatError::Feedback(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Feedback(format!("feedback rejected with {}", status)).into());
        }

        Ok(())
    }
}
