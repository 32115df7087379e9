use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::client::GoogleChatClient;

pub mod client;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("google chat resource not found: {0}")]
    NotFound(String),
    #[error("google chat api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("google chat request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSpace {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "type")]
    pub space_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatThread {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSender {
    /// User resource name, e.g. `users/123456789`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "type")]
    pub sender_type: Option<String>,
}

impl ChatSender {
    pub fn is_bot(&self) -> bool {
        self.sender_type.as_deref() == Some("BOT")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message resource name, e.g. `spaces/AAA/messages/MMM`.
    pub name: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thread: Option<ChatThread>,
    #[serde(default)]
    pub sender: Option<ChatSender>,
    #[serde(default)]
    pub create_time: Option<String>,
}

/// One page of a space's message history. `next_page_token` is an opaque
/// continuation handle; absence means the listing is exhausted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// The Google Chat surface the sync engines depend on.
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn get_space(&self, space_id: &str) -> Result<Option<ChatSpace>, ChatError>;
    async fn list_messages(
        &self,
        space_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage, ChatError>;
    async fn create_message(
        &self,
        space_id: &str,
        text: &str,
        thread_id: Option<&str>,
    ) -> Result<ChatMessage, ChatError>;
    async fn update_message(
        &self,
        message_name: &str,
        text: &str,
    ) -> Result<ChatMessage, ChatError>;
    async fn get_space_members(&self, space_id: &str) -> Result<Vec<ChatSender>, ChatError>;
}
