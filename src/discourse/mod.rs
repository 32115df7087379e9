use async_trait::async_trait;
use thiserror::Error;

pub use self::client::DiscourseClient;
pub use self::types::{
    Category, CreatedPost, CreatedTopic, ForumUser, NewForumUser, TopicDetails, TopicPost,
    WebhookPost, WebhookTopic,
};

pub mod client;
pub mod types;

#[derive(Debug, Error)]
pub enum ForumError {
    #[error("discourse resource not found: {0}")]
    NotFound(String),
    #[error("discourse rejected the request as a conflict: {0}")]
    Conflict(String),
    #[error("discourse api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("discourse returned an unexpected response: {0}")]
    Unexpected(String),
    #[error("discourse request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The Discourse surface the sync engines depend on. `as_username`
/// parameters select the account the write is attributed to via API
/// impersonation; `None` writes as the bridge's own API user.
#[async_trait]
pub trait ForumPort: Send + Sync {
    async fn get_category(&self, category_id: i64) -> Result<Option<Category>, ForumError>;
    async fn create_category(
        &self,
        name: &str,
        parent_category_id: Option<i64>,
    ) -> Result<Category, ForumError>;
    async fn create_topic(
        &self,
        title: &str,
        raw: &str,
        category_id: i64,
        as_username: Option<&str>,
    ) -> Result<CreatedTopic, ForumError>;
    async fn create_post(
        &self,
        topic_id: i64,
        raw: &str,
        as_username: Option<&str>,
    ) -> Result<CreatedPost, ForumError>;
    async fn update_post(&self, post_id: i64, raw: &str) -> Result<(), ForumError>;
    async fn get_topic(&self, topic_id: i64) -> Result<Option<TopicDetails>, ForumError>;
    /// Succeeds when the account was created; a [`ForumError::Conflict`]
    /// means the username is already taken and the caller may reuse it.
    async fn create_user(&self, request: &NewForumUser) -> Result<(), ForumError>;
    async fn get_user(&self, username: &str) -> Result<Option<ForumUser>, ForumError>;
}
