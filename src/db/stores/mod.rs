use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{
    MessagePostMapping, SpaceCategoryMapping, ThreadTopicMapping, UserMapping,
};
use super::DatabaseError;

/// Space ↔ category relation. Upserts are keyed on the chat space id;
/// lookups work in both directions.
#[async_trait]
pub trait SpaceStore: Send + Sync {
    async fn upsert_space_mapping(
        &self,
        mapping: &SpaceCategoryMapping,
    ) -> Result<(), DatabaseError>;
    async fn category_for_space(&self, space_id: &str) -> Result<Option<i64>, DatabaseError>;
    async fn space_for_category(&self, category_id: i64) -> Result<Option<String>, DatabaseError>;
}

/// Thread ↔ topic relation.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    async fn upsert_thread_mapping(
        &self,
        mapping: &ThreadTopicMapping,
    ) -> Result<(), DatabaseError>;
    async fn topic_for_thread(&self, thread_id: &str) -> Result<Option<i64>, DatabaseError>;
    async fn thread_for_topic(&self, topic_id: i64) -> Result<Option<String>, DatabaseError>;
}

/// Message ↔ post relation.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn upsert_message_mapping(
        &self,
        mapping: &MessagePostMapping,
    ) -> Result<(), DatabaseError>;
    async fn post_for_message(&self, message_id: &str) -> Result<Option<i64>, DatabaseError>;
    async fn message_for_post(&self, post_id: i64) -> Result<Option<String>, DatabaseError>;
}

/// Chat user ↔ forum account relation.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert_user_mapping(&self, mapping: &UserMapping) -> Result<(), DatabaseError>;
    async fn username_for_chat_user(
        &self,
        chat_user_id: &str,
    ) -> Result<Option<String>, DatabaseError>;
    async fn chat_user_for_username(
        &self,
        forum_username: &str,
    ) -> Result<Option<String>, DatabaseError>;
}

/// Per-space catch-up checkpoints.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn set_checkpoint(
        &self,
        space_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;
    async fn get_checkpoint(
        &self,
        space_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError>;
}
