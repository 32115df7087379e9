use chrono::{DateTime, Utc};

/// One Google Chat space mirrored into one Discourse category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceCategoryMapping {
    pub id: i64,
    pub chat_space_id: String,
    pub forum_category_id: i64,
    pub created_at: DateTime<Utc>,
}

/// One Google Chat thread mirrored into one Discourse topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadTopicMapping {
    pub id: i64,
    pub chat_thread_id: String,
    pub forum_topic_id: i64,
    pub chat_space_id: String,
    pub created_at: DateTime<Utc>,
}

/// One Google Chat message mirrored into one Discourse post. Row existence
/// is both the forward-sync idempotency gate and the reverse-sync loop
/// prevention gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePostMapping {
    pub id: i64,
    pub chat_message_id: String,
    pub forum_post_id: i64,
    pub chat_thread_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMapping {
    pub id: i64,
    pub chat_user_id: String,
    pub forum_username: String,
    pub chat_display_name: Option<String>,
    pub chat_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Last catch-up sync time per space. Advisory only; correctness rests on
/// [`MessagePostMapping`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCheckpoint {
    pub id: i64,
    pub chat_space_id: String,
    pub last_sync_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
