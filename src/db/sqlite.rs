use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use super::models::{
    MessagePostMapping, SpaceCategoryMapping, ThreadTopicMapping, UserMapping,
};
use super::DatabaseError;

// Timestamps are stored as RFC 3339 TEXT.
fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

fn establish_connection(path: &str) -> Result<SqliteConnection, DatabaseError> {
    SqliteConnection::establish(path).map_err(|e| DatabaseError::Connection(e.to_string()))
}

pub struct SqliteSpaceStore {
    db_path: Arc<String>,
}

impl SqliteSpaceStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::SpaceStore for SqliteSpaceStore {
    async fn upsert_space_mapping(
        &self,
        mapping: &SpaceCategoryMapping,
    ) -> Result<(), DatabaseError> {
        let mapping = mapping.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::space_category_mappings::dsl::*;

            let existing = space_category_mappings
                .filter(chat_space_id.eq(&mapping.chat_space_id))
                .select(id)
                .first::<i32>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            if let Some(row_id) = existing {
                diesel::update(space_category_mappings.filter(id.eq(row_id)))
                    .set(forum_category_id.eq(mapping.forum_category_id))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            } else {
                diesel::insert_into(space_category_mappings)
                    .values((
                        chat_space_id.eq(&mapping.chat_space_id),
                        forum_category_id.eq(mapping.forum_category_id),
                        created_at.eq(datetime_to_string(&mapping.created_at)),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            }
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn category_for_space(&self, space_id: &str) -> Result<Option<i64>, DatabaseError> {
        let space_id = space_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::space_category_mappings::dsl::*;
            space_category_mappings
                .filter(chat_space_id.eq(space_id))
                .select(forum_category_id)
                .first::<i64>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn space_for_category(&self, category_id: i64) -> Result<Option<String>, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::space_category_mappings::dsl::*;
            space_category_mappings
                .filter(forum_category_id.eq(category_id))
                .select(chat_space_id)
                .first::<String>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteThreadStore {
    db_path: Arc<String>,
}

impl SqliteThreadStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::ThreadStore for SqliteThreadStore {
    async fn upsert_thread_mapping(
        &self,
        mapping: &ThreadTopicMapping,
    ) -> Result<(), DatabaseError> {
        let mapping = mapping.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::thread_topic_mappings::dsl::*;

            let existing = thread_topic_mappings
                .filter(chat_thread_id.eq(&mapping.chat_thread_id))
                .select(id)
                .first::<i32>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            if let Some(row_id) = existing {
                diesel::update(thread_topic_mappings.filter(id.eq(row_id)))
                    .set((
                        forum_topic_id.eq(mapping.forum_topic_id),
                        chat_space_id.eq(&mapping.chat_space_id),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            } else {
                diesel::insert_into(thread_topic_mappings)
                    .values((
                        chat_thread_id.eq(&mapping.chat_thread_id),
                        forum_topic_id.eq(mapping.forum_topic_id),
                        chat_space_id.eq(&mapping.chat_space_id),
                        created_at.eq(datetime_to_string(&mapping.created_at)),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            }
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn topic_for_thread(&self, thread_id: &str) -> Result<Option<i64>, DatabaseError> {
        let thread_id = thread_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::thread_topic_mappings::dsl::*;
            thread_topic_mappings
                .filter(chat_thread_id.eq(thread_id))
                .select(forum_topic_id)
                .first::<i64>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn thread_for_topic(&self, topic_id: i64) -> Result<Option<String>, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::thread_topic_mappings::dsl::*;
            thread_topic_mappings
                .filter(forum_topic_id.eq(topic_id))
                .select(chat_thread_id)
                .first::<String>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteMessageStore {
    db_path: Arc<String>,
}

impl SqliteMessageStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::MessageStore for SqliteMessageStore {
    async fn upsert_message_mapping(
        &self,
        mapping: &MessagePostMapping,
    ) -> Result<(), DatabaseError> {
        let mapping = mapping.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::message_post_mappings::dsl::*;

            let existing = message_post_mappings
                .filter(chat_message_id.eq(&mapping.chat_message_id))
                .select(id)
                .first::<i32>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            if let Some(row_id) = existing {
                diesel::update(message_post_mappings.filter(id.eq(row_id)))
                    .set((
                        forum_post_id.eq(mapping.forum_post_id),
                        chat_thread_id.eq(&mapping.chat_thread_id),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            } else {
                diesel::insert_into(message_post_mappings)
                    .values((
                        chat_message_id.eq(&mapping.chat_message_id),
                        forum_post_id.eq(mapping.forum_post_id),
                        chat_thread_id.eq(&mapping.chat_thread_id),
                        created_at.eq(datetime_to_string(&mapping.created_at)),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            }
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn post_for_message(&self, message_id: &str) -> Result<Option<i64>, DatabaseError> {
        let message_id = message_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::message_post_mappings::dsl::*;
            message_post_mappings
                .filter(chat_message_id.eq(message_id))
                .select(forum_post_id)
                .first::<i64>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn message_for_post(&self, post_id: i64) -> Result<Option<String>, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::message_post_mappings::dsl::*;
            message_post_mappings
                .filter(forum_post_id.eq(post_id))
                .select(chat_message_id)
                .first::<String>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteUserStore {
    db_path: Arc<String>,
}

impl SqliteUserStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::UserStore for SqliteUserStore {
    async fn upsert_user_mapping(&self, mapping: &UserMapping) -> Result<(), DatabaseError> {
        let mapping = mapping.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::user_mappings::dsl::*;

            let existing = user_mappings
                .filter(chat_user_id.eq(&mapping.chat_user_id))
                .select(id)
                .first::<i32>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            if let Some(row_id) = existing {
                diesel::update(user_mappings.filter(id.eq(row_id)))
                    .set((
                        forum_username.eq(&mapping.forum_username),
                        chat_display_name.eq(mapping.chat_display_name.as_deref()),
                        chat_email.eq(mapping.chat_email.as_deref()),
                        updated_at.eq(datetime_to_string(&mapping.updated_at)),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            } else {
                diesel::insert_into(user_mappings)
                    .values((
                        chat_user_id.eq(&mapping.chat_user_id),
                        forum_username.eq(&mapping.forum_username),
                        chat_display_name.eq(mapping.chat_display_name.as_deref()),
                        chat_email.eq(mapping.chat_email.as_deref()),
                        created_at.eq(datetime_to_string(&mapping.created_at)),
                        updated_at.eq(datetime_to_string(&mapping.updated_at)),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            }
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn username_for_chat_user(
        &self,
        chat_user: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let chat_user = chat_user.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::user_mappings::dsl::*;
            user_mappings
                .filter(chat_user_id.eq(chat_user))
                .select(forum_username)
                .first::<String>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn chat_user_for_username(
        &self,
        username: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let username = username.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::user_mappings::dsl::*;
            user_mappings
                .filter(forum_username.eq(username))
                .select(chat_user_id)
                .first::<String>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}

pub struct SqliteSyncStateStore {
    db_path: Arc<String>,
}

impl SqliteSyncStateStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::SyncStateStore for SqliteSyncStateStore {
    async fn set_checkpoint(
        &self,
        space_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let space_id = space_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::sync_checkpoints::dsl::*;

            let now = datetime_to_string(&Utc::now());
            let stamp = datetime_to_string(&timestamp);

            let existing = sync_checkpoints
                .filter(chat_space_id.eq(&space_id))
                .select(id)
                .first::<i32>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            if let Some(row_id) = existing {
                diesel::update(sync_checkpoints.filter(id.eq(row_id)))
                    .set((last_sync_at.eq(stamp), updated_at.eq(now)))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            } else {
                diesel::insert_into(sync_checkpoints)
                    .values((
                        chat_space_id.eq(&space_id),
                        last_sync_at.eq(stamp),
                        updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .map(|_| ())
                    .map_err(|e| DatabaseError::Query(e.to_string()))
            }
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }

    async fn get_checkpoint(
        &self,
        space_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let space_id = space_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            use crate::db::schema::sync_checkpoints::dsl::*;
            sync_checkpoints
                .filter(chat_space_id.eq(space_id))
                .select(last_sync_at)
                .first::<String>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(|s| string_to_datetime(&s))
                .transpose()
        })
        .await
        .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
    }
}
