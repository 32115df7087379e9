use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::db::{DatabaseManager, MessagePostMapping, ThreadTopicMapping};
use crate::discourse::{ForumPort, WebhookPost, WebhookTopic};
use crate::gchat::ChatPort;
use crate::parsers::space_of_thread;

/// Discourse → Google Chat direction. Two gates keep content from cycling:
/// posts authored by the bridge's own API account are ignored, and so is
/// any post whose id already appears in the message→post relation (that
/// post is a mirror of a chat message).
pub struct ForumToChatSync {
    chat: Arc<dyn ChatPort>,
    forum: Arc<dyn ForumPort>,
    db: Arc<DatabaseManager>,
    api_username: String,
}

impl ForumToChatSync {
    pub fn new(
        chat: Arc<dyn ChatPort>,
        forum: Arc<dyn ForumPort>,
        db: Arc<DatabaseManager>,
        api_username: String,
    ) -> Self {
        Self {
            chat,
            forum,
            db,
            api_username,
        }
    }

    /// Mirror a new forum post into the chat thread mapped to its topic.
    pub async fn sync_post_to_message(&self, post: &WebhookPost) -> Result<bool> {
        let username = post.username.as_deref().unwrap_or("");
        if username == self.api_username {
            debug!("ignoring post {} created by api user", post.id);
            return Ok(false);
        }

        if self
            .db
            .message_store()
            .message_for_post(post.id)
            .await?
            .is_some()
        {
            debug!("post {} originated from google chat, ignoring", post.id);
            return Ok(false);
        }

        let Some(topic_id) = post.topic_id else {
            warn!("post {} carries no topic id", post.id);
            return Ok(false);
        };
        let Some(thread_id) = self.db.thread_store().thread_for_topic(topic_id).await? else {
            warn!("no google chat thread found for topic {}", topic_id);
            return Ok(false);
        };

        let space_id = space_of_thread(&thread_id);
        match self
            .chat
            .create_message(&space_id, post.body(), Some(&thread_id))
            .await
        {
            Ok(message) => {
                self.db
                    .message_store()
                    .upsert_message_mapping(&MessagePostMapping {
                        id: 0,
                        chat_message_id: message.name.clone(),
                        forum_post_id: post.id,
                        chat_thread_id: thread_id,
                        created_at: Utc::now(),
                    })
                    .await?;
                info!(
                    "synced post {} to google chat message {}",
                    post.id, message.name
                );
                Ok(true)
            }
            Err(err) => {
                error!(
                    "failed to create google chat message for post {}: {}",
                    post.id, err
                );
                Ok(false)
            }
        }
    }

    /// Mirror a forum-side edit onto the mapped chat message.
    pub async fn sync_post_update(&self, post: &WebhookPost) -> Result<bool> {
        let username = post.username.as_deref().unwrap_or("");
        if username == self.api_username {
            debug!("ignoring post update {} by api user", post.id);
            return Ok(false);
        }

        let Some(message_id) = self.db.message_store().message_for_post(post.id).await? else {
            debug!("no google chat message found for post {}", post.id);
            return Ok(false);
        };

        match self.chat.update_message(&message_id, post.body()).await {
            Ok(_) => {
                info!(
                    "updated google chat message {} for post {}",
                    message_id, post.id
                );
                Ok(true)
            }
            Err(err) => {
                error!(
                    "failed to update google chat message {} for post {}: {}",
                    message_id, post.id, err
                );
                Ok(false)
            }
        }
    }

    /// Mirror a topic created on the forum as a fresh chat thread in the
    /// space mapped to its category.
    pub async fn handle_topic_creation(&self, topic: &WebhookTopic) -> Result<bool> {
        let Some(category_id) = topic.category_id else {
            debug!("topic {} carries no category id", topic.id);
            return Ok(false);
        };
        let Some(space_id) = self.db.space_store().space_for_category(category_id).await? else {
            debug!("no google chat space found for category {}", category_id);
            return Ok(false);
        };

        let details = match self.forum.get_topic(topic.id).await {
            Ok(Some(details)) => details,
            Ok(None) => {
                error!("could not fetch topic {}", topic.id);
                return Ok(false);
            }
            Err(err) => {
                error!("could not fetch topic {}: {}", topic.id, err);
                return Ok(false);
            }
        };

        let Some(first_post) = details.first_post() else {
            warn!("no posts found in topic {}", topic.id);
            return Ok(false);
        };
        if first_post.username.as_deref() == Some(self.api_username.as_str()) {
            debug!("ignoring topic {} created by api user", topic.id);
            return Ok(false);
        }

        match self.chat.create_message(&space_id, first_post.body(), None).await {
            Ok(message) => {
                let thread_id = message
                    .thread
                    .as_ref()
                    .map(|t| t.name.clone())
                    .unwrap_or_default();

                if !thread_id.is_empty() {
                    self.db
                        .thread_store()
                        .upsert_thread_mapping(&ThreadTopicMapping {
                            id: 0,
                            chat_thread_id: thread_id.clone(),
                            forum_topic_id: topic.id,
                            chat_space_id: space_id,
                            created_at: Utc::now(),
                        })
                        .await?;
                }
                self.db
                    .message_store()
                    .upsert_message_mapping(&MessagePostMapping {
                        id: 0,
                        chat_message_id: message.name.clone(),
                        forum_post_id: first_post.id,
                        chat_thread_id: thread_id,
                        created_at: Utc::now(),
                    })
                    .await?;

                info!("created google chat thread for topic {}", topic.id);
                Ok(true)
            }
            Err(err) => {
                error!(
                    "failed to create google chat message for topic {}: {}",
                    topic.id, err
                );
                Ok(false)
            }
        }
    }
}
