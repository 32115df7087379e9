use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info};

use crate::db::{DatabaseManager, MessagePostMapping, SpaceCategoryMapping, ThreadTopicMapping};
use crate::discourse::ForumPort;
use crate::gchat::{ChatMessage, ChatPort};
use crate::parsers::make_title_and_body;

use super::users::UserResolver;

/// Google Chat → Discourse direction. Message→post mapping rows are the
/// idempotency gate: re-running any operation over an already synced set is
/// a no-op.
pub struct ChatToForumSync {
    chat: Arc<dyn ChatPort>,
    forum: Arc<dyn ForumPort>,
    db: Arc<DatabaseManager>,
    users: Arc<UserResolver>,
}

impl ChatToForumSync {
    pub fn new(
        chat: Arc<dyn ChatPort>,
        forum: Arc<dyn ForumPort>,
        db: Arc<DatabaseManager>,
        users: Arc<UserResolver>,
    ) -> Self {
        Self {
            chat,
            forum,
            db,
            users,
        }
    }

    /// Ensure a space is mirrored by a category and return the category id.
    /// An existing mapping is returned unchanged; a caller-supplied
    /// `category_id` is verified remotely; otherwise a category named after
    /// the space is created, optionally under `parent_category_id`.
    /// `Ok(None)` means a logged remote failure; `Err` a storage failure.
    pub async fn sync_space_to_category(
        &self,
        space_id: &str,
        category_id: Option<i64>,
        parent_category_id: Option<i64>,
    ) -> Result<Option<i64>> {
        if let Some(existing) = self.db.space_store().category_for_space(space_id).await? {
            info!(
                "space {} already mapped to category {}",
                space_id, existing
            );
            return Ok(Some(existing));
        }

        let final_category_id = if let Some(requested) = category_id {
            match self.forum.get_category(requested).await {
                Ok(Some(category)) => category.id,
                Ok(None) => {
                    error!("category {} not found in discourse", requested);
                    return Ok(None);
                }
                Err(err) => {
                    error!("failed to verify category {}: {}", requested, err);
                    return Ok(None);
                }
            }
        } else {
            let space = match self.chat.get_space(space_id).await {
                Ok(Some(space)) => space,
                Ok(None) => {
                    error!("could not fetch space {}", space_id);
                    return Ok(None);
                }
                Err(err) => {
                    error!("could not fetch space {}: {}", space_id, err);
                    return Ok(None);
                }
            };
            let space_name = space
                .display_name
                .unwrap_or_else(|| "Unnamed Space".to_string());

            match self.forum.create_category(&space_name, parent_category_id).await {
                Ok(category) => category.id,
                Err(err) => {
                    error!("failed to create category for space {}: {}", space_id, err);
                    return Ok(None);
                }
            }
        };

        self.db
            .space_store()
            .upsert_space_mapping(&SpaceCategoryMapping {
                id: 0,
                chat_space_id: space_id.to_string(),
                forum_category_id: final_category_id,
                created_at: Utc::now(),
            })
            .await?;

        info!("synced space {} to category {}", space_id, final_category_id);
        Ok(Some(final_category_id))
    }

    /// Walk the space's message history page by page and mirror every
    /// message not yet synced. Returns the number of newly synced messages;
    /// per-message remote failures are logged and skipped. `since` is the
    /// stored checkpoint and purely advisory.
    pub async fn sync_messages_to_posts(
        &self,
        space_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        let Some(category_id) = self.db.space_store().category_for_space(space_id).await? else {
            error!("no category mapping found for space {}", space_id);
            return Ok(0);
        };

        if let Some(since) = since {
            debug!("catching up space {} from {}", space_id, since);
        }

        let mut synced = 0usize;
        let mut page_token: Option<String> = None;

        loop {
            let page = match self.chat.list_messages(space_id, page_token.as_deref()).await {
                Ok(page) => page,
                Err(err) => {
                    error!("failed to list messages in {}: {}", space_id, err);
                    break;
                }
            };

            for message in &page.messages {
                if self.sync_one_message(message, space_id, category_id).await? {
                    synced += 1;
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        if synced > 0 {
            self.db
                .sync_state_store()
                .set_checkpoint(space_id, Utc::now())
                .await?;
        }

        info!("synced {} messages from space {}", synced, space_id);
        Ok(synced)
    }

    /// Mirror a single message: a reply post when its thread already has a
    /// topic, a new topic otherwise. `Ok(true)` only when a remote entity
    /// was created and the mapping recorded.
    async fn sync_one_message(
        &self,
        message: &ChatMessage,
        space_id: &str,
        category_id: i64,
    ) -> Result<bool> {
        let message_id = message.name.as_str();

        if self
            .db
            .message_store()
            .post_for_message(message_id)
            .await?
            .is_some()
        {
            debug!("message {} already synced", message_id);
            return Ok(false);
        }

        let text = message.text.as_deref().unwrap_or("");
        if text.is_empty() {
            debug!("skipping empty message {}", message_id);
            return Ok(false);
        }

        let thread_id = message.thread.as_ref().map(|t| t.name.clone());
        let topic_id = match thread_id.as_deref() {
            Some(thread) => self.db.thread_store().topic_for_thread(thread).await?,
            None => None,
        };

        let author = self.resolve_author(message).await?;

        if let Some(topic_id) = topic_id {
            match self
                .forum
                .create_post(topic_id, text, author.as_deref())
                .await
            {
                Ok(post) => {
                    self.db
                        .message_store()
                        .upsert_message_mapping(&MessagePostMapping {
                            id: 0,
                            chat_message_id: message_id.to_string(),
                            forum_post_id: post.id,
                            chat_thread_id: thread_id.unwrap_or_default(),
                            created_at: Utc::now(),
                        })
                        .await?;
                    info!("created post {} for message {}", post.id, message_id);
                    Ok(true)
                }
                Err(err) => {
                    error!(
                        "failed to create post for message {}: {}; payload={}",
                        message_id,
                        err,
                        json!({ "topic_id": topic_id, "raw": text })
                    );
                    Ok(false)
                }
            }
        } else {
            let (title, body) = make_title_and_body(text);
            match self
                .forum
                .create_topic(&title, &body, category_id, author.as_deref())
                .await
            {
                Ok(created) => {
                    if let Some(thread) = thread_id.as_deref() {
                        self.db
                            .thread_store()
                            .upsert_thread_mapping(&ThreadTopicMapping {
                                id: 0,
                                chat_thread_id: thread.to_string(),
                                forum_topic_id: created.topic_id,
                                chat_space_id: space_id.to_string(),
                                created_at: Utc::now(),
                            })
                            .await?;
                    }
                    self.db
                        .message_store()
                        .upsert_message_mapping(&MessagePostMapping {
                            id: 0,
                            chat_message_id: message_id.to_string(),
                            forum_post_id: created.post_id,
                            chat_thread_id: thread_id.unwrap_or_default(),
                            created_at: Utc::now(),
                        })
                        .await?;
                    info!(
                        "created topic {} for message {}",
                        created.topic_id, message_id
                    );
                    Ok(true)
                }
                Err(err) => {
                    error!(
                        "failed to create topic for message {}: {}; payload={}",
                        message_id,
                        err,
                        json!({ "title": title, "raw": body, "category": category_id })
                    );
                    Ok(false)
                }
            }
        }
    }

    /// Mirror a chat-side edit onto the mapped post.
    pub async fn sync_message_update(&self, message_id: &str, new_text: &str) -> Result<bool> {
        let Some(post_id) = self.db.message_store().post_for_message(message_id).await? else {
            tracing::warn!("no post mapping found for message {}", message_id);
            return Ok(false);
        };

        match self.forum.update_post(post_id, new_text).await {
            Ok(()) => {
                info!("updated post {} for message {}", post_id, message_id);
                Ok(true)
            }
            Err(err) => {
                error!(
                    "failed to update post {} for message {}: {}",
                    post_id, message_id, err
                );
                Ok(false)
            }
        }
    }

    /// Forum account to impersonate for this message, if the sender can be
    /// resolved. Bot senders and resolution failures post unattributed.
    async fn resolve_author(&self, message: &ChatMessage) -> Result<Option<String>> {
        let Some(sender) = &message.sender else {
            return Ok(None);
        };
        if sender.is_bot() {
            debug!("not attributing bot sender {}", sender.name);
            return Ok(None);
        }
        self.users.get_or_create_forum_user(sender).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tempfile::NamedTempFile;

    use crate::bridge::testutil::{message, temp_db, MockChat, MockForum};
    use crate::bridge::users::UserResolver;
    use crate::db::{DatabaseManager, SpaceCategoryMapping, ThreadTopicMapping};
    use crate::gchat::MessagePage;

    use super::ChatToForumSync;

    const SPACE: &str = "spaces/AAA";

    async fn engine(
        chat: Arc<MockChat>,
        forum: Arc<MockForum>,
    ) -> (ChatToForumSync, Arc<DatabaseManager>, NamedTempFile) {
        let (db, file) = temp_db().await;
        let db = Arc::new(db);
        let users = Arc::new(UserResolver::new(
            forum.clone(),
            db.clone(),
            "gchat.local".to_string(),
        ));
        let sync = ChatToForumSync::new(chat, forum, db.clone(), users);
        (sync, db, file)
    }

    async fn map_space(db: &DatabaseManager, category_id: i64) {
        db.space_store()
            .upsert_space_mapping(&SpaceCategoryMapping {
                id: 0,
                chat_space_id: SPACE.to_string(),
                forum_category_id: category_id,
                created_at: Utc::now(),
            })
            .await
            .expect("seed space mapping");
    }

    fn page(messages: Vec<crate::gchat::ChatMessage>) -> MessagePage {
        MessagePage {
            messages,
            next_page_token: None,
        }
    }

    #[tokio::test]
    async fn space_sync_is_idempotent() {
        let chat = Arc::new(MockChat::default().with_space(SPACE, "Engineering"));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum.clone()).await;
        map_space(&db, 42).await;

        let category = sync
            .sync_space_to_category(SPACE, None, None)
            .await
            .expect("sync");
        assert_eq!(category, Some(42));
        assert!(forum.created_categories.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn space_sync_creates_category_named_after_space() {
        let chat = Arc::new(MockChat::default().with_space(SPACE, "Engineering"));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum.clone()).await;

        let category = sync
            .sync_space_to_category(SPACE, None, None)
            .await
            .expect("sync")
            .expect("category created");

        let created = forum.created_categories.lock().unwrap();
        assert_eq!(created.as_slice(), &[("Engineering".to_string(), None)]);
        assert_eq!(
            db.space_store()
                .category_for_space(SPACE)
                .await
                .expect("lookup"),
            Some(category)
        );

        // Second run returns the stored mapping without another create.
        drop(created);
        let again = sync
            .sync_space_to_category(SPACE, None, None)
            .await
            .expect("second sync");
        assert_eq!(again, Some(category));
        assert_eq!(forum.created_categories.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn space_sync_verifies_supplied_category() {
        let chat = Arc::new(MockChat::default().with_space(SPACE, "Engineering"));
        let forum = Arc::new(MockForum::default().with_category(7, "Existing"));
        let (sync, db, _file) = engine(chat, forum.clone()).await;

        let category = sync
            .sync_space_to_category(SPACE, Some(7), None)
            .await
            .expect("sync");
        assert_eq!(category, Some(7));
        assert!(forum.created_categories.lock().unwrap().is_empty());
        assert_eq!(
            db.space_store()
                .category_for_space(SPACE)
                .await
                .expect("lookup"),
            Some(7)
        );
    }

    #[tokio::test]
    async fn space_sync_fails_when_supplied_category_is_missing() {
        let chat = Arc::new(MockChat::default().with_space(SPACE, "Engineering"));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum).await;

        let category = sync
            .sync_space_to_category(SPACE, Some(999), None)
            .await
            .expect("sync");
        assert_eq!(category, None);
        assert_eq!(
            db.space_store()
                .category_for_space(SPACE)
                .await
                .expect("lookup"),
            None
        );
    }

    #[tokio::test]
    async fn message_sync_requires_space_mapping() {
        let chat = Arc::new(MockChat::default());
        let forum = Arc::new(MockForum::default());
        let (sync, _db, _file) = engine(chat, forum).await;

        let count = sync
            .sync_messages_to_posts(SPACE, None)
            .await
            .expect("sync");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn second_run_over_unchanged_messages_syncs_nothing() {
        let chat = Arc::new(MockChat::default().with_pages(vec![page(vec![
            message("spaces/AAA/messages/m1", "first message", None),
            message("spaces/AAA/messages/m2", "second message", None),
        ])]));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum.clone()).await;
        map_space(&db, 42).await;

        let first = sync
            .sync_messages_to_posts(SPACE, None)
            .await
            .expect("first run");
        assert_eq!(first, 2);

        let second = sync
            .sync_messages_to_posts(SPACE, None)
            .await
            .expect("second run");
        assert_eq!(second, 0);
        assert_eq!(forum.created_topics.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn threaded_message_replies_when_topic_exists() {
        let thread = "spaces/AAA/threads/t1";
        let chat = Arc::new(MockChat::default().with_pages(vec![page(vec![message(
            "spaces/AAA/messages/m1",
            "a reply",
            Some(thread),
        )])]));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum.clone()).await;
        map_space(&db, 42).await;
        db.thread_store()
            .upsert_thread_mapping(&ThreadTopicMapping {
                id: 0,
                chat_thread_id: thread.to_string(),
                forum_topic_id: 11,
                chat_space_id: SPACE.to_string(),
                created_at: Utc::now(),
            })
            .await
            .expect("seed thread mapping");

        let count = sync
            .sync_messages_to_posts(SPACE, None)
            .await
            .expect("sync");
        assert_eq!(count, 1);
        assert!(forum.created_topics.lock().unwrap().is_empty());

        let posts = forum.created_posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, 11);
        assert_eq!(posts[0].1, "a reply");
    }

    #[tokio::test]
    async fn threaded_message_creates_topic_and_thread_mapping() {
        let thread = "spaces/AAA/threads/t2";
        let chat = Arc::new(MockChat::default().with_pages(vec![page(vec![message(
            "spaces/AAA/messages/m1",
            "fresh thread",
            Some(thread),
        )])]));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum.clone()).await;
        map_space(&db, 42).await;

        let count = sync
            .sync_messages_to_posts(SPACE, None)
            .await
            .expect("sync");
        assert_eq!(count, 1);
        assert_eq!(forum.created_topics.lock().unwrap().len(), 1);
        assert!(forum.created_posts.lock().unwrap().is_empty());
        assert!(
            db.thread_store()
                .topic_for_thread(thread)
                .await
                .expect("lookup")
                .is_some()
        );
    }

    #[tokio::test]
    async fn empty_messages_are_skipped() {
        let chat = Arc::new(MockChat::default().with_pages(vec![page(vec![
            message("spaces/AAA/messages/m1", "", None),
            message("spaces/AAA/messages/m2", "real content", None),
        ])]));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum.clone()).await;
        map_space(&db, 42).await;

        let count = sync
            .sync_messages_to_posts(SPACE, None)
            .await
            .expect("sync");
        assert_eq!(count, 1);
        assert_eq!(
            db.message_store()
                .post_for_message("spaces/AAA/messages/m1")
                .await
                .expect("lookup"),
            None
        );
    }

    #[tokio::test]
    async fn failing_message_does_not_stop_the_batch() {
        let chat = Arc::new(MockChat::default().with_pages(vec![page(vec![
            message("spaces/AAA/messages/m1", "fine before", None),
            message("spaces/AAA/messages/m2", "poison pill", None),
            message("spaces/AAA/messages/m3", "fine after", None),
        ])]));
        let forum = Arc::new(MockForum::default());
        *forum.fail_when_raw_contains.lock().unwrap() = Some("poison".to_string());
        let (sync, db, _file) = engine(chat, forum.clone()).await;
        map_space(&db, 42).await;

        let count = sync
            .sync_messages_to_posts(SPACE, None)
            .await
            .expect("sync");
        assert_eq!(count, 2);
        assert_eq!(
            db.message_store()
                .post_for_message("spaces/AAA/messages/m2")
                .await
                .expect("lookup"),
            None
        );
        assert!(
            db.message_store()
                .post_for_message("spaces/AAA/messages/m3")
                .await
                .expect("lookup")
                .is_some()
        );
    }

    #[tokio::test]
    async fn pagination_follows_continuation_tokens() {
        let chat = Arc::new(MockChat::default().with_pages(vec![
            MessagePage {
                messages: vec![message("spaces/AAA/messages/m1", "page one", None)],
                next_page_token: Some("1".to_string()),
            },
            page(vec![message("spaces/AAA/messages/m2", "page two", None)]),
        ]));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum.clone()).await;
        map_space(&db, 42).await;

        let count = sync
            .sync_messages_to_posts(SPACE, None)
            .await
            .expect("sync");
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn checkpoint_moves_only_when_something_synced() {
        let chat = Arc::new(MockChat::default().with_pages(vec![page(vec![message(
            "spaces/AAA/messages/m1",
            "content",
            None,
        )])]));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum).await;
        map_space(&db, 42).await;

        assert_eq!(
            db.sync_state_store()
                .get_checkpoint(SPACE)
                .await
                .expect("checkpoint"),
            None
        );

        sync.sync_messages_to_posts(SPACE, None)
            .await
            .expect("first run");
        let stamped = db
            .sync_state_store()
            .get_checkpoint(SPACE)
            .await
            .expect("checkpoint")
            .expect("set after sync");

        sync.sync_messages_to_posts(SPACE, Some(stamped))
            .await
            .expect("second run");
        let unchanged = db
            .sync_state_store()
            .get_checkpoint(SPACE)
            .await
            .expect("checkpoint")
            .expect("still set");
        assert_eq!(unchanged, stamped);
    }

    #[tokio::test]
    async fn sender_is_impersonated_and_created_once() {
        let chat = Arc::new(MockChat::default().with_pages(vec![page(vec![
            message("spaces/AAA/messages/m1", "first", None),
            message("spaces/AAA/messages/m2", "second", None),
        ])]));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum.clone()).await;
        map_space(&db, 42).await;

        sync.sync_messages_to_posts(SPACE, None)
            .await
            .expect("sync");

        let topics = forum.created_topics.lock().unwrap();
        assert!(topics
            .iter()
            .all(|(_, _, _, username)| username.as_deref() == Some("john_doe")));
        assert_eq!(forum.created_users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn message_update_propagates_to_mapped_post() {
        let chat = Arc::new(MockChat::default().with_pages(vec![page(vec![message(
            "spaces/AAA/messages/m1",
            "original",
            None,
        )])]));
        let forum = Arc::new(MockForum::default());
        let (sync, db, _file) = engine(chat, forum.clone()).await;
        map_space(&db, 42).await;
        sync.sync_messages_to_posts(SPACE, None)
            .await
            .expect("sync");

        let updated = sync
            .sync_message_update("spaces/AAA/messages/m1", "edited text")
            .await
            .expect("update");
        assert!(updated);
        let updates = forum.updated_posts.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1, "edited text");
    }

    #[tokio::test]
    async fn message_update_without_mapping_is_a_noop() {
        let chat = Arc::new(MockChat::default());
        let forum = Arc::new(MockForum::default());
        let (sync, _db, _file) = engine(chat, forum.clone()).await;

        let updated = sync
            .sync_message_update("spaces/AAA/messages/unknown", "edited")
            .await
            .expect("update");
        assert!(!updated);
        assert!(forum.updated_posts.lock().unwrap().is_empty());
    }
}
