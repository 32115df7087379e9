use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};

use crate::config::Config;
use crate::db::DatabaseManager;
use crate::discourse::{ForumPort, WebhookPost, WebhookTopic};
use crate::gchat::ChatPort;

pub use self::forward::ChatToForumSync;
pub use self::reverse::ForumToChatSync;
pub use self::users::UserResolver;

pub mod forward;
pub mod reverse;
pub mod users;

#[cfg(test)]
pub(crate) mod testutil;

/// What a Discourse webhook delivery did to its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Created,
    Edited,
    Destroyed,
}

impl EventAction {
    /// Map an `X-Discourse-Event` name (`post_created`, `topic_edited`,
    /// ...) to the action it describes.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name.rsplit('_').next() {
            Some("created") => Some(Self::Created),
            Some("edited") => Some(Self::Edited),
            Some("destroyed") => Some(Self::Destroyed),
            _ => None,
        }
    }
}

/// Coordinates the two engines: initial sync over the configured space
/// mappings, the periodic catch-up loop, and webhook event dispatch.
pub struct SyncService {
    config: Arc<Config>,
    db: Arc<DatabaseManager>,
    forward: Arc<ChatToForumSync>,
    reverse: Arc<ForumToChatSync>,
    exit_on_error: bool,
}

impl SyncService {
    pub fn new(
        config: Arc<Config>,
        chat: Arc<dyn ChatPort>,
        forum: Arc<dyn ForumPort>,
        db: Arc<DatabaseManager>,
        exit_on_error: bool,
    ) -> Self {
        let users = Arc::new(UserResolver::new(
            forum.clone(),
            db.clone(),
            config.users.email_domain.clone(),
        ));
        let forward = Arc::new(ChatToForumSync::new(
            chat.clone(),
            forum.clone(),
            db.clone(),
            users,
        ));
        let reverse = Arc::new(ForumToChatSync::new(
            chat,
            forum,
            db.clone(),
            config.discourse.api_username.clone(),
        ));

        Self {
            config,
            db,
            forward,
            reverse,
            exit_on_error,
        }
    }

    /// Initial sync followed by the periodic catch-up loop. Only returns
    /// with an error, and only in exit-on-error mode (or on a storage
    /// failure during startup).
    pub async fn run(&self) -> Result<()> {
        self.initial_sync().await?;

        let period = Duration::from_secs(self.config.sync_settings.poll_interval_minutes * 60);
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately and would duplicate the
        // initial sync.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(err) = self.periodic_sync().await {
                if self.exit_on_error {
                    return Err(err);
                }
                error!("periodic sync failed: {err:#}");
            }
        }
    }

    /// Mirror every configured space once: ensure the category mapping,
    /// then walk the message history. Per-space failures abort only that
    /// space unless exit-on-error is set.
    pub async fn initial_sync(&self) -> Result<()> {
        info!("starting initial synchronization");

        for mapping in &self.config.mappings {
            let space_id = mapping.google_space_id.as_str();
            info!("syncing space {}", space_id);

            let result = async {
                let category = self
                    .forward
                    .sync_space_to_category(
                        space_id,
                        mapping.discourse_category_id,
                        mapping.discourse_parent_category_id,
                    )
                    .await?;

                if category.is_some() {
                    self.forward.sync_messages_to_posts(space_id, None).await?;
                } else {
                    error!("failed to sync space {}", space_id);
                }
                anyhow::Ok(())
            }
            .await;

            if let Err(err) = result {
                if self.exit_on_error {
                    return Err(err);
                }
                error!("error syncing space {}: {err:#}", space_id);
            }
        }

        info!("initial synchronization complete");
        Ok(())
    }

    async fn periodic_sync(&self) -> Result<()> {
        info!("running periodic catch-up sync");

        for mapping in &self.config.mappings {
            let space_id = mapping.google_space_id.as_str();

            let result = async {
                let last_sync = self.db.sync_state_store().get_checkpoint(space_id).await?;
                let synced = self
                    .forward
                    .sync_messages_to_posts(space_id, last_sync)
                    .await?;
                info!("periodic sync: {} new messages from {}", synced, space_id);
                anyhow::Ok(())
            }
            .await;

            if let Err(err) = result {
                if self.exit_on_error {
                    return Err(err);
                }
                error!("error in periodic sync for {}: {err:#}", space_id);
            }
        }

        info!("periodic catch-up sync complete");
        Ok(())
    }

    pub async fn handle_post_event(&self, action: EventAction, post: WebhookPost) -> Result<()> {
        match action {
            EventAction::Created => {
                self.reverse.sync_post_to_message(&post).await?;
            }
            EventAction::Edited => {
                self.reverse.sync_post_update(&post).await?;
            }
            EventAction::Destroyed => {
                info!("post {} was destroyed", post.id);
            }
        }
        Ok(())
    }

    pub async fn handle_topic_event(
        &self,
        action: EventAction,
        topic: WebhookTopic,
    ) -> Result<()> {
        match action {
            EventAction::Created => {
                self.reverse.handle_topic_creation(&topic).await?;
            }
            EventAction::Edited => {
                info!("topic {} was edited", topic.id);
            }
            EventAction::Destroyed => {
                info!("topic {} was destroyed", topic.id);
            }
        }
        Ok(())
    }
}
