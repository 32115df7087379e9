use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::db::{DatabaseManager, UserMapping};
use crate::discourse::{ForumError, ForumPort, NewForumUser};
use crate::gchat::ChatSender;
use crate::parsers::resource_suffix;

static STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s_-]").expect("pattern compiles"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("pattern compiles"));
static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_-]+").expect("pattern compiles"));
static LEADING_NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^a-z0-9]+").expect("pattern compiles"));

/// Turn a chat display name into a valid Discourse username: 3-20 chars,
/// alphanumerics, dashes and underscores, starting alphanumeric.
pub fn sanitize_username(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = STRIP.replace_all(&lowered, "");
    let underscored = WHITESPACE_RUN.replace_all(&stripped, "_");
    let collapsed = SEPARATOR_RUN.replace_all(&underscored, "_");
    let leading_trimmed = LEADING_NON_ALNUM.replace(&collapsed, "");

    let mut username: String = leading_trimmed.chars().take(20).collect();
    if username.chars().count() < 3 {
        username.push_str("_user");
    }
    username.trim_end_matches(['_', '-']).to_string()
}

/// Synthesize a forum email for a chat user with no visible address:
/// `gchat_{numeric id}@{domain}`.
pub fn email_from_chat_user(chat_user_id: &str, domain: &str) -> String {
    format!("gchat_{}@{}", resource_suffix(chat_user_id), domain)
}

/// Maps chat senders to Discourse accounts, creating them on first sight.
pub struct UserResolver {
    forum: Arc<dyn ForumPort>,
    db: Arc<DatabaseManager>,
    email_domain: String,
}

impl UserResolver {
    pub fn new(forum: Arc<dyn ForumPort>, db: Arc<DatabaseManager>, email_domain: String) -> Self {
        Self {
            forum,
            db,
            email_domain,
        }
    }

    /// Resolve the Discourse username for a chat sender, creating the
    /// account when it does not exist yet. `Ok(None)` means the sender
    /// could not be resolved and the caller must post unattributed; `Err`
    /// is reserved for storage failures.
    pub async fn get_or_create_forum_user(&self, sender: &ChatSender) -> Result<Option<String>> {
        let chat_user_id = sender.name.as_str();
        if chat_user_id.is_empty() {
            error!("sender carries no user id");
            return Ok(None);
        }

        if let Some(existing) = self
            .db
            .user_store()
            .username_for_chat_user(chat_user_id)
            .await?
        {
            debug!("found existing mapping: {} -> {}", chat_user_id, existing);
            return Ok(Some(existing));
        }

        let display_name = sender
            .display_name
            .clone()
            .unwrap_or_else(|| "Unknown User".to_string());
        let candidate = sanitize_username(&display_name);
        let email = sender
            .email
            .clone()
            .unwrap_or_else(|| email_from_chat_user(chat_user_id, &self.email_domain));
        // Throwaway credential; the account is only ever written to via API
        // impersonation.
        let password = Uuid::new_v4().simple().to_string();

        let request = NewForumUser {
            name: display_name.clone(),
            email,
            password,
            username: candidate.clone(),
            active: true,
            approved: true,
        };

        let resolved = match self.forum.create_user(&request).await {
            Ok(()) => candidate,
            Err(ForumError::Conflict(reason)) => {
                info!(
                    "user {} may already exist ({}), fetching existing account",
                    candidate, reason
                );
                match self.forum.get_user(&candidate).await {
                    Ok(Some(user)) => user.username,
                    Ok(None) => {
                        error!(
                            "conflict creating user {} but no existing account was found",
                            candidate
                        );
                        return Ok(None);
                    }
                    Err(err) => {
                        error!("failed to fetch existing user {}: {}", candidate, err);
                        return Ok(None);
                    }
                }
            }
            Err(err) => {
                error!(
                    "failed to create discourse user for {}: {}",
                    chat_user_id, err
                );
                return Ok(None);
            }
        };

        let now = Utc::now();
        self.db
            .user_store()
            .upsert_user_mapping(&UserMapping {
                id: 0,
                chat_user_id: chat_user_id.to_string(),
                forum_username: resolved.clone(),
                chat_display_name: Some(display_name),
                chat_email: sender.email.clone(),
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "created discourse user {} for google chat user {}",
            resolved, chat_user_id
        );
        Ok(Some(resolved))
    }
}
