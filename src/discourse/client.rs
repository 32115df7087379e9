use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::utils::backoff::{retry_after_hint, RetryPolicy};

use super::types::{CategoryEnvelope, CreateUserResponse, UserEnvelope};
use super::{
    Category, CreatedPost, CreatedTopic, ForumError, ForumPort, ForumUser, NewForumUser,
    TopicDetails,
};

/// Thin REST client for the Discourse API. Writes can impersonate a forum
/// account by overriding the `Api-Username` header.
pub struct DiscourseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    api_username: String,
    retry: RetryPolicy,
}

impl DiscourseClient {
    pub fn new(config: &Config) -> Result<Self, ForumError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()?;

        info!(
            "discourse client initialized for {}",
            config.discourse.url
        );

        Ok(Self {
            http,
            base_url: config.discourse.url.trim_end_matches('/').to_string(),
            api_key: config.discourse.api_key.clone(),
            api_username: config.discourse.api_username.clone(),
            retry: config.http.retry_policy(),
        })
    }

    /// The account the bridge writes as; reverse sync uses it to recognize
    /// its own posts.
    pub fn api_username(&self) -> &str {
        &self.api_username
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Send with bounded retries on 429/5xx. 404 becomes [`ForumError::NotFound`],
    /// 409/422 become [`ForumError::Conflict`]; other failures are definitive
    /// [`ForumError::Api`] values.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        as_username: Option<&str>,
        context: &str,
    ) -> Result<reqwest::Response, ForumError> {
        let username = as_username.unwrap_or(&self.api_username);
        let mut attempt = 0u32;
        loop {
            let builder = request.try_clone().ok_or_else(|| {
                ForumError::Unexpected(format!("{context}: request is not retryable"))
            })?;
            let response = builder
                .header("Api-Key", self.api_key.expose_secret())
                .header("Api-Username", username)
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if RetryPolicy::is_retryable(status.as_u16()) && attempt + 1 < self.retry.max_attempts
            {
                let delay = self
                    .retry
                    .delay_for(attempt, retry_after_hint(response.headers()));
                warn!(
                    "discourse {} returned {}, retrying in {:?} (attempt {}/{})",
                    context,
                    status,
                    delay,
                    attempt + 1,
                    self.retry.max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 => ForumError::NotFound(context.to_string()),
                409 | 422 => ForumError::Conflict(message),
                code => ForumError::Api {
                    status: code,
                    message,
                },
            });
        }
    }
}

#[async_trait]
impl ForumPort for DiscourseClient {
    async fn get_category(&self, category_id: i64) -> Result<Option<Category>, ForumError> {
        let request = self.http.get(self.url(&format!("/c/{category_id}/show.json")));
        match self
            .send(request, None, &format!("get category {category_id}"))
            .await
        {
            Ok(response) => {
                let envelope = response.json::<CategoryEnvelope>().await?;
                Ok(Some(envelope.category))
            }
            Err(ForumError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create_category(
        &self,
        name: &str,
        parent_category_id: Option<i64>,
    ) -> Result<Category, ForumError> {
        // Discourse requires colors on category creation.
        let mut body = json!({
            "name": name,
            "color": "0088CC",
            "text_color": "FFFFFF",
        });
        if let Some(parent) = parent_category_id {
            body["parent_category_id"] = json!(parent);
        }

        let request = self.http.post(self.url("/categories.json")).json(&body);
        let response = self
            .send(request, None, &format!("create category {name}"))
            .await?;
        let envelope = response.json::<CategoryEnvelope>().await?;
        info!("created category {} ({})", envelope.category.name, envelope.category.id);
        Ok(envelope.category)
    }

    async fn create_topic(
        &self,
        title: &str,
        raw: &str,
        category_id: i64,
        as_username: Option<&str>,
    ) -> Result<CreatedTopic, ForumError> {
        let body = json!({ "title": title, "raw": raw, "category": category_id });
        let request = self.http.post(self.url("/posts.json")).json(&body);
        let response = self
            .send(request, as_username, "create topic")
            .await?;
        let post = response.json::<CreatedPost>().await?;
        let topic_id = post.topic_id.ok_or_else(|| {
            ForumError::Unexpected(format!(
                "create topic response for post {} carries no topic_id",
                post.id
            ))
        })?;
        info!("created topic {} (post {})", topic_id, post.id);
        Ok(CreatedTopic {
            topic_id,
            post_id: post.id,
        })
    }

    async fn create_post(
        &self,
        topic_id: i64,
        raw: &str,
        as_username: Option<&str>,
    ) -> Result<CreatedPost, ForumError> {
        let body = json!({ "topic_id": topic_id, "raw": raw });
        let request = self.http.post(self.url("/posts.json")).json(&body);
        let response = self
            .send(request, as_username, &format!("create post in topic {topic_id}"))
            .await?;
        let post = response.json::<CreatedPost>().await?;
        info!("created post {} in topic {}", post.id, topic_id);
        Ok(post)
    }

    async fn update_post(&self, post_id: i64, raw: &str) -> Result<(), ForumError> {
        let body = json!({ "post": { "raw": raw } });
        let request = self
            .http
            .put(self.url(&format!("/posts/{post_id}.json")))
            .json(&body);
        self.send(request, None, &format!("update post {post_id}"))
            .await?;
        info!("updated post {}", post_id);
        Ok(())
    }

    async fn get_topic(&self, topic_id: i64) -> Result<Option<TopicDetails>, ForumError> {
        let request = self.http.get(self.url(&format!("/t/{topic_id}.json")));
        match self
            .send(request, None, &format!("get topic {topic_id}"))
            .await
        {
            Ok(response) => {
                let details = response.json::<TopicDetails>().await?;
                debug!(
                    "retrieved topic {} with {} posts",
                    topic_id,
                    details.post_stream.posts.len()
                );
                Ok(Some(details))
            }
            Err(ForumError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create_user(&self, new_user: &NewForumUser) -> Result<(), ForumError> {
        let request = self.http.post(self.url("/users.json")).json(new_user);
        let response = self
            .send(request, None, &format!("create user {}", new_user.username))
            .await?;
        let outcome = response.json::<CreateUserResponse>().await?;
        if !outcome.success {
            // Discourse answers 200 with success=false for duplicate
            // usernames/emails.
            return Err(ForumError::Conflict(
                outcome
                    .message
                    .unwrap_or_else(|| "user creation rejected".to_string()),
            ));
        }
        info!("created user {}", new_user.username);
        Ok(())
    }

    async fn get_user(&self, username: &str) -> Result<Option<ForumUser>, ForumError> {
        let request = self.http.get(self.url(&format!("/users/{username}.json")));
        match self
            .send(request, None, &format!("get user {username}"))
            .await
        {
            Ok(response) => {
                let envelope = response.json::<UserEnvelope>().await?;
                Ok(Some(envelope.user))
            }
            Err(ForumError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
