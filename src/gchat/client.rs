use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::utils::backoff::{retry_after_hint, RetryPolicy};

use super::{ChatError, ChatMessage, ChatPort, ChatSender, ChatSpace, MessagePage};

const PAGE_SIZE: u32 = 100;

/// Thin REST client for the Google Chat v1 API. Authentication is a ready
/// bearer token supplied through configuration; token acquisition happens
/// outside this process.
pub struct GoogleChatClient {
    http: reqwest::Client,
    api_base: String,
    access_token: SecretString,
    retry: RetryPolicy,
}

#[derive(Debug, Default, Deserialize)]
struct MembershipPage {
    #[serde(default)]
    memberships: Vec<Membership>,
}

#[derive(Debug, Deserialize)]
struct Membership {
    #[serde(default)]
    member: Option<ChatSender>,
}

impl GoogleChatClient {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()?;

        info!(
            "google chat client initialized for {}",
            config.google.api_base
        );

        Ok(Self {
            http,
            api_base: config.google.api_base.trim_end_matches('/').to_string(),
            access_token: config.google.access_token.clone(),
            retry: config.http.retry_policy(),
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.api_base, resource.trim_start_matches('/'))
    }

    /// Send with bounded retries on 429/5xx; anything else is definitive.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<reqwest::Response, ChatError> {
        let mut attempt = 0u32;
        loop {
            let builder = request.try_clone().ok_or_else(|| ChatError::Api {
                status: 0,
                message: format!("{context}: request is not retryable"),
            })?;
            let response = builder
                .bearer_auth(self.access_token.expose_secret())
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
                    "google chat {} returned {}, retrying in {:?} (attempt {}/{})",
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
            return Err(if status.as_u16() == 404 {
                ChatError::NotFound(context.to_string())
            } else {
                ChatError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }
    }
}

#[async_trait]
impl ChatPort for GoogleChatClient {
    async fn get_space(&self, space_id: &str) -> Result<Option<ChatSpace>, ChatError> {
        let request = self.http.get(self.url(space_id));
        match self.send(request, &format!("get space {space_id}")).await {
            Ok(response) => {
                let space = response.json::<ChatSpace>().await?;
                debug!("retrieved space {}", space_id);
                Ok(Some(space))
            }
            Err(ChatError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn list_messages(
        &self,
        space_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage, ChatError> {
        let mut request = self
            .http
            .get(self.url(&format!("{space_id}/messages")))
            .query(&[("pageSize", PAGE_SIZE.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = self
            .send(request, &format!("list messages in {space_id}"))
            .await?;
        let page = response.json::<MessagePage>().await?;
        debug!(
            "listed {} messages from {} (more={})",
            page.messages.len(),
            space_id,
            page.next_page_token.is_some()
        );
        Ok(page)
    }

    async fn create_message(
        &self,
        space_id: &str,
        text: &str,
        thread_id: Option<&str>,
    ) -> Result<ChatMessage, ChatError> {
        let mut body = json!({ "text": text });
        let mut request = self.http.post(self.url(&format!("{space_id}/messages")));
        if let Some(thread) = thread_id {
            body["thread"] = json!({ "name": thread });
            request = request.query(&[(
                "messageReplyOption",
                "REPLY_MESSAGE_FALLBACK_TO_NEW_THREAD",
            )]);
        }

        let response = self
            .send(
                request.json(&body),
                &format!("create message in {space_id}"),
            )
            .await?;
        let message = response.json::<ChatMessage>().await?;
        info!("created message {} in {}", message.name, space_id);
        Ok(message)
    }

    async fn update_message(
        &self,
        message_name: &str,
        text: &str,
    ) -> Result<ChatMessage, ChatError> {
        let request = self
            .http
            .patch(self.url(message_name))
            .query(&[("updateMask", "text")])
            .json(&json!({ "text": text }));

        let response = self
            .send(request, &format!("update message {message_name}"))
            .await?;
        let message = response.json::<ChatMessage>().await?;
        info!("updated message {}", message_name);
        Ok(message)
    }

    async fn get_space_members(&self, space_id: &str) -> Result<Vec<ChatSender>, ChatError> {
        let request = self.http.get(self.url(&format!("{space_id}/members")));
        let response = self
            .send(request, &format!("list members of {space_id}"))
            .await?;
        let page = response.json::<MembershipPage>().await?;
        Ok(page
            .memberships
            .into_iter()
            .filter_map(|membership| membership.member)
            .collect())
    }
}
