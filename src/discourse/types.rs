use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub parent_category_id: Option<i64>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryEnvelope {
    pub category: Category,
}

/// Shape of the post object returned by `POST /posts.json`. Creating a
/// topic and replying to one share this endpoint; the response is the
/// first/new post either way.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPost {
    pub id: i64,
    #[serde(default)]
    pub topic_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
}

/// A freshly created topic with its opening post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedTopic {
    pub topic_id: i64,
    pub post_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostStream {
    #[serde(default)]
    pub posts: Vec<TopicPost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicPost {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub cooked: Option<String>,
}

impl TopicPost {
    /// Raw Markdown when the webhook/API carries it, rendered HTML
    /// otherwise.
    pub fn body(&self) -> &str {
        self.raw
            .as_deref()
            .or(self.cooked.as_deref())
            .unwrap_or_default()
    }
}

/// `GET /t/{id}.json` — the topic with its post stream.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicDetails {
    pub id: i64,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub post_stream: PostStream,
}

impl TopicDetails {
    pub fn first_post(&self) -> Option<&TopicPost> {
        self.post_stream.posts.first()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: ForumUser,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateUserResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Account-creation request for `POST /users.json`.
#[derive(Debug, Clone, Serialize)]
pub struct NewForumUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub username: String,
    pub active: bool,
    pub approved: bool,
}

/// `post` payload of a Discourse webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPost {
    pub id: i64,
    #[serde(default)]
    pub topic_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub cooked: Option<String>,
}

impl WebhookPost {
    pub fn body(&self) -> &str {
        self.raw
            .as_deref()
            .or(self.cooked.as_deref())
            .unwrap_or_default()
    }
}

/// `topic` payload of a Discourse webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookTopic {
    pub id: i64,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}
