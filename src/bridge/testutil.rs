use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::config::DatabaseConfig;
use crate::db::DatabaseManager;
use crate::discourse::{
    Category, CreatedPost, CreatedTopic, ForumError, ForumPort, ForumUser, NewForumUser,
    TopicDetails,
};
use crate::gchat::{ChatError, ChatMessage, ChatPort, ChatSender, ChatSpace, ChatThread, MessagePage};

/// Real SQLite store on a temp file; the file guard must outlive the
/// manager.
pub(crate) async fn temp_db() -> (DatabaseManager, NamedTempFile) {
    let file = NamedTempFile::new().expect("temp sqlite file");
    let config = DatabaseConfig {
        filename: Some(file.path().to_string_lossy().to_string()),
    };
    let manager = DatabaseManager::new(&config);
    manager.migrate().await.expect("migrate");
    (manager, file)
}

pub(crate) fn sender(id: &str, display_name: &str) -> ChatSender {
    ChatSender {
        name: id.to_string(),
        display_name: Some(display_name.to_string()),
        email: None,
        sender_type: Some("HUMAN".to_string()),
    }
}

pub(crate) fn message(name: &str, text: &str, thread: Option<&str>) -> ChatMessage {
    ChatMessage {
        name: name.to_string(),
        text: if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        },
        thread: thread.map(|t| ChatThread {
            name: t.to_string(),
        }),
        sender: Some(sender("users/1", "John Doe")),
        create_time: None,
    }
}

/// Scriptable in-memory Google Chat. Page tokens are page indexes.
#[derive(Default)]
pub(crate) struct MockChat {
    pub spaces: Mutex<HashMap<String, ChatSpace>>,
    pub pages: Mutex<Vec<MessagePage>>,
    pub created: Mutex<Vec<ChatMessage>>,
    pub updated: Mutex<Vec<(String, String)>>,
    pub fail_create: Mutex<bool>,
    counter: AtomicI64,
}

impl MockChat {
    pub fn with_space(self, space_id: &str, display_name: &str) -> Self {
        self.spaces.lock().unwrap().insert(
            space_id.to_string(),
            ChatSpace {
                name: space_id.to_string(),
                display_name: Some(display_name.to_string()),
                space_type: Some("SPACE".to_string()),
            },
        );
        self
    }

    pub fn with_pages(self, pages: Vec<MessagePage>) -> Self {
        *self.pages.lock().unwrap() = pages;
        self
    }
}

#[async_trait]
impl ChatPort for MockChat {
    async fn get_space(&self, space_id: &str) -> Result<Option<ChatSpace>, ChatError> {
        Ok(self.spaces.lock().unwrap().get(space_id).cloned())
    }

    async fn list_messages(
        &self,
        _space_id: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage, ChatError> {
        let index = page_token
            .map(|t| t.parse::<usize>().unwrap_or(0))
            .unwrap_or(0);
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_message(
        &self,
        space_id: &str,
        text: &str,
        thread_id: Option<&str>,
    ) -> Result<ChatMessage, ChatError> {
        if *self.fail_create.lock().unwrap() {
            return Err(ChatError::Api {
                status: 503,
                message: "mock chat outage".to_string(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let thread_name = thread_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("{space_id}/threads/new{n}"));
        let message = ChatMessage {
            name: format!("{space_id}/messages/created{n}"),
            text: Some(text.to_string()),
            thread: Some(ChatThread { name: thread_name }),
            sender: None,
            create_time: None,
        };
        self.created.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn update_message(
        &self,
        message_name: &str,
        text: &str,
    ) -> Result<ChatMessage, ChatError> {
        self.updated
            .lock()
            .unwrap()
            .push((message_name.to_string(), text.to_string()));
        Ok(ChatMessage {
            name: message_name.to_string(),
            text: Some(text.to_string()),
            thread: None,
            sender: None,
            create_time: None,
        })
    }

    async fn get_space_members(&self, _space_id: &str) -> Result<Vec<ChatSender>, ChatError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UserCreation {
    Succeed,
    Conflict,
    Fail,
}

/// Scriptable in-memory Discourse.
pub(crate) struct MockForum {
    pub categories: Mutex<HashMap<i64, Category>>,
    pub topics: Mutex<HashMap<i64, TopicDetails>>,
    pub users: Mutex<HashMap<String, ForumUser>>,
    pub created_categories: Mutex<Vec<(String, Option<i64>)>>,
    pub created_topics: Mutex<Vec<(String, String, i64, Option<String>)>>,
    pub created_posts: Mutex<Vec<(i64, String, Option<String>)>>,
    pub updated_posts: Mutex<Vec<(i64, String)>>,
    pub created_users: Mutex<Vec<NewForumUser>>,
    pub user_creation: Mutex<UserCreation>,
    /// `create_topic`/`create_post` fail when the raw body contains this.
    pub fail_when_raw_contains: Mutex<Option<String>>,
    next_id: AtomicI64,
}

impl Default for MockForum {
    fn default() -> Self {
        Self {
            categories: Mutex::default(),
            topics: Mutex::default(),
            users: Mutex::default(),
            created_categories: Mutex::default(),
            created_topics: Mutex::default(),
            created_posts: Mutex::default(),
            updated_posts: Mutex::default(),
            created_users: Mutex::default(),
            user_creation: Mutex::new(UserCreation::Succeed),
            fail_when_raw_contains: Mutex::new(None),
            next_id: AtomicI64::new(100),
        }
    }
}

impl MockForum {
    pub fn with_category(self, id: i64, name: &str) -> Self {
        self.categories.lock().unwrap().insert(
            id,
            Category {
                id,
                name: name.to_string(),
                parent_category_id: None,
                slug: None,
            },
        );
        self
    }

    pub fn with_topic(self, details: TopicDetails) -> Self {
        self.topics.lock().unwrap().insert(details.id, details);
        self
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn should_fail(&self, raw: &str) -> bool {
        self.fail_when_raw_contains
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|needle| raw.contains(needle))
    }
}

#[async_trait]
impl ForumPort for MockForum {
    async fn get_category(&self, category_id: i64) -> Result<Option<Category>, ForumError> {
        Ok(self.categories.lock().unwrap().get(&category_id).cloned())
    }

    async fn create_category(
        &self,
        name: &str,
        parent_category_id: Option<i64>,
    ) -> Result<Category, ForumError> {
        let id = self.next_id();
        let category = Category {
            id,
            name: name.to_string(),
            parent_category_id,
            slug: None,
        };
        self.categories.lock().unwrap().insert(id, category.clone());
        self.created_categories
            .lock()
            .unwrap()
            .push((name.to_string(), parent_category_id));
        Ok(category)
    }

    async fn create_topic(
        &self,
        title: &str,
        raw: &str,
        category_id: i64,
        as_username: Option<&str>,
    ) -> Result<CreatedTopic, ForumError> {
        if self.should_fail(raw) {
            return Err(ForumError::Api {
                status: 503,
                message: "mock forum outage".to_string(),
            });
        }
        let topic_id = self.next_id();
        let post_id = self.next_id();
        self.created_topics.lock().unwrap().push((
            title.to_string(),
            raw.to_string(),
            category_id,
            as_username.map(str::to_string),
        ));
        Ok(CreatedTopic { topic_id, post_id })
    }

    async fn create_post(
        &self,
        topic_id: i64,
        raw: &str,
        as_username: Option<&str>,
    ) -> Result<CreatedPost, ForumError> {
        if self.should_fail(raw) {
            return Err(ForumError::Api {
                status: 503,
                message: "mock forum outage".to_string(),
            });
        }
        let post_id = self.next_id();
        self.created_posts.lock().unwrap().push((
            topic_id,
            raw.to_string(),
            as_username.map(str::to_string),
        ));
        Ok(CreatedPost {
            id: post_id,
            topic_id: Some(topic_id),
            username: as_username.map(str::to_string),
        })
    }

    async fn update_post(&self, post_id: i64, raw: &str) -> Result<(), ForumError> {
        self.updated_posts
            .lock()
            .unwrap()
            .push((post_id, raw.to_string()));
        Ok(())
    }

    async fn get_topic(&self, topic_id: i64) -> Result<Option<TopicDetails>, ForumError> {
        Ok(self.topics.lock().unwrap().get(&topic_id).cloned())
    }

    async fn create_user(&self, request: &NewForumUser) -> Result<(), ForumError> {
        self.created_users.lock().unwrap().push(request.clone());
        match *self.user_creation.lock().unwrap() {
            UserCreation::Succeed => {
                let id = self.next_id();
                self.users.lock().unwrap().insert(
                    request.username.clone(),
                    ForumUser {
                        id,
                        username: request.username.clone(),
                        name: Some(request.name.clone()),
                    },
                );
                Ok(())
            }
            UserCreation::Conflict => Err(ForumError::Conflict(
                "username already taken".to_string(),
            )),
            UserCreation::Fail => Err(ForumError::Api {
                status: 500,
                message: "mock forum outage".to_string(),
            }),
        }
    }

    async fn get_user(&self, username: &str) -> Result<Option<ForumUser>, ForumError> {
        Ok(self.users.lock().unwrap().get(username).cloned())
    }
}
