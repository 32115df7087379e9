use std::sync::Arc;

use diesel::sqlite::SqliteConnection;
use diesel::{Connection, RunQueryDsl};

use crate::config::DatabaseConfig;
use crate::db::sqlite::{
    SqliteMessageStore, SqliteSpaceStore, SqliteSyncStateStore, SqliteThreadStore, SqliteUserStore,
};
use crate::db::{DatabaseError, MessageStore, SpaceStore, SyncStateStore, ThreadStore, UserStore};

/// Owns the SQLite database path and hands out the per-relation stores.
#[derive(Clone)]
pub struct DatabaseManager {
    db_path: String,
    space_store: Arc<dyn SpaceStore>,
    thread_store: Arc<dyn ThreadStore>,
    message_store: Arc<dyn MessageStore>,
    user_store: Arc<dyn UserStore>,
    sync_state_store: Arc<dyn SyncStateStore>,
}

impl DatabaseManager {
    pub fn new(config: &DatabaseConfig) -> Self {
        let db_path = config.sqlite_path();
        let path_arc = Arc::new(db_path.clone());

        Self {
            space_store: Arc::new(SqliteSpaceStore::new(path_arc.clone())),
            thread_store: Arc::new(SqliteThreadStore::new(path_arc.clone())),
            message_store: Arc::new(SqliteMessageStore::new(path_arc.clone())),
            user_store: Arc::new(SqliteUserStore::new(path_arc.clone())),
            sync_state_store: Arc::new(SqliteSyncStateStore::new(path_arc)),
            db_path,
        }
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = SqliteConnection::establish(&path)
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            let statements = [
                r#"
                CREATE TABLE IF NOT EXISTS space_category_mappings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chat_space_id TEXT NOT NULL UNIQUE,
                    forum_category_id BIGINT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS thread_topic_mappings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chat_thread_id TEXT NOT NULL UNIQUE,
                    forum_topic_id BIGINT NOT NULL,
                    chat_space_id TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS message_post_mappings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chat_message_id TEXT NOT NULL UNIQUE,
                    forum_post_id BIGINT NOT NULL,
                    chat_thread_id TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS user_mappings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chat_user_id TEXT NOT NULL UNIQUE,
                    forum_username TEXT NOT NULL,
                    chat_display_name TEXT,
                    chat_email TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS sync_checkpoints (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chat_space_id TEXT NOT NULL UNIQUE,
                    last_sync_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )
                "#,
                "CREATE INDEX IF NOT EXISTS idx_space_mappings_space ON space_category_mappings(chat_space_id)",
                "CREATE INDEX IF NOT EXISTS idx_space_mappings_category ON space_category_mappings(forum_category_id)",
                "CREATE INDEX IF NOT EXISTS idx_thread_mappings_thread ON thread_topic_mappings(chat_thread_id)",
                "CREATE INDEX IF NOT EXISTS idx_thread_mappings_topic ON thread_topic_mappings(forum_topic_id)",
                "CREATE INDEX IF NOT EXISTS idx_message_mappings_message ON message_post_mappings(chat_message_id)",
                "CREATE INDEX IF NOT EXISTS idx_message_mappings_post ON message_post_mappings(forum_post_id)",
                "CREATE INDEX IF NOT EXISTS idx_user_mappings_chat_user ON user_mappings(chat_user_id)",
                "CREATE INDEX IF NOT EXISTS idx_user_mappings_username ON user_mappings(forum_username)",
                "CREATE INDEX IF NOT EXISTS idx_sync_checkpoints_space ON sync_checkpoints(chat_space_id)",
            ];

            for statement in statements {
                diesel::sql_query(statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    pub fn space_store(&self) -> Arc<dyn SpaceStore> {
        self.space_store.clone()
    }

    pub fn thread_store(&self) -> Arc<dyn ThreadStore> {
        self.thread_store.clone()
    }

    pub fn message_store(&self) -> Arc<dyn MessageStore> {
        self.message_store.clone()
    }

    pub fn user_store(&self) -> Arc<dyn UserStore> {
        self.user_store.clone()
    }

    pub fn sync_state_store(&self) -> Arc<dyn SyncStateStore> {
        self.sync_state_store.clone()
    }
}
