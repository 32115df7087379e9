pub use self::error::DatabaseError;
pub use self::manager::DatabaseManager;
pub use self::models::{
    MessagePostMapping, SpaceCategoryMapping, SyncCheckpoint, ThreadTopicMapping, UserMapping,
};
pub use self::stores::{MessageStore, SpaceStore, SyncStateStore, ThreadStore, UserStore};

pub mod error;
pub mod manager;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod stores;
