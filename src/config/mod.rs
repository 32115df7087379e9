pub use self::parser::{
    Config, DatabaseConfig, DiscourseConfig, GoogleConfig, HttpConfig, SpaceMappingConfig,
    SyncSettings, UsersConfig,
};
pub use self::validator::ConfigError;

mod parser;
mod validator;
