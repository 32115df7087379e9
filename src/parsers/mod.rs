pub use self::common::{make_title_and_body, resource_suffix, space_of_thread, MAX_TITLE_LEN};

pub mod common;
