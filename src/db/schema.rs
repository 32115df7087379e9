diesel::table! {
    space_category_mappings (id) {
        id -> Integer,
        chat_space_id -> Text,
        forum_category_id -> BigInt,
        created_at -> Text,
    }
}

diesel::table! {
    thread_topic_mappings (id) {
        id -> Integer,
        chat_thread_id -> Text,
        forum_topic_id -> BigInt,
        chat_space_id -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    message_post_mappings (id) {
        id -> Integer,
        chat_message_id -> Text,
        forum_post_id -> BigInt,
        chat_thread_id -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    user_mappings (id) {
        id -> Integer,
        chat_user_id -> Text,
        forum_username -> Text,
        chat_display_name -> Nullable<Text>,
        chat_email -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    sync_checkpoints (id) {
        id -> Integer,
        chat_space_id -> Text,
        last_sync_at -> Text,
        updated_at -> Text,
    }
}
