pub mod auth;
pub mod cache;
pub mod comments;
pub mod groups;
pub mod media;
pub mod paginator;
pub mod posts;
pub mod slug;
