use super::{GroupSummary, UserSummary};
use serde::Serialize;

/// Number of characters of `text` a post is displayed by.
pub const POST_PREVIEW_LENGTH: usize = 15;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: String,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl Post {
    pub fn preview(&self) -> String {
        self.text.chars().take(POST_PREVIEW_LENGTH).collect()
    }
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.preview())
    }
}

/// A post joined with the author and group it references, as listings and
/// the detail page render it.
#[derive(Debug, Clone, Serialize)]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
    pub group: Option<GroupSummary>,
}

/// Validated post fields. The author is never part of it; handlers pass the
/// requesting identity separately.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}
