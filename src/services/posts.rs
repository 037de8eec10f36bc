use crate::models::{GroupSummary, Post, PostInput, PostWithRelations, UserSummary};
use crate::Database;
use anyhow::{bail, Result};
use chrono::SecondsFormat;
use rusqlite::{OptionalExtension, Row};

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
}

impl PostFilter {
    fn group_id(self) -> Option<i64> {
        match self {
            Self::Group(id) => Some(id),
            _ => None,
        }
    }

    fn author_id(self) -> Option<i64> {
        match self {
            Self::Author(id) => Some(id),
            _ => None,
        }
    }
}

const POST_WITH_RELATIONS_SELECT: &str = r#"
    SELECT p.id, p.text, p.pub_date, p.author_id, p.group_id, p.image,
           u.username, u.first_name, u.last_name,
           g.title, g.slug
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id
"#;

/// Newest first; posts sharing a timestamp keep insertion order.
const POST_ORDERING: &str = "ORDER BY p.pub_date DESC, p.id ASC";

fn row_to_post(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        text: row.get(1)?,
        pub_date: row.get(2)?,
        author_id: row.get(3)?,
        group_id: row.get(4)?,
        image: row.get(5)?,
    })
}

fn row_to_post_with_relations(row: &Row) -> rusqlite::Result<PostWithRelations> {
    let post = row_to_post(row)?;
    let author = UserSummary::new(
        post.author_id,
        row.get(6)?,
        &row.get::<_, String>(7)?,
        &row.get::<_, String>(8)?,
    );
    let group = match (post.group_id, row.get::<_, Option<String>>(9)?) {
        (Some(id), Some(title)) => Some(GroupSummary {
            id,
            title,
            slug: row.get(10)?,
        }),
        _ => None,
    };
    Ok(PostWithRelations {
        post,
        author,
        group,
    })
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn check_input(input: &PostInput) -> Result<()> {
    if input.text.trim().is_empty() {
        bail!("Post text cannot be empty");
    }
    Ok(())
}

/// Inserts a post written by `author_id`. `pub_date` is stamped here and
/// never changes afterwards.
pub fn create_post(db: &Database, input: PostInput, author_id: i64) -> Result<i64> {
    check_input(&input)?;
    let pub_date = now_timestamp();
    let conn = db.get()?;
    conn.execute(
        "INSERT INTO posts (text, pub_date, author_id, group_id, image) VALUES (?, ?, ?, ?, ?)",
        (&input.text, &pub_date, author_id, input.group_id, &input.image),
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(post_id = id, author_id, group_id = ?input.group_id, "Post created");
    Ok(id)
}

/// Rewrites the editable fields of a post. Author and `pub_date` are not
/// touched.
pub fn update_post(db: &Database, id: i64, input: PostInput) -> Result<()> {
    check_input(&input)?;
    let conn = db.get()?;
    let affected = conn.execute(
        "UPDATE posts SET text = ?, group_id = ?, image = ? WHERE id = ?",
        (&input.text, input.group_id, &input.image, id),
    )?;
    if affected == 0 {
        bail!("Post {} not found", id);
    }
    tracing::info!(post_id = id, "Post updated");
    Ok(())
}

pub fn get_post(db: &Database, id: i64) -> Result<Option<Post>> {
    let conn = db.get()?;
    let post = conn
        .query_row(
            "SELECT id, text, pub_date, author_id, group_id, image FROM posts WHERE id = ?",
            [id],
            row_to_post,
        )
        .optional()?;
    Ok(post)
}

pub fn get_post_with_relations(db: &Database, id: i64) -> Result<Option<PostWithRelations>> {
    let conn = db.get()?;
    let post = conn
        .query_row(
            &format!("{} WHERE p.id = ?", POST_WITH_RELATIONS_SELECT),
            [id],
            row_to_post_with_relations,
        )
        .optional()?;
    Ok(post)
}

pub fn list_posts(
    db: &Database,
    filter: PostFilter,
    limit: usize,
    offset: usize,
) -> Result<Vec<PostWithRelations>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(&format!(
        "{} WHERE (?1 IS NULL OR p.group_id = ?1) AND (?2 IS NULL OR p.author_id = ?2) {} LIMIT ?3 OFFSET ?4",
        POST_WITH_RELATIONS_SELECT, POST_ORDERING
    ))?;
    let posts = stmt
        .query_map(
            (filter.group_id(), filter.author_id(), limit, offset),
            row_to_post_with_relations,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn count_posts(db: &Database, filter: PostFilter) -> Result<usize> {
    let conn = db.get()?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE (?1 IS NULL OR group_id = ?1) AND (?2 IS NULL OR author_id = ?2)",
        (filter.group_id(), filter.author_id()),
        |row| row.get(0),
    )?;
    Ok(count as usize)
}
