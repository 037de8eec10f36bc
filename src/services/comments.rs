use crate::models::{Comment, CommentWithAuthor, UserSummary};
use crate::Database;
use anyhow::{bail, Result};
use chrono::SecondsFormat;

pub fn create_comment(db: &Database, post_id: i64, author_id: i64, text: &str) -> Result<i64> {
    if text.trim().is_empty() {
        bail!("Comment text cannot be empty");
    }
    let created = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let conn = db.get()?;
    conn.execute(
        "INSERT INTO comments (post_id, author_id, text, created) VALUES (?, ?, ?, ?)",
        (post_id, author_id, text, &created),
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(comment_id = id, post_id, author_id, "Comment added");
    Ok(id)
}

/// Comments of a post, oldest first.
pub fn list_comments(db: &Database, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let conn = db.get()?;
    let mut stmt = conn.prepare(
        r#"
        SELECT c.id, c.post_id, c.author_id, c.text, c.created,
               u.username, u.first_name, u.last_name
        FROM comments c
        JOIN users u ON u.id = c.author_id
        WHERE c.post_id = ?
        ORDER BY c.created ASC, c.id ASC
        "#,
    )?;
    let comments = stmt
        .query_map([post_id], |row| {
            let comment = Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                author_id: row.get(2)?,
                text: row.get(3)?,
                created: row.get(4)?,
            };
            let author = UserSummary::new(
                comment.author_id,
                row.get(5)?,
                &row.get::<_, String>(6)?,
                &row.get::<_, String>(7)?,
            );
            Ok(CommentWithAuthor { comment, author })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}
