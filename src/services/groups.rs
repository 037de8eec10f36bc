use crate::models::{CreateGroup, Group};
use crate::services::slug::{generate_slug, validate_slug, GROUP_SLUG_MAX_LENGTH};
use crate::Database;
use anyhow::{bail, Result};
use rusqlite::{OptionalExtension, Row};

pub const GROUP_TITLE_MAX_LENGTH: usize = 200;

fn row_to_group(row: &Row) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

pub fn create_group(db: &Database, input: CreateGroup) -> Result<i64> {
    let title = input.title.trim();
    if title.is_empty() {
        bail!("Group title cannot be empty");
    }
    if title.chars().count() > GROUP_TITLE_MAX_LENGTH {
        bail!(
            "Group title must be {} characters or less",
            GROUP_TITLE_MAX_LENGTH
        );
    }

    let slug = match input.slug.filter(|s| !s.trim().is_empty()) {
        Some(s) => s.trim().to_string(),
        None => generate_slug(title, GROUP_SLUG_MAX_LENGTH),
    };

    if !validate_slug(&slug) {
        bail!(
            "Invalid slug '{}': must be 1-{} characters of letters, numbers, underscores or hyphens",
            slug,
            GROUP_SLUG_MAX_LENGTH
        );
    }

    let conn = db.get()?;
    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM post_groups WHERE slug = ?",
        [&slug],
        |row| row.get(0),
    )?;
    if taken > 0 {
        bail!("A group with slug '{}' already exists", slug);
    }

    conn.execute(
        "INSERT INTO post_groups (title, slug, description) VALUES (?, ?, ?)",
        (title, &slug, &input.description),
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(group_id = id, slug = %slug, "Group created");
    Ok(id)
}

pub fn get_group(db: &Database, id: i64) -> Result<Option<Group>> {
    let conn = db.get()?;
    let group = conn
        .query_row(
            "SELECT id, title, slug, description FROM post_groups WHERE id = ?",
            [id],
            row_to_group,
        )
        .optional()?;
    Ok(group)
}

pub fn get_group_by_slug(db: &Database, slug: &str) -> Result<Option<Group>> {
    let conn = db.get()?;
    let group = conn
        .query_row(
            "SELECT id, title, slug, description FROM post_groups WHERE slug = ?",
            [slug],
            row_to_group,
        )
        .optional()?;
    Ok(group)
}

pub fn list_groups(db: &Database) -> Result<Vec<Group>> {
    let conn = db.get()?;
    let mut stmt =
        conn.prepare("SELECT id, title, slug, description FROM post_groups ORDER BY title, id")?;
    let groups = stmt
        .query_map([], row_to_group)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

/// Removes the group. Its posts stay and lose their group reference.
pub fn delete_group(db: &Database, slug: &str) -> Result<bool> {
    let conn = db.get()?;
    let affected = conn.execute("DELETE FROM post_groups WHERE slug = ?", [slug])?;
    Ok(affected > 0)
}
