use crate::models::CreateGroup;
use crate::services::groups;
use crate::{Config, Database};
use anyhow::Result;
use std::path::Path;

use super::GroupCommand;

pub async fn run(config_path: &Path, command: GroupCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database.path)?;
    db.migrate()?;

    match command {
        GroupCommand::Add {
            title,
            slug,
            description,
        } => {
            let id = groups::create_group(
                &db,
                CreateGroup {
                    title,
                    slug,
                    description,
                },
            )?;
            if let Some(group) = groups::get_group(&db, id)? {
                println!("Created group '{}' at /group/{}/", group, group.slug);
            }
        }
        GroupCommand::List => {
            let all = groups::list_groups(&db)?;

            println!("{:<6} {:<40} {:<30}", "ID", "SLUG", "TITLE");
            println!("{}", "-".repeat(76));
            for group in all {
                println!("{:<6} {:<40} {:<30}", group.id, group.slug, group.title);
            }
        }
        GroupCommand::Remove { slug } => {
            if groups::delete_group(&db, &slug)? {
                tracing::info!("Group '{}' removed; its posts are now ungrouped", slug);
            } else {
                tracing::warn!("Group '{}' not found", slug);
            }
        }
    }

    Ok(())
}
