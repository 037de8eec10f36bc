use crate::models::CreateUser;
use crate::{services::auth, Config, Database};
use anyhow::Result;
use std::path::Path;

use super::UserCommand;

fn prompt_new_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    let password_confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != password_confirm {
        anyhow::bail!("Passwords do not match");
    }
    Ok(password)
}

pub async fn run(config_path: &Path, command: UserCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open(&config.database.path)?;
    db.migrate()?;

    match command {
        UserCommand::Add {
            username,
            email,
            first_name,
            last_name,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt_new_password()?,
            };

            auth::create_user(
                &db,
                &CreateUser {
                    username: username.clone(),
                    email,
                    first_name,
                    last_name,
                    password,
                },
            )?;
            tracing::info!("User '{}' created", username);
        }
        UserCommand::List => {
            let users = auth::list_users(&db)?;

            println!("{:<20} {:<30} {:<25}", "USERNAME", "EMAIL", "NAME");
            println!("{}", "-".repeat(75));
            for user in users {
                println!(
                    "{:<20} {:<30} {:<25}",
                    user.username,
                    user.email,
                    user.display_name()
                );
            }
        }
        UserCommand::Remove { username } => match auth::get_user_by_username(&db, &username)? {
            Some(user) => {
                auth::delete_user(&db, user.id)?;
                tracing::info!("User '{}' removed along with their posts and comments", username);
            }
            None => tracing::warn!("User '{}' not found", username),
        },
        UserCommand::Passwd { username } => {
            let password = prompt_new_password()?;
            auth::update_password(&db, &username, &password)?;
            tracing::info!("Password updated for '{}'", username);
        }
    }

    Ok(())
}
