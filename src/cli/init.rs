use anyhow::Result;
use std::path::PathBuf;

pub async fn run(path: PathBuf, name: Option<String>) -> Result<()> {
    let site_name = name.unwrap_or_else(|| "Yatube".to_string());

    std::fs::create_dir_all(&path)?;
    std::fs::create_dir_all(path.join("data"))?;
    std::fs::create_dir_all(path.join("data/media"))?;

    let config_path = path.join("yatube.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    let config = format!(
        r#"[site]
title = "{}"
description = "Сообщество авторов"
url = "http://localhost:8000"
language = "ru"

[server]
host = "127.0.0.1"
port = 8000

[database]
path = "./data/yatube.db"

[content]
posts_per_page = 10

[media]
upload_dir = "./data/media"
max_upload_size = "5MB"

[cache]
index_ttl = 20

[auth]
session_lifetime = "14d"
login_url = "/auth/login/"
"#,
        site_name
    );

    std::fs::write(&config_path, config)?;

    tracing::info!("Created new Yatube site at {:?}", path);
    tracing::info!("Run 'yatube migrate' to set up the database");
    tracing::info!("Run 'yatube serve' to start the server");

    Ok(())
}
