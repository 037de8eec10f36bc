use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub content: ContentConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentConfig {
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            posts_per_page: default_posts_per_page(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    pub upload_dir: String,
    #[serde(default = "default_max_upload")]
    pub max_upload_size: String,
}

impl MediaConfig {
    /// `max_upload_size` in bytes. Accepts a plain number or a `KB`/`MB`/`GB`
    /// suffix.
    pub fn max_upload_bytes(&self) -> Result<usize> {
        parse_size(&self.max_upload_size)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Seconds a rendered index page is served from the page cache.
    #[serde(default = "default_index_ttl")]
    pub index_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            index_ttl: default_index_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime: String,
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime: default_session_lifetime(),
            login_url: default_login_url(),
        }
    }
}

impl AuthConfig {
    /// `session_lifetime` in whole days; accepts `"7d"` or `"7"`.
    pub fn session_days(&self) -> Result<i64> {
        let raw = self.session_lifetime.trim();
        let digits = raw.strip_suffix('d').unwrap_or(raw);
        let days: i64 = digits
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid auth.session_lifetime '{}'", raw))?;
        if days <= 0 {
            anyhow::bail!("auth.session_lifetime must be at least one day");
        }
        Ok(days)
    }
}

fn parse_size(raw: &str) -> Result<usize> {
    let upper = raw.trim().to_uppercase();
    let (digits, multiplier) = if let Some(d) = upper.strip_suffix("GB") {
        (d, 1024 * 1024 * 1024)
    } else if let Some(d) = upper.strip_suffix("MB") {
        (d, 1024 * 1024)
    } else if let Some(d) = upper.strip_suffix("KB") {
        (d, 1024)
    } else if let Some(d) = upper.strip_suffix('B') {
        (d, 1)
    } else {
        (upper.as_str(), 1)
    };
    let value: usize = digits
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid size '{}'", raw))?;
    Ok(value * multiplier)
}

fn default_language() -> String {
    "ru".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_posts_per_page() -> usize {
    10
}

fn default_max_upload() -> String {
    "5MB".to_string()
}

fn default_index_ttl() -> u64 {
    20
}

fn default_session_lifetime() -> String {
    "14d".to_string()
}

fn default_login_url() -> String {
    "/auth/login/".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Run 'yatube init' first?",
                path.display(),
                e
            )
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.content.posts_per_page == 0 {
            anyhow::bail!("content.posts_per_page must be greater than 0");
        }
        if self.content.posts_per_page > 100 {
            anyhow::bail!("content.posts_per_page must be 100 or less");
        }
        if self.media.max_upload_bytes()? == 0 {
            anyhow::bail!("media.max_upload_size must be greater than 0");
        }
        if !self.auth.login_url.starts_with('/') {
            anyhow::bail!("auth.login_url must be a local path starting with '/'");
        }
        self.auth.session_days()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[site]
title = "Yatube"
url = "http://localhost:8000"

[database]
path = "./data/yatube.db"

[media]
upload_dir = "./data/media"
"#;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.content.posts_per_page, 10);
        assert_eq!(config.cache.index_ttl, 20);
        assert_eq!(config.auth.login_url, "/auth/login/");
        assert_eq!(config.server.port, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("512kb").unwrap(), 512 * 1024);
        assert_eq!(parse_size("2048").unwrap(), 2048);
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_session_days() {
        let mut auth = AuthConfig::default();
        assert_eq!(auth.session_days().unwrap(), 14);
        auth.session_lifetime = "3".to_string();
        assert_eq!(auth.session_days().unwrap(), 3);
        auth.session_lifetime = "0d".to_string();
        assert!(auth.session_days().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.content.posts_per_page = 0;
        assert!(config.validate().is_err());
    }
}
