use crate::services::cache::PageCache;
use crate::web::security::RateLimiter;
use crate::{Config, Database};
use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tera::{Tera, Value};

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub templates: Tera,
    pub media_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub session_days: i64,
    pub page_cache: PageCache,
    pub login_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let mut templates = Tera::default();

        templates.register_filter("format_date", format_date_filter);
        templates.register_filter("truncate_str", truncate_str_filter);
        templates.add_raw_templates(vec![
            ("base.html", include_str!("../../templates/base.html")),
            ("includes/paginator.html", include_str!("../../templates/includes/paginator.html")),
            ("includes/post_card.html", include_str!("../../templates/includes/post_card.html")),
            ("posts/index.html", include_str!("../../templates/posts/index.html")),
            ("posts/group_list.html", include_str!("../../templates/posts/group_list.html")),
            ("posts/profile.html", include_str!("../../templates/posts/profile.html")),
            ("posts/post_detail.html", include_str!("../../templates/posts/post_detail.html")),
            ("posts/create_post.html", include_str!("../../templates/posts/create_post.html")),
            ("users/login.html", include_str!("../../templates/users/login.html")),
            ("users/signup.html", include_str!("../../templates/users/signup.html")),
            ("users/logged_out.html", include_str!("../../templates/users/logged_out.html")),
            ("core/404.html", include_str!("../../templates/core/404.html")),
        ])?;

        let media_dir = PathBuf::from(&config.media.upload_dir);
        let max_upload_bytes = config.media.max_upload_bytes()?;
        let session_days = config.auth.session_days()?;
        let page_cache = PageCache::new(Duration::from_secs(config.cache.index_ttl));

        Ok(Self {
            config,
            db,
            templates,
            media_dir,
            max_upload_bytes,
            session_days,
            page_cache,
            login_limiter: Arc::new(RateLimiter::default()),
        })
    }
}

fn format_date_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let date_str = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("format_date requires a string"))?;

    let format = args
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("%d %B %Y");

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date_str) {
        return Ok(Value::String(dt.format(format).to_string()));
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S") {
        return Ok(Value::String(dt.format(format).to_string()));
    }

    Ok(Value::String(date_str.to_string()))
}

fn truncate_str_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("truncate_str requires a string"))?;
    let len = args.get("len").and_then(|v| v.as_u64()).unwrap_or(30) as usize;
    Ok(Value::String(s.chars().take(len).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_str_counts_characters() {
        let mut args = HashMap::new();
        args.insert("len".to_string(), json!(7));
        let out = truncate_str_filter(&json!("Тестовый текст"), &args).unwrap();
        assert_eq!(out, json!("Тестовы"));
    }

    #[test]
    fn test_format_date_rfc3339() {
        let mut args = HashMap::new();
        args.insert("format".to_string(), json!("%Y-%m-%d"));
        let out = format_date_filter(&json!("2024-03-01T10:20:30.123456Z"), &args).unwrap();
        assert_eq!(out, json!("2024-03-01"));
    }

    #[test]
    fn test_format_date_passes_through_unknown() {
        let out = format_date_filter(&json!("yesterday"), &HashMap::new()).unwrap();
        assert_eq!(out, json!("yesterday"));
    }
}
