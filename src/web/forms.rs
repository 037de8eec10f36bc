//! Field-level validation of the HTML forms.
//!
//! Each form keeps the raw submitted values so a failed submission can be
//! re-rendered as the user typed it, next to the errors for each field.

use crate::models::{CreateUser, Post, PostInput};
use crate::services::{auth, groups, media};
use crate::Database;
use anyhow::Result;
use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const REQUIRED: &str = "This field is required.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

pub struct UploadedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

/// A submitted post form. Only `text`, `group`, `image` and `image-clear`
/// are read; any other field, `author` included, is dropped.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PostForm {
    pub text: String,
    pub group: String,
    #[serde(skip)]
    image_data: Option<Vec<u8>>,
    #[serde(skip)]
    image_clear: bool,
    /// Bytes of the `image` part seen so far; only the first
    /// `max_upload_bytes` are kept.
    #[serde(skip)]
    image_size: usize,
    #[serde(skip)]
    image_too_large: bool,
}

/// A post form that passed validation.
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<UploadedImage>,
    pub image_clear: bool,
}

impl CleanPost {
    /// Turns the cleaned form into storable fields. A new upload is written
    /// to disk; otherwise the image of `current` survives unless cleared.
    pub fn into_input(
        self,
        media_dir: &std::path::Path,
        current: Option<&Post>,
    ) -> Result<PostInput> {
        let image = match self.image {
            Some(upload) => Some(media::store_post_image(media_dir, &upload.data, upload.format)?),
            None if self.image_clear => None,
            None => current.and_then(|p| p.image.clone()),
        };
        Ok(PostInput {
            text: self.text,
            group_id: self.group_id,
            image,
        })
    }
}

impl PostForm {
    pub fn from_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Reads the submitted fields. An image over `max_upload_bytes`, or a
    /// body cut off by the request size limit, is recorded on the form so
    /// `clean` reports it as a field error.
    pub async fn from_multipart(
        mut multipart: Multipart,
        max_upload_bytes: usize,
    ) -> Result<Self, MultipartError> {
        let mut form = Self::default();
        loop {
            let read = match multipart.next_field().await {
                Ok(Some(field)) => form.read_field(field, max_upload_bytes).await,
                Ok(None) => break,
                Err(e) => Err(e),
            };
            match read {
                Ok(()) => {}
                Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    tracing::debug!(bytes = form.image_size, "Post form exceeded the body limit");
                    form.image_data = None;
                    form.image_too_large = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(form)
    }

    async fn read_field(
        &mut self,
        mut field: Field<'_>,
        max_upload_bytes: usize,
    ) -> Result<(), MultipartError> {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => self.text = field.text().await?,
            "group" => self.group = field.text().await?,
            "image-clear" => {
                let value = field.text().await?;
                self.image_clear = !value.is_empty() && value != "off";
            }
            "image" => {
                let has_filename = field.file_name().is_some_and(|f| !f.is_empty());
                let mut data = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    self.image_size += chunk.len();
                    if self.image_size <= max_upload_bytes {
                        data.extend_from_slice(&chunk);
                    }
                }
                if self.image_size > max_upload_bytes {
                    self.image_too_large = true;
                } else if has_filename || !data.is_empty() {
                    self.image_data = Some(data);
                }
            }
            _ => {
                // drain unknown fields, including a client-sent author
                while field.chunk().await?.is_some() {}
            }
        }
        Ok(())
    }

    pub fn clean(&self, db: &Database, max_upload_bytes: usize) -> Result<Result<CleanPost, FormErrors>> {
        let mut errors = FormErrors::default();

        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_id = match self.group.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) if groups::get_group(db, id)?.is_some() => Some(id),
                _ => {
                    errors.add(
                        "group",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            },
        };

        let image = match &self.image_data {
            _ if self.image_too_large => {
                let too_large = media::UploadError::TooLarge {
                    size: self.image_size.max(max_upload_bytes + 1),
                    max: max_upload_bytes,
                };
                errors.add("image", too_large.to_string());
                None
            }
            Some(data) => match media::validate_image(data, max_upload_bytes) {
                Ok(format) => Some(UploadedImage {
                    data: data.clone(),
                    format,
                }),
                Err(e) => {
                    errors.add("image", e.to_string());
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        Ok(Ok(CleanPost {
            text,
            group_id,
            image,
            image_clear: self.image_clear,
        }))
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let text = self.text.trim();
        if text.is_empty() {
            let mut errors = FormErrors::default();
            errors.add("text", REQUIRED);
            return Err(errors);
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SignupForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

impl SignupForm {
    /// Creates the account for a cleaned signup. A username claimed by a
    /// concurrent signup since `clean` ran comes back as a field error.
    pub fn register(db: &Database, input: &CreateUser) -> Result<Result<i64, FormErrors>> {
        match auth::create_user(db, input) {
            Ok(id) => Ok(Ok(id)),
            Err(e) => {
                if auth::get_user_by_username(db, &input.username)?.is_none() {
                    return Err(e);
                }
                tracing::debug!(username = %input.username, "Signup lost a race for the username");
                let mut errors = FormErrors::default();
                errors.add("username", USERNAME_TAKEN);
                Ok(Err(errors))
            }
        }
    }

    pub fn clean(&self, db: &Database) -> Result<Result<CreateUser, FormErrors>> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();

        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if let Err(e) = auth::validate_username(username) {
            errors.add("username", e.to_string());
        } else if auth::get_user_by_username(db, username)?.is_some() {
            errors.add("username", USERNAME_TAKEN);
        }

        let email = self.email.trim();
        if let Err(e) = auth::validate_email(email) {
            errors.add("email", e.to_string());
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else if let Err(e) = auth::validate_password(&self.password1) {
            errors.add("password1", e.to_string());
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        Ok(Ok(CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            password: self.password1.clone(),
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_form_requires_text() {
        let form = CommentForm {
            text: "   ".to_string(),
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(errors.get("text").unwrap(), [REQUIRED.to_string()]);
    }

    #[test]
    fn test_comment_form_trims_text() {
        let form = CommentForm {
            text: "  Отличный пост  ".to_string(),
        };
        assert_eq!(form.clean().unwrap(), "Отличный пост");
    }

    #[test]
    fn test_form_errors_accumulate_per_field() {
        let mut errors = FormErrors::default();
        assert!(errors.is_empty());
        errors.add("text", "one");
        errors.add("text", "two");
        errors.add("group", "three");
        assert_eq!(errors.get("text").unwrap().len(), 2);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"group": ["three"], "text": ["one", "two"]})
        );
    }

    #[test]
    fn test_post_form_from_post_prefills_values() {
        let post = Post {
            id: 1,
            text: "Тестовый текст".to_string(),
            pub_date: "2024-01-01T00:00:00.000000Z".to_string(),
            author_id: 1,
            group_id: Some(4),
            image: None,
        };
        let form = PostForm::from_post(&post);
        assert_eq!(form.text, "Тестовый текст");
        assert_eq!(form.group, "4");
    }
}
