use anyhow::Result;
use image::ImageFormat;
use std::path::Path;
use uuid::Uuid;

/// Subdirectory of the media root that post images live in.
pub const POST_IMAGE_DIR: &str = "posts";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("File too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: usize, max: usize },
    #[error("The submitted file is empty.")]
    Empty,
    #[error(
        "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
    )]
    NotAnImage,
}

/// Checks that `data` fits the size limit and decodes as an image.
pub fn validate_image(data: &[u8], max_bytes: usize) -> Result<ImageFormat, UploadError> {
    if data.is_empty() {
        return Err(UploadError::Empty);
    }
    if data.len() > max_bytes {
        return Err(UploadError::TooLarge {
            size: data.len(),
            max: max_bytes,
        });
    }

    let format = image::guess_format(data).map_err(|_| UploadError::NotAnImage)?;
    image::load_from_memory_with_format(data, format).map_err(|_| UploadError::NotAnImage)?;
    Ok(format)
}

/// Writes a validated image under `<media_dir>/posts/` with a random name and
/// returns its path relative to the media root.
pub fn store_post_image(media_dir: &Path, data: &[u8], format: ImageFormat) -> Result<String> {
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    let filename = format!("{}.{}", Uuid::new_v4(), extension);

    let dir = media_dir.join(POST_IMAGE_DIR);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(&filename), data)?;

    tracing::debug!(file = %filename, bytes = data.len(), "Stored post image");
    Ok(format!("{}/{}", POST_IMAGE_DIR, filename))
}

/// Resolves `<media_dir>/<subdir>/<filename>` for serving, refusing names
/// that could escape the media root.
pub fn resolve_media_path(media_dir: &Path, subdir: &str, filename: &str) -> Option<std::path::PathBuf> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return None;
    }

    let file_path = media_dir.join(subdir).join(filename);

    let canonical_media = media_dir.canonicalize().ok()?;
    let canonical_file = file_path.canonicalize().ok()?;
    if !canonical_file.starts_with(&canonical_media) {
        return None;
    }

    Some(canonical_file)
}
