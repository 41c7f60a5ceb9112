use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use chrono::Utc;
use rand::Rng;

use crate::error::AppError;
use crate::form::FormFields;

pub const IMAGE_FIELD: &str = "images";
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_FILES: usize = 10;
/// Public prefix under which stored images are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// An image written to the uploads directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub disk_path: PathBuf,
    pub public_path: String,
}

/// Text fields and stored images of one multipart listing submission.
#[derive(Debug, Default)]
pub struct ListingUpload {
    pub fields: FormFields,
    pub images: Vec<StoredImage>,
}

impl ListingUpload {
    pub fn public_paths(&self) -> Vec<String> {
        self.images.iter().map(|i| i.public_path.clone()).collect()
    }
}

/// `images-<unix millis>-<random>.<ext>`, keeping a sanitized extension of the
/// client's file name.
pub fn unique_file_name(original: Option<&str>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let ext = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}-{}-{}{}", IMAGE_FIELD, Utc::now().timestamp_millis(), suffix, ext)
}

pub fn is_image(content_type: Option<&str>) -> bool {
    content_type.map_or(false, |ct| ct.starts_with("image/"))
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::invalid(format!("Invalid multipart body: {}", e))
}

/// Reads a listing form, writing each image to `dir` as it arrives. If anything
/// fails, images already written for this request are removed again.
pub async fn read_listing_upload(mut multipart: Multipart, dir: &Path) -> Result<ListingUpload, AppError> {
    let mut upload = ListingUpload::default();
    match read_fields(&mut multipart, dir, &mut upload).await {
        Ok(()) => Ok(upload),
        Err(e) => {
            discard(&upload.images).await;
            Err(e)
        }
    }
}

async fn read_fields(multipart: &mut Multipart, dir: &Path, upload: &mut ListingUpload) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if field.file_name().is_none() {
            let value = field.text().await.map_err(multipart_error)?;
            upload.fields.push(name, value);
            continue;
        }
        if name != IMAGE_FIELD {
            return Err(AppError::invalid(format!("Unexpected file field `{}`", name)));
        }
        if upload.images.len() == MAX_FILES {
            return Err(AppError::invalid(format!("Too many files (max {})", MAX_FILES)));
        }
        let image = store_image(field, dir).await?;
        upload.images.push(image);
    }
    Ok(())
}

async fn store_image(mut field: Field<'_>, dir: &Path) -> Result<StoredImage, AppError> {
    if !is_image(field.content_type()) {
        return Err(AppError::invalid("Only image files are allowed"));
    }
    let file_name = unique_file_name(field.file_name());

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > MAX_FILE_BYTES {
            return Err(AppError::invalid("File too large (max 10MB)"));
        }
        bytes.extend_from_slice(&chunk);
    }

    let disk_path = dir.join(&file_name);
    tokio::fs::write(&disk_path, &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to write {}: {}", disk_path.display(), e)))?;
    log::info!("Stored upload {} ({} bytes)", file_name, bytes.len());
    Ok(StoredImage {
        disk_path,
        public_path: format!("{}/{}", PUBLIC_PREFIX, file_name),
    })
}

/// Best-effort removal of images that ended up unreferenced.
pub async fn discard(images: &[StoredImage]) {
    for image in images {
        if let Err(e) = tokio::fs::remove_file(&image.disk_path).await {
            log::warn!("Could not remove orphaned upload {}: {}", image.disk_path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_keep_a_clean_extension() {
        let name = unique_file_name(Some("Lobby Photo.JPG"));
        assert!(name.starts_with("images-"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.matches('-').count(), 2);

        assert!(!unique_file_name(Some("evil.p/h$p")).contains('$'));
        assert!(!unique_file_name(None).contains('.'));
    }

    #[test]
    fn only_image_content_types_pass() {
        assert!(is_image(Some("image/png")));
        assert!(is_image(Some("image/webp")));
        assert!(!is_image(Some("application/pdf")));
        assert!(!is_image(None));
    }

    #[tokio::test]
    async fn discard_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let disk_path = dir.path().join("images-1-2.png");
        tokio::fs::write(&disk_path, b"png").await.unwrap();
        discard(&[StoredImage {
            disk_path: disk_path.clone(),
            public_path: "/uploads/images-1-2.png".to_string(),
        }])
        .await;
        assert!(!disk_path.exists());
    }
}
