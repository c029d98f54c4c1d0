//! Entity images: object paths, validation, upload and removal.
//!
//! Sections and folders store their image at `{id}.{ext}`, so a new upload
//! of the same type overwrites the old object. Card images get a fresh
//! timestamped name per upload. Whenever the entity ends up pointing at a
//! different path, the previous object is removed.

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::{CardPatch, FolderPatch, SectionPatch};
use crate::store::{Backend, ImageStorage};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Lowercased extension of `file_name`, `webp` when it has none.
fn image_ext(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && !ext.contains('/'))
        .unwrap_or_else(|| "webp".to_string())
}

pub fn section_image_path(id: Uuid, file_name: &str) -> String {
    format!("sections/{}.{}", id, image_ext(file_name))
}

pub fn folder_image_path(id: Uuid, file_name: &str) -> String {
    format!("folders/{}.{}", id, image_ext(file_name))
}

/// `cards/{millis}-{random}.{ext}`.
pub fn card_image_path(file_name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "cards/{}-{}.{}",
        Utc::now().timestamp_millis(),
        &token[..10],
        image_ext(file_name)
    )
}

/// Content type for a file name, judged by extension.
pub fn content_type_for(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

pub fn validate_image(content_type: &str, size: usize) -> Result<(), DashboardError> {
    if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
        return Err(DashboardError::validation(
            "image",
            format!("unsupported type '{}' (use JPEG, PNG or WebP)", content_type),
        ));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(DashboardError::validation(
            "image",
            format!("{} bytes exceeds the 5 MiB limit", size),
        ));
    }
    Ok(())
}

/// Entity an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTarget {
    Section(Uuid),
    Folder(Uuid),
    Card(Uuid),
}

impl ImageTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            ImageTarget::Section(_) => "section",
            ImageTarget::Folder(_) => "folder",
            ImageTarget::Card(_) => "card",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ImageTarget::Section(id) | ImageTarget::Folder(id) | ImageTarget::Card(id) => *id,
        }
    }

    async fn current_image(&self, backend: &dyn Backend) -> Result<Option<String>> {
        let not_found = || DashboardError::not_found(self.kind(), self.id());
        Ok(match self {
            ImageTarget::Section(id) => backend.get_section(*id).await?.ok_or_else(not_found)?.image_url,
            ImageTarget::Folder(id) => backend.get_folder(*id).await?.ok_or_else(not_found)?.image_url,
            ImageTarget::Card(id) => backend.get_card(*id).await?.ok_or_else(not_found)?.image_url,
        })
    }

    async fn record(&self, backend: &dyn Backend, url: Option<String>) -> Result<()> {
        match self {
            ImageTarget::Section(id) => {
                let patch = SectionPatch {
                    image_url: Some(url),
                    ..Default::default()
                };
                backend.update_section(*id, &patch).await?;
            }
            ImageTarget::Folder(id) => {
                let patch = FolderPatch {
                    image_url: Some(url),
                    ..Default::default()
                };
                backend.update_folder(*id, &patch).await?;
            }
            ImageTarget::Card(id) => {
                let patch = CardPatch {
                    image_url: Some(url),
                    ..Default::default()
                };
                backend.update_card(*id, &patch).await?;
            }
        }
        Ok(())
    }
}

/// An image file ready for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Storage path of `url` when it points into `storage`.
fn stored_path(storage: &dyn ImageStorage, url: &str) -> Option<String> {
    let prefix = storage.public_url("");
    url.strip_prefix(prefix.as_str())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// Uploads `upload` for `target` and records its public URL on the entity.
/// Returns the public URL.
pub async fn set_entity_image(
    backend: &dyn Backend,
    storage: &dyn ImageStorage,
    target: ImageTarget,
    upload: ImageUpload,
) -> Result<String> {
    validate_image(&upload.content_type, upload.bytes.len())?;
    let previous = target.current_image(backend).await?;

    let path = match target {
        ImageTarget::Section(id) => section_image_path(id, &upload.file_name),
        ImageTarget::Folder(id) => folder_image_path(id, &upload.file_name),
        ImageTarget::Card(_) => card_image_path(&upload.file_name),
    };
    storage
        .upload(&path, upload.bytes, &upload.content_type)
        .await?;
    let url = storage.public_url(&path);

    if let Err(e) = target.record(backend, Some(url.clone())).await {
        tracing::warn!(path = %path, error = %e, "image uploaded but not recorded; object is orphaned");
        return Err(e);
    }

    if let Some(old) = previous.as_deref().and_then(|u| stored_path(storage, u)) {
        if old != path {
            if let Err(e) = storage.remove(&[old.clone()]).await {
                tracing::warn!(path = %old, error = %e, "failed to remove replaced image");
            }
        }
    }
    tracing::info!(kind = target.kind(), id = %target.id(), "image updated");
    Ok(url)
}

/// Clears the entity's image column and removes the stored object.
pub async fn clear_entity_image(
    backend: &dyn Backend,
    storage: &dyn ImageStorage,
    target: ImageTarget,
) -> Result<()> {
    let Some(current) = target.current_image(backend).await? else {
        return Ok(());
    };
    target.record(backend, None).await?;
    if let Some(path) = stored_path(storage, &current) {
        storage.remove(&[path]).await?;
    }
    Ok(())
}
