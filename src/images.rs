//! `image` subcommands shared by sections, folders and cards.

use anyhow::{bail, Context, Result};
use std::path::Path;

use linkboard_core::images::{self, ImageTarget, ImageUpload};

use crate::app::App;

/// Reads an image file and packages it for upload, with the content type
/// judged by extension. Type and size are checked before the file is read.
pub fn read_image(path: &Path) -> Result<ImageUpload> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("not a file path: {}", path.display()))?;
    let content_type = images::content_type_for(&file_name).with_context(|| {
        format!(
            "{}: only .jpg, .jpeg, .png and .webp images are supported",
            file_name
        )
    })?;
    let size = std::fs::metadata(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?
        .len();
    images::validate_image(content_type, usize::try_from(size).unwrap_or(usize::MAX))
        .with_context(|| path.display().to_string())?;
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image: {}", path.display()))?;
    Ok(ImageUpload {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}

/// Shared by `sections image`, `folders image` and `cards image`.
pub async fn run_image(
    app: &App,
    target: ImageTarget,
    file: Option<&Path>,
    clear: bool,
) -> Result<()> {
    match (file, clear) {
        (Some(_), true) => bail!("pass either an image file or --clear, not both"),
        (None, false) => bail!("pass an image file or --clear"),
        (None, true) => {
            images::clear_entity_image(app.backend.as_ref(), app.storage.as_ref(), target).await?;
            println!("Cleared {} image", target.kind());
        }
        (Some(path), false) => {
            let upload = read_image(path)?;
            let url = images::set_entity_image(
                app.backend.as_ref(),
                app.storage.as_ref(),
                target,
                upload,
            )
            .await?;
            println!("{}", url);
        }
    }
    Ok(())
}
