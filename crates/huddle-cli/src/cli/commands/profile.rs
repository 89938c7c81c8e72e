//! Profile command handlers.

use std::path::Path;

use anyhow::{Context, Result};
use huddle_core::{Api, ImageUpload};
use huddle_types::ProfileUpdate;

use super::auth::resolve_password;
use crate::cli::user_error;

pub async fn update(api: &Api, name: &str, email: &str, password: Option<String>) -> Result<()> {
    let me = api.me().await.map_err(user_error)?;
    let update = ProfileUpdate {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
        password: resolve_password(password)?,
    };

    let user = api
        .update_profile(&me.id, &update)
        .await
        .map_err(user_error)?;
    println!("Profile updated: {} <{}>", user.name, user.email);
    Ok(())
}

pub async fn avatar(api: &Api, file: &Path) -> Result<()> {
    let mime_type = image_mime_type(file)?;
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map_or_else(|| "avatar".to_string(), |n| n.to_string_lossy().into_owned());

    let user = api
        .upload_image(ImageUpload {
            file_name,
            mime_type: mime_type.to_string(),
            bytes,
        })
        .await
        .map_err(user_error)?;

    match user.image_url.as_deref() {
        Some(url) => println!("Profile picture updated: {url}"),
        None => println!("Profile picture updated."),
    }
    Ok(())
}

fn image_mime_type(file: &Path) -> Result<&'static str> {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => anyhow::bail!(
            "Unsupported image type for {} (expected png, jpg, gif or webp)",
            file.display()
        ),
    }
}
