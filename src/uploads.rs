//! Campground image files.
//!
//! Uploaded images are written below `uploads.dir` under their storage key
//! (`YelpCamp/<uuid>.<ext>`) and served back from [`PUBLIC_PREFIX`].

use std::path::{Path, PathBuf};

use axum::body::Bytes;

use crate::error::AppResult;
use crate::store::campgrounds::new_image_key;
use crate::types::ImageRef;

/// URL path the upload directory is mounted at.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Image types accepted for upload and the extension each is stored with.
const ACCEPTED: [(&str, &str); 4] =
    [("image/jpeg", "jpg"), ("image/png", "png"), ("image/gif", "gif"), ("image/webp", "webp")];

/// A file part of a multipart form body.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Form field the file arrived in.
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    ACCEPTED.iter().find(|(ct, _)| ct.eq_ignore_ascii_case(essence)).map(|(_, ext)| *ext)
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes one upload and returns its reference.
    pub async fn save(&self, upload: &Upload) -> AppResult<ImageRef> {
        let ext = extension_for(&upload.content_type)
            .ok_or_else(|| anyhow::anyhow!("unsupported upload type {}", upload.content_type))?;
        let key = new_image_key();
        let relative = format!("{}.{}", key, ext);
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(anyhow::Error::from)?;
        }
        tokio::fs::write(&path, &upload.bytes).await.map_err(anyhow::Error::from)?;
        tracing::debug!(key = %key, bytes = upload.bytes.len(), "Stored upload {:?}", upload.file_name);
        Ok(ImageRef { url: format!("{}/{}", PUBLIC_PREFIX, relative), filename: key })
    }

    /// Saves every upload. On failure the files written so far are removed.
    pub async fn save_all(&self, uploads: &[Upload]) -> AppResult<Vec<ImageRef>> {
        let mut saved = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.save(upload).await {
                Ok(image) => saved.push(image),
                Err(e) => {
                    self.remove_all(&saved).await;
                    return Err(e);
                }
            }
        }
        Ok(saved)
    }

    /// Local file behind an image, if it is one of ours.
    fn local_path(&self, image: &ImageRef) -> Option<PathBuf> {
        let relative = image.url.strip_prefix(PUBLIC_PREFIX)?.strip_prefix('/')?;
        if !relative.starts_with(&image.filename) || relative.contains("..") {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Removes stored files. Linked (remote) images are skipped; failures are
    /// logged.
    pub async fn remove_all(&self, images: &[ImageRef]) {
        for path in images.iter().filter_map(|i| self.local_path(i)) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Failed to remove upload {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> Upload {
        Upload {
            field: "image".into(),
            file_name: name.into(),
            content_type: "image/png".into(),
            bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\nfake"),
        }
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG; charset=binary"), Some("png"));
        assert_eq!(extension_for("text/html"), None);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let image = store.save(&png("tent.png")).await.unwrap();
        assert!(image.filename.starts_with("YelpCamp/"));
        assert_eq!(image.url, format!("/uploads/{}.png", image.filename));
        let path = dir.path().join(format!("{}.png", image.filename));
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG\r\n\x1a\nfake");

        let remote = ImageRef { url: "https://img.example.com/a.jpg".into(), filename: "YelpCamp/remote".into() };
        store.remove_all(&[image, remote]).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let mut upload = png("notes.txt");
        upload.content_type = "text/plain".into();
        assert!(store.save(&upload).await.is_err());
    }
}
