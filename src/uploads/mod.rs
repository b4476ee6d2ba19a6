//! Filesystem storage for uploaded assets.
//!
//! Files live flat under the upload directory as `{uuid}_{original_name}`.
//! Writes go through a temp file that is renamed into place so a crashed
//! upload never leaves a partial file behind.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Hard cap on a single uploaded file.
pub const MAX_UPLOAD_BYTES: i64 = 25 * 1024 * 1024;

const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/postscript",
    "application/vnd.adobe.illustrator",
    "application/vnd.sketch",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/svg+xml",
    "image/webp",
    "video/mp4",
];

const ALLOWED_EXTENSIONS: &[&str] = &[
    "ai", "eps", "gif", "jpeg", "jpg", "mov", "mp4", "pdf", "png", "psd", "sketch", "svg", "webp",
];

/// Strips any path components from a client-supplied filename.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    if base.is_empty() || base == "." || base == ".." {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "pdf" => "application/pdf",
        "ai" | "eps" => "application/postscript",
        "sketch" => "application/vnd.sketch",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "psd" => "image/vnd.adobe.photoshop",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(mime)
}

/// Resolves the MIME type to record for an upload and rejects types we do
/// not accept. The client's declared type wins when present; otherwise the
/// extension decides. A file passes if either its type or its extension is
/// on the allow list.
pub fn resolve_mime(filename: &str, declared: Option<&str>) -> Result<Option<String>> {
    let ext = extension(filename);
    let mime = declared
        .filter(|m| !m.is_empty() && *m != "application/octet-stream")
        .map(str::to_string)
        .or_else(|| {
            ext.as_deref()
                .and_then(mime_for_extension)
                .map(str::to_string)
        });

    let mime_ok = mime
        .as_deref()
        .is_some_and(|m| ALLOWED_MIME_TYPES.contains(&m));
    let ext_ok = ext
        .as_deref()
        .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e));

    if mime_ok || ext_ok {
        Ok(mime)
    } else {
        Err(Error::UnsupportedMediaType(
            mime.or(ext).unwrap_or_else(|| "unknown".to_string()),
        ))
    }
}

#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn path_for(&self, stored_name: &str) -> Result<PathBuf> {
        if stored_name.contains('/') || stored_name.contains('\\') || stored_name.contains("..") {
            return Err(Error::Validation(format!(
                "invalid stored name: {stored_name}"
            )));
        }
        Ok(self.root.join(stored_name))
    }

    /// Writes `data` under a fresh `{uuid}_{filename}` name and returns that
    /// name. Rejects oversized payloads before anything touches disk.
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<String> {
        let size = data.len() as i64;
        if size > MAX_UPLOAD_BYTES {
            return Err(Error::PayloadTooLarge {
                size,
                max: MAX_UPLOAD_BYTES,
            });
        }

        fs::create_dir_all(&self.root).await?;

        let stored_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(filename));
        let final_path = self.path_for(&stored_name)?;
        let temp_path = self.root.join(format!(".tmp-{}", Uuid::new_v4()));

        let mut file = fs::File::create(&temp_path).await?;
        if let Err(e) = file.write_all(data).await {
            drop(file);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(stored_name)
    }

    /// Opens a stored file for streaming to a client.
    pub async fn open(&self, stored_name: &str) -> Result<fs::File> {
        let path = self.path_for(stored_name)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a stored file. Missing files are not an error; the database
    /// row is the source of truth and the file may already be gone.
    pub async fn delete(&self, stored_name: &str) -> Result<()> {
        let path = self.path_for(stored_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_open_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());

        let stored = store.save("logo.png", b"fake png bytes").await.unwrap();
        assert!(stored.ends_with("_logo.png"));

        let path = temp.path().join(&stored);
        assert_eq!(std::fs::read(&path).unwrap(), b"fake png bytes");

        store.open(&stored).await.unwrap();
        store.delete(&stored).await.unwrap();
        assert!(!path.exists());

        // Second delete is a no-op
        store.delete(&stored).await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_payload_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());

        let data = vec![0u8; MAX_UPLOAD_BYTES as usize + 1];
        let result = store.save("big.png", &data).await;
        assert!(matches!(result, Err(Error::PayloadTooLarge { .. })));

        let entries: Vec<_> = std::fs::read_dir(temp.path())
            .map(|rd| rd.collect::<std::io::Result<Vec<_>>>().unwrap())
            .unwrap_or_default();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());
        assert!(matches!(
            store.open("nope_missing.png").await,
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let store = UploadStore::new("/tmp/uploads");
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("a/b.png").is_err());
        assert!(store.path_for("ok_file.png").is_ok());
    }

    #[test]
    fn test_sanitize_filename_strips_paths() {
        assert_eq!(sanitize_filename("logo.png"), "logo.png");
        assert_eq!(sanitize_filename("dir/sub/logo.png"), "logo.png");
        assert_eq!(sanitize_filename("..\\evil.png"), "evil.png");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    #[test]
    fn test_resolve_mime() {
        // Declared type wins
        assert_eq!(
            resolve_mime("logo.png", Some("image/png")).unwrap().as_deref(),
            Some("image/png")
        );
        // Falls back to the extension
        assert_eq!(
            resolve_mime("deck.pdf", None).unwrap().as_deref(),
            Some("application/pdf")
        );
        // .psd passes on extension even though its type is not on the list
        assert_eq!(
            resolve_mime("art.psd", None).unwrap().as_deref(),
            Some("image/vnd.adobe.photoshop")
        );
        // Executables are refused
        assert!(matches!(
            resolve_mime("tool.exe", Some("application/x-msdownload")),
            Err(Error::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            resolve_mime("noext", None),
            Err(Error::UnsupportedMediaType(_))
        ));
    }
}
