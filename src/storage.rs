//! Local image storage.
//!
//! Uploaded images live in directories named after the owning entity's id:
//!
//! ```text
//! <root>/category-images/<id>/<file>
//! <root>/brand-logos/<id>/<file>
//! <root>/product-images/<id>/<main image>
//! <root>/product-images/<id>/extras/<file>
//! ```
//!
//! Nothing here is transactional. Callers run these operations after the
//! database commit and log failures instead of propagating them.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

pub const CATEGORY_IMAGES_DIR: &str = "category-images";
pub const BRAND_LOGOS_DIR: &str = "brand-logos";
pub const PRODUCT_IMAGES_DIR: &str = "product-images";
pub const EXTRAS_DIR: &str = "extras";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),
}

impl StorageError {
    /// True when the failure is a missing file or directory
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reduces an uploaded file name to a single safe path component.
///
/// Directory parts (either separator style) are dropped, surrounding
/// whitespace is trimmed, and names that are empty, `.` or `..` are rejected.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let last = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(char::from(0));

    if last.is_empty() || last == "." || last == ".." {
        return None;
    }

    Some(last.to_string())
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('\\')
}

/// Maps entity ids to image directories under a configurable root.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category_id: i32) -> PathBuf {
        self.root
            .join(CATEGORY_IMAGES_DIR)
            .join(category_id.to_string())
    }

    pub fn brand_dir(&self, brand_id: i32) -> PathBuf {
        self.root.join(BRAND_LOGOS_DIR).join(brand_id.to_string())
    }

    pub fn product_dir(&self, product_id: i32) -> PathBuf {
        self.root
            .join(PRODUCT_IMAGES_DIR)
            .join(product_id.to_string())
    }

    pub fn product_extras_dir(&self, product_id: i32) -> PathBuf {
        self.product_dir(product_id).join(EXTRAS_DIR)
    }

    /// Removes every regular file in `dir`, creating the directory when it
    /// does not exist. Subdirectories are left in place.
    pub async fn clean_dir(&self, dir: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::io("create directory", dir, e))?;

        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| StorageError::io("list directory", dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("list directory", dir, e))?
        {
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if is_dir {
                continue;
            }

            if let Err(err) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %err, "Could not delete file");
            }
        }

        debug!(dir = %dir.display(), "Cleaned directory");
        Ok(())
    }

    /// Writes `content` to `dir/file_name`, creating `dir` as needed.
    pub async fn save_file(
        &self,
        dir: &Path,
        file_name: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        if !is_single_component(file_name) {
            return Err(StorageError::InvalidFileName(file_name.to_string()));
        }

        fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::io("create directory", dir, e))?;

        let path = dir.join(file_name);
        fs::write(&path, content)
            .await
            .map_err(|e| StorageError::io("save file", &path, e))?;

        debug!(path = %path.display(), bytes = content.len(), "Saved file");
        Ok(path)
    }

    /// Recursively removes `dir`; a missing directory is not an error.
    pub async fn remove_dir(&self, dir: &Path) -> Result<(), StorageError> {
        match fs::remove_dir_all(dir).await {
            Ok(()) => {
                debug!(dir = %dir.display(), "Removed directory");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::io("remove directory", dir, err)),
        }
    }

    /// Names of the regular files directly inside `dir`.
    pub async fn list_file_names(&self, dir: &Path) -> Result<Vec<String>, StorageError> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| StorageError::io("list directory", dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("list directory", dir, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Deletes a single file inside `dir`.
    pub async fn delete_file(&self, dir: &Path, file_name: &str) -> Result<(), StorageError> {
        if !is_single_component(file_name) {
            return Err(StorageError::InvalidFileName(file_name.to_string()));
        }
        let path = dir.join(file_name);
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io("delete file", &path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_strips_directories_and_traversal() {
        assert_eq!(sanitize_file_name("photo.png").as_deref(), Some("photo.png"));
        assert_eq!(
            sanitize_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_file_name("C:\\Users\\me\\shoe.jpg").as_deref(),
            Some("shoe.jpg")
        );
        assert_eq!(sanitize_file_name("  red dress.jpg ").as_deref(), Some("red dress.jpg"));
        assert_eq!(sanitize_file_name(""), None);
        assert_eq!(sanitize_file_name("images/"), None);
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("a/.."), None);
    }

    proptest! {
        #[test]
        fn sanitized_names_are_single_components(raw in ".{0,40}") {
            if let Some(name) = sanitize_file_name(&raw) {
                prop_assert!(!name.contains('/'));
                prop_assert!(!name.contains('\\'));
                prop_assert!(name != "..");
                prop_assert!(!name.is_empty());
            }
        }
    }

    #[test]
    fn directories_follow_entity_ids() {
        let storage = FileStorage::new("/srv/shop");
        assert_eq!(
            storage.category_dir(4),
            PathBuf::from("/srv/shop/category-images/4")
        );
        assert_eq!(storage.brand_dir(9), PathBuf::from("/srv/shop/brand-logos/9"));
        assert_eq!(
            storage.product_extras_dir(12),
            PathBuf::from("/srv/shop/product-images/12/extras")
        );
    }

    #[tokio::test]
    async fn clean_dir_removes_files_but_keeps_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());
        let dir = storage.product_dir(1);
        let extras = storage.product_extras_dir(1);

        storage.save_file(&dir, "old.png", b"old").await.unwrap();
        storage.save_file(&extras, "extra.png", b"x").await.unwrap();

        storage.clean_dir(&dir).await.unwrap();

        assert!(!dir.join("old.png").exists());
        assert!(extras.join("extra.png").exists());
    }

    #[tokio::test]
    async fn clean_dir_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());
        let dir = storage.category_dir(3);

        storage.clean_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn save_file_rejects_nested_names() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());

        let result = storage
            .save_file(&storage.category_dir(1), "../escape.png", b"x")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidFileName(_))));
    }

    #[tokio::test]
    async fn remove_dir_tolerates_missing_target() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());

        storage.remove_dir(&storage.product_dir(77)).await.unwrap();

        let dir = storage.product_extras_dir(5);
        storage.save_file(&dir, "a.png", b"a").await.unwrap();
        storage.remove_dir(&storage.product_dir(5)).await.unwrap();
        assert!(!storage.product_dir(5).exists());
    }

    #[tokio::test]
    async fn list_file_names_skips_directories() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());
        let dir = storage.product_dir(2);

        storage.save_file(&dir, "b.png", b"b").await.unwrap();
        storage.save_file(&dir, "a.png", b"a").await.unwrap();
        storage
            .save_file(&storage.product_extras_dir(2), "c.png", b"c")
            .await
            .unwrap();

        let names = storage.list_file_names(&dir).await.unwrap();
        assert_eq!(names, vec!["a.png".to_string(), "b.png".to_string()]);

        let missing = storage
            .list_file_names(&storage.product_extras_dir(40))
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
    }
}
