//! ZIP export of a storage backend's full resource tree.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use omnidisk_common::{Error, Result, StorageResource};
use omnidisk_storage::FileStorage;

/// Page size used while walking folders.
const WALK_PAGE_LIMIT: usize = 100;

/// Exports any storage backend into one compressed archive.
///
/// Entries are named by each file's leaf name, not its full path: files
/// from different folders land flat next to each other, and same-named
/// files collide. Any single download failure aborts the whole export.
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }

    /// Walk the backend's tree, download every file, and write one ZIP.
    ///
    /// The archive lands in a fresh process-temporary directory; the caller
    /// owns it and must remove it via [`cleanup_archive`].
    ///
    /// [`cleanup_archive`]: ZipArchiver::cleanup_archive
    pub async fn create_archive(
        &self,
        source: &dyn FileStorage,
        archive_name: &str,
    ) -> Result<PathBuf> {
        tracing::info!("creating archive '{}'", archive_name);

        let temp_dir = std::env::temp_dir()
            .join("omnidisk-archiver")
            .join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&temp_dir)?;
        let archive_path = temp_dir.join(format!("{}.zip", archive_name));

        let files = Self::collect_files(source).await?;

        let output = File::create(&archive_path)?;
        let mut archive = ZipWriter::new(output);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        // Entry writes are strictly sequential: the writer is single-writer.
        for resource in files {
            let data = source.download(&resource).await?;
            archive
                .start_file(resource.name.as_str(), options)
                .map_err(zip_error)?;
            archive.write_all(&data)?;
            tracing::debug!("added file to archive: {}", resource.name);
        }

        archive.finish().map_err(zip_error)?;
        tracing::info!("archive created successfully");
        Ok(archive_path)
    }

    /// Every file in the tree, found depth-first with an explicit stack of
    /// pending folders and the paginated listing contract.
    async fn collect_files(source: &dyn FileStorage) -> Result<Vec<StorageResource>> {
        let mut files = Vec::new();
        let mut pending: Vec<Option<StorageResource>> = vec![None];

        while let Some(folder) = pending.pop() {
            let mut cursor: Option<String> = None;
            loop {
                let page = source
                    .list(folder.as_ref(), WALK_PAGE_LIMIT, cursor.as_deref())
                    .await?;
                for resource in page.resources {
                    if resource.is_dir() {
                        pending.push(Some(resource));
                    } else {
                        files.push(resource);
                    }
                }
                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        }

        Ok(files)
    }

    /// Remove the temporary directory containing an exported archive.
    pub fn cleanup_archive(&self, archive_path: &Path) -> Result<()> {
        let directory = archive_path.parent().ok_or_else(|| {
            Error::InvalidArchive(format!("archive has no parent directory: {}", archive_path.display()))
        })?;
        std::fs::remove_dir_all(directory)?;
        tracing::info!("cleaned up archive directory");
        Ok(())
    }
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self::new()
    }
}

fn zip_error(error: zip::result::ZipError) -> Error {
    Error::InvalidArchive(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use omnidisk_storage::{LocalStorage, MemoryStorage, ResourcePage};
    use std::io::Read;

    async fn populate(storage: &dyn FileStorage) {
        storage
            .create_file(None, "f1.txt", Some(b"first"))
            .await
            .unwrap();
        let sub = storage.create_folder(None, "sub").await.unwrap();
        storage
            .create_file(Some(&sub), "f2.txt", Some(b"second"))
            .await
            .unwrap();
    }

    fn read_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> Vec<u8> {
        let mut entry = archive.by_name(name).unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        data
    }

    #[tokio::test]
    async fn test_archive_flattens_tree_into_leaf_named_entries() {
        let storage = MemoryStorage::new();
        populate(&storage).await;

        let archiver = ZipArchiver::new();
        let path = archiver.create_archive(&storage, "backup").await.unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("zip"));

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(read_entry(&mut archive, "f1.txt"), b"first");
        assert_eq!(read_entry(&mut archive, "f2.txt"), b"second");

        archiver.cleanup_archive(&path).unwrap();
    }

    #[tokio::test]
    async fn test_archive_from_local_backend() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path()).unwrap();
        populate(&storage).await;

        let archiver = ZipArchiver::new();
        let path = archiver.create_archive(&storage, "backup").await.unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(read_entry(&mut archive, "f2.txt"), b"second");

        archiver.cleanup_archive(&path).unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_removes_containing_directory() {
        let storage = MemoryStorage::new();
        storage
            .create_file(None, "f1.txt", Some(b"x"))
            .await
            .unwrap();

        let archiver = ZipArchiver::new();
        let path = archiver.create_archive(&storage, "backup").await.unwrap();
        let directory = path.parent().unwrap().to_path_buf();
        assert!(directory.exists());

        archiver.cleanup_archive(&path).unwrap();
        assert!(!directory.exists());
    }

    /// Backend whose downloads always fail.
    struct BrokenDownloads(MemoryStorage);

    #[async_trait]
    impl FileStorage for BrokenDownloads {
        async fn find_file(
            &self,
            name: &str,
            parent: Option<&StorageResource>,
        ) -> Result<StorageResource> {
            self.0.find_file(name, parent).await
        }

        async fn find_folder(
            &self,
            name: &str,
            parent: Option<&StorageResource>,
        ) -> Result<StorageResource> {
            self.0.find_folder(name, parent).await
        }

        async fn download(&self, _resource: &StorageResource) -> Result<Vec<u8>> {
            Err(Error::Transport("connection reset".to_string()))
        }

        async fn get_folder(&self, name: &str) -> Result<StorageResource> {
            self.0.get_folder(name).await
        }

        async fn list(
            &self,
            parent: Option<&StorageResource>,
            limit: usize,
            cursor: Option<&str>,
        ) -> Result<ResourcePage> {
            self.0.list(parent, limit, cursor).await
        }

        async fn create_folder(
            &self,
            parent: Option<&StorageResource>,
            name: &str,
        ) -> Result<StorageResource> {
            self.0.create_folder(parent, name).await
        }

        async fn create_file(
            &self,
            parent: Option<&StorageResource>,
            name: &str,
            data: Option<&[u8]>,
        ) -> Result<StorageResource> {
            self.0.create_file(parent, name, data).await
        }

        async fn update_file(&self, resource: &StorageResource, data: &[u8]) -> Result<()> {
            self.0.update_file(resource, data).await
        }

        async fn rename_file(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
            self.0.rename_file(resource, new_name).await
        }

        async fn rename_folder(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
            self.0.rename_folder(resource, new_name).await
        }

        async fn move_file(&self, from: &str, to: &str) -> Result<()> {
            self.0.move_file(from, to).await
        }

        async fn delete(&self, resource: &StorageResource) -> Result<()> {
            self.0.delete(resource).await
        }

        async fn delete_all(&self) -> Result<()> {
            self.0.delete_all().await
        }
    }

    #[tokio::test]
    async fn test_single_download_failure_aborts_export() {
        let inner = MemoryStorage::new();
        inner
            .create_file(None, "f1.txt", Some(b"x"))
            .await
            .unwrap();
        let storage = BrokenDownloads(inner);

        let archiver = ZipArchiver::new();
        let result = archiver.create_archive(&storage, "backup").await;

        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
