//! Local filesystem storage backend.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use omnidisk_common::{Error, ResourceKind, Result, StorageResource};

use crate::backend::{FileStorage, ResourcePage};
use crate::paths;

/// Storage backend over a sandboxed root directory.
///
/// Every path is joined under the root; absolute paths and `..` components
/// are rejected so no operation can escape the sandbox. Listing enumerates
/// immediate children only and never returns a pagination cursor.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a backend rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    /// Join a backend-relative path under the sandbox root.
    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let mut full = self.root.clone();
        for component in relative.split('/') {
            if component.is_empty() || component == "." {
                continue;
            }
            if component == ".." {
                return Err(Error::InvalidPath(relative.to_string()));
            }
            full.push(component);
        }
        Ok(full)
    }

    fn parent_path(parent: Option<&StorageResource>) -> &str {
        parent.map(|resource| resource.path.as_str()).unwrap_or("")
    }

    fn file_resource(&self, path: &str, full: &Path) -> StorageResource {
        let (_, name) = paths::parent_and_leaf(path);
        let location = full.display().to_string();
        StorageResource::new(
            name,
            path,
            ResourceKind::File {
                url: location.clone(),
                preview_url: Some(location),
            },
            "",
        )
    }

    async fn write_file(&self, path: &str, data: Option<&[u8]>) -> Result<StorageResource> {
        let full = self.resolve(path)?;
        fs::write(&full, data.unwrap_or_default()).await?;
        tracing::info!("file created: {}", path);
        Ok(self.file_resource(path, &full))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn find_file(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource> {
        let path = paths::join(Self::parent_path(parent), name);
        let full = self.resolve(&path)?;
        if full.is_file() {
            Ok(self.file_resource(&path, &full))
        } else {
            Err(Error::NotFound(name.to_string()))
        }
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource> {
        let path = paths::join(Self::parent_path(parent), name);
        let full = self.resolve(&path)?;
        if !full.exists() {
            return Err(Error::NotFound(name.to_string()));
        }
        if !full.is_dir() {
            return Err(Error::InvalidPath(format!("not a folder: {}", path)));
        }
        Ok(StorageResource::new(name, path, ResourceKind::Dir, ""))
    }

    async fn download(&self, resource: &StorageResource) -> Result<Vec<u8>> {
        let full = self.resolve(&resource.path)?;
        if !full.is_file() {
            return Err(Error::NotFound(resource.path.clone()));
        }
        tracing::debug!("loading data for: {}", resource.path);
        Ok(fs::read(&full).await?)
    }

    async fn get_folder(&self, name: &str) -> Result<StorageResource> {
        let full = self.resolve(name)?;
        if !full.is_dir() {
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(StorageResource::new(name, name, ResourceKind::Dir, ""))
    }

    async fn list(
        &self,
        parent: Option<&StorageResource>,
        _limit: usize,
        _cursor: Option<&str>,
    ) -> Result<ResourcePage> {
        let parent_path = Self::parent_path(parent);
        let full = self.resolve(parent_path)?;
        tracing::debug!("fetching resources at: {}", parent_path);

        let mut resources = Vec::new();
        let mut entries = fs::read_dir(&full).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let path = paths::join(parent_path, &name);
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                resources.push(StorageResource::new(name, path, ResourceKind::Dir, ""));
            } else {
                resources.push(self.file_resource(&path, &entry.path()));
            }
        }

        // Local listing is always a single page.
        Ok(ResourcePage {
            resources,
            next_cursor: None,
        })
    }

    async fn create_folder(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
    ) -> Result<StorageResource> {
        let path = paths::join(Self::parent_path(parent), name);
        let full = self.resolve(&path)?;
        if full.exists() {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        fs::create_dir_all(&full).await?;
        tracing::info!("folder created: {}", path);
        Ok(StorageResource::new(name, path, ResourceKind::Dir, ""))
    }

    async fn create_file(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
        data: Option<&[u8]>,
    ) -> Result<StorageResource> {
        let path = paths::join(Self::parent_path(parent), name);
        let full = self.resolve(&path)?;
        if full.exists() {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        self.write_file(&path, data).await
    }

    async fn update_file(&self, resource: &StorageResource, data: &[u8]) -> Result<()> {
        let full = self.resolve(&resource.path)?;
        if !full.exists() {
            tracing::debug!("file missing, creating new: {}", resource.path);
        }
        fs::write(&full, data).await?;
        Ok(())
    }

    async fn rename_file(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
        if !resource.is_file() {
            return Err(Error::InvalidPath(format!("not a file: {}", resource.path)));
        }

        let source = self.resolve(&resource.path)?;
        if !source.exists() {
            return Err(Error::NotFound(resource.name.clone()));
        }

        let (parent, _) = paths::parent_and_leaf(&resource.path);
        let destination = self.resolve(&paths::join(parent, new_name))?;
        fs::rename(&source, &destination).await?;
        tracing::debug!("renamed file {} to {}", resource.name, new_name);
        Ok(())
    }

    async fn rename_folder(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
        if !resource.is_dir() {
            return Err(Error::InvalidPath(format!(
                "not a folder: {}",
                resource.path
            )));
        }

        let source = self.resolve(&resource.path)?;
        if !source.exists() {
            return Err(Error::NotFound(resource.name.clone()));
        }

        let (parent, _) = paths::parent_and_leaf(&resource.path);
        let destination = self.resolve(&paths::join(parent, new_name))?;
        if destination.exists() {
            return Err(Error::AlreadyExists(new_name.to_string()));
        }

        fs::rename(&source, &destination).await?;
        tracing::debug!("renamed folder {} to {}", resource.name, new_name);
        Ok(())
    }

    async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve(from)?;
        if !source.exists() {
            return Err(Error::NotFound(from.to_string()));
        }
        let destination = self.resolve(to)?;
        fs::rename(&source, &destination).await?;
        tracing::info!("moved {} to {}", from, to);
        Ok(())
    }

    async fn delete(&self, resource: &StorageResource) -> Result<()> {
        let full = self.resolve(&resource.path)?;
        if !full.exists() {
            return Err(Error::NotFound(resource.path.clone()));
        }
        if full.is_dir() {
            fs::remove_dir_all(&full).await?;
        } else {
            fs::remove_file(&full).await?;
        }
        tracing::info!("deleted: {}", resource.path);
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        tracing::warn!("deleting all items at root");
        fs::remove_dir_all(&self.root).await?;
        Ok(())
    }
}
