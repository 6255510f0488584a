//! In-memory storage backend for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;
use uuid::Uuid;

use omnidisk_common::{Error, ResourceKind, Result, StorageResource};

use crate::backend::{FileStorage, ResourcePage};
use crate::paths;

/// In-memory entry: directories carry no data.
#[derive(Debug, Clone)]
struct Entry {
    id: String,
    data: Option<Vec<u8>>,
}

impl Entry {
    fn is_dir(&self) -> bool {
        self.data.is_none()
    }
}

/// In-memory storage backend.
///
/// Useful for tests: implements the full contract, including genuine offset
/// pagination, without network or disk. All data is lost on drop.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn parent_path(parent: Option<&StorageResource>) -> &str {
        parent.map(|resource| resource.path.as_str()).unwrap_or("")
    }

    fn to_resource(path: &str, entry: &Entry) -> StorageResource {
        let (_, name) = paths::parent_and_leaf(path);
        let kind = if entry.is_dir() {
            ResourceKind::Dir
        } else {
            ResourceKind::File {
                url: String::new(),
                preview_url: None,
            }
        };
        StorageResource::with_id(entry.id.clone(), name, path, kind, "")
    }

    /// Immediate children of a parent path, in key order.
    fn children(&self, parent_path: &str) -> Vec<StorageResource> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|(path, _)| paths::parent_and_leaf(path).0 == parent_path)
            .map(|(path, entry)| Self::to_resource(path, entry))
            .collect()
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn find_file(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource> {
        let path = paths::join(Self::parent_path(parent), name);
        match self.entries.read().unwrap().get(&path) {
            Some(entry) if !entry.is_dir() => Ok(Self::to_resource(&path, entry)),
            _ => Err(Error::NotFound(name.to_string())),
        }
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource> {
        let path = paths::join(Self::parent_path(parent), name);
        match self.entries.read().unwrap().get(&path) {
            Some(entry) if entry.is_dir() => Ok(Self::to_resource(&path, entry)),
            _ => Err(Error::NotFound(name.to_string())),
        }
    }

    async fn download(&self, resource: &StorageResource) -> Result<Vec<u8>> {
        match self.entries.read().unwrap().get(&resource.path) {
            Some(entry) => entry
                .data
                .clone()
                .ok_or_else(|| Error::InvalidPath(format!("not a file: {}", resource.path))),
            None => Err(Error::NotFound(resource.path.clone())),
        }
    }

    async fn get_folder(&self, name: &str) -> Result<StorageResource> {
        if name.is_empty() {
            return Ok(StorageResource::new("", "", ResourceKind::Dir, ""));
        }
        self.find_folder(name, None).await
    }

    async fn list(
        &self,
        parent: Option<&StorageResource>,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ResourcePage> {
        let offset: usize = match cursor {
            None => 0,
            Some(value) => value
                .parse()
                .map_err(|_| Error::InvalidInput(format!("invalid listing cursor: {}", value)))?,
        };

        let children = self.children(Self::parent_path(parent));
        let page: Vec<_> = children.into_iter().skip(offset).take(limit).collect();
        let next_cursor = if page.len() < limit {
            None
        } else {
            Some((offset + limit).to_string())
        };

        Ok(ResourcePage {
            resources: page,
            next_cursor,
        })
    }

    async fn create_folder(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
    ) -> Result<StorageResource> {
        let path = paths::join(Self::parent_path(parent), name);
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&path) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let entry = Entry {
            id: Uuid::new_v4().to_string(),
            data: None,
        };
        let resource = Self::to_resource(&path, &entry);
        entries.insert(path, entry);
        Ok(resource)
    }

    async fn create_file(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
        data: Option<&[u8]>,
    ) -> Result<StorageResource> {
        let path = paths::join(Self::parent_path(parent), name);
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&path) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let entry = Entry {
            id: Uuid::new_v4().to_string(),
            data: Some(data.unwrap_or_default().to_vec()),
        };
        let resource = Self::to_resource(&path, &entry);
        entries.insert(path, entry);
        Ok(resource)
    }

    async fn update_file(&self, resource: &StorageResource, data: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(resource.path.clone()).or_insert_with(|| Entry {
            id: Uuid::new_v4().to_string(),
            data: Some(Vec::new()),
        });
        if entry.is_dir() {
            return Err(Error::InvalidPath(format!("not a file: {}", resource.path)));
        }
        entry.data = Some(data.to_vec());
        Ok(())
    }

    async fn rename_file(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
        let (parent, _) = paths::parent_and_leaf(&resource.path);
        let destination = paths::join(parent, new_name);

        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&destination) {
            return Err(Error::AlreadyExists(new_name.to_string()));
        }
        let entry = entries
            .remove(&resource.path)
            .ok_or_else(|| Error::NotFound(resource.name.clone()))?;
        entries.insert(destination, entry);
        Ok(())
    }

    async fn rename_folder(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
        let (parent, _) = paths::parent_and_leaf(&resource.path);
        let destination = paths::join(parent, new_name);

        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&destination) {
            return Err(Error::AlreadyExists(new_name.to_string()));
        }
        if !entries.contains_key(&resource.path) {
            return Err(Error::NotFound(resource.name.clone()));
        }

        // Rekey the folder and everything below it.
        let prefix = format!("{}/", resource.path);
        let moved: Vec<(String, Entry)> = entries
            .iter()
            .filter(|(path, _)| *path == &resource.path || path.starts_with(&prefix))
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect();
        for (path, entry) in moved {
            entries.remove(&path);
            let new_path = format!("{}{}", destination, &path[resource.path.len()..]);
            entries.insert(new_path, entry);
        }
        Ok(())
    }

    async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .remove(from)
            .ok_or_else(|| Error::NotFound(from.to_string()))?;
        entries.insert(to.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, resource: &StorageResource) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        if entries.remove(&resource.path).is_none() {
            return Err(Error::NotFound(resource.path.clone()));
        }
        let prefix = format!("{}/", resource.path);
        entries.retain(|path, _| !path.starts_with(&prefix));
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.entries.write().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_roundtrip() {
        let storage = MemoryStorage::new();
        let data = b"bytes".to_vec();

        let file = storage
            .create_file(None, "a.txt", Some(&data))
            .await
            .unwrap();
        assert_eq!(storage.download(&file).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_pagination_is_exhaustive_and_non_overlapping() {
        let storage = MemoryStorage::new();
        for index in 0..25 {
            storage
                .create_file(None, &format!("file-{:02}.txt", index), None)
                .await
                .unwrap();
        }

        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = storage.list(None, 10, cursor.as_deref()).await.unwrap();
            for resource in &page.resources {
                assert!(seen.insert(resource.name.clone()), "duplicate entry");
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(seen.len(), 25);
    }

    #[tokio::test]
    async fn test_repeated_cursor_returns_same_page() {
        let storage = MemoryStorage::new();
        for index in 0..15 {
            storage
                .create_file(None, &format!("file-{:02}.txt", index), None)
                .await
                .unwrap();
        }

        let first = storage.list(None, 5, Some("5")).await.unwrap();
        let second = storage.list(None, 5, Some("5")).await.unwrap();

        let names = |page: &ResourcePage| {
            page.resources
                .iter()
                .map(|r| r.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&first), names(&second));
    }

    #[tokio::test]
    async fn test_recursive_delete() {
        let storage = MemoryStorage::new();
        let folder = storage.create_folder(None, "d").await.unwrap();
        storage
            .create_file(Some(&folder), "e.txt", Some(b"x"))
            .await
            .unwrap();

        storage.delete(&folder).await.unwrap();

        let page = storage.list(None, 20, None).await.unwrap();
        assert!(page.resources.is_empty());
    }

    #[tokio::test]
    async fn test_rename_folder_moves_children() {
        let storage = MemoryStorage::new();
        let folder = storage.create_folder(None, "old").await.unwrap();
        storage
            .create_file(Some(&folder), "child.txt", Some(b"x"))
            .await
            .unwrap();

        storage.rename_folder(&folder, "new").await.unwrap();

        let renamed = storage.get_folder("new").await.unwrap();
        assert!(storage.find_file("child.txt", Some(&renamed)).await.is_ok());
        assert!(matches!(
            storage.get_folder("old").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_cursor_is_rejected() {
        let storage = MemoryStorage::new();
        let result = storage.list(None, 10, Some("not-a-number")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
