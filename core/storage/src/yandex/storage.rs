//! `FileStorage` implementation over the Yandex Disk REST API.

use async_trait::async_trait;
use reqwest::Method;

use omnidisk_common::{Error, ResourceKind, Result, StorageResource};

use crate::auth::AuthorizedClient;
use crate::backend::{FileStorage, ResourcePage};
use crate::paths;

use super::api::{DownloadResponse, ItemKind, ResourceItem, ResourcesResponse, UploadResponse};

/// Yandex Disk API base URL.
const DISK_API_BASE: &str = "https://cloud-api.yandex.net/v1/disk";

/// Page size used when paging internally for exact-name lookups.
const LOOKUP_PAGE_LIMIT: usize = 100;

/// Yandex Disk storage backend.
pub struct YandexDiskStorage {
    client: AuthorizedClient,
    /// Absolute Disk path everything is rooted under.
    root_path: String,
    base_url: String,
}

impl YandexDiskStorage {
    /// Create a backend rooted at the given absolute Disk path.
    pub fn new(client: AuthorizedClient, root_path: impl Into<String>) -> Self {
        Self::with_endpoint(client, root_path, DISK_API_BASE)
    }

    /// Create a backend against a non-default API endpoint.
    pub fn with_endpoint(
        client: AuthorizedClient,
        root_path: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            root_path: root_path.into(),
            base_url: base_url.into(),
        }
    }

    /// Prefix the configured root onto a backend-relative path.
    fn full_path(&self, relative: &str) -> String {
        if relative.is_empty() {
            return self.root_path.clone();
        }
        let cleaned = relative.replace("disk:/", "");
        let full = if cleaned.starts_with(&self.root_path) {
            cleaned
        } else {
            format!("{}/{}", self.root_path, cleaned)
        };
        paths::collapse_separators(&full)
    }

    /// Strip the `disk:` scheme and the configured root from a remote path.
    fn relative_path(&self, remote: &str) -> String {
        let without_scheme = remote.strip_prefix("disk:").unwrap_or(remote);
        let without_root = without_scheme
            .strip_prefix(&self.root_path)
            .unwrap_or(without_scheme);
        without_root.trim_start_matches('/').to_string()
    }

    fn parent_path(parent: Option<&StorageResource>) -> &str {
        parent.map(|resource| resource.path.as_str()).unwrap_or("")
    }

    fn to_resource(&self, item: ResourceItem) -> StorageResource {
        let path = self.relative_path(&item.path);
        let kind = match item.kind {
            ItemKind::Dir => ResourceKind::Dir,
            ItemKind::File => ResourceKind::File {
                url: item.file.unwrap_or_default(),
                preview_url: item.preview,
            },
        };
        StorageResource::new(item.name, path, kind, item.modified)
    }

    /// Resolve the signed download href for a backend-relative path.
    async fn download_href(&self, relative: &str) -> Result<String> {
        let full = self.full_path(relative);
        tracing::debug!("generating download URL for: {}", full);

        let request = self
            .client
            .request(Method::GET, &format!("{}/resources/download", self.base_url))
            .query(&[("path", full.as_str())]);
        let response: DownloadResponse = self.client.fetch_json(request).await?;

        url::Url::parse(&response.href)
            .map_err(|_| Error::InvalidPath(format!("invalid download URL: {}", response.href)))?;
        Ok(response.href)
    }

    /// Upload content to a backend-relative path via a signed href.
    ///
    /// The metadata call fails with a conflict when the target exists.
    async fn create_file_at(
        &self,
        relative: &str,
        data: Option<&[u8]>,
    ) -> Result<StorageResource> {
        let full = self.full_path(relative);
        tracing::info!("creating file at: {}", full);

        let (_, leaf) = paths::parent_and_leaf(relative);
        let request = self
            .client
            .request(Method::GET, &format!("{}/resources/upload", self.base_url))
            .query(&[("path", full.as_str())]);
        let upload: UploadResponse = self.client.fetch_json(request).await.map_err(|e| match e {
            Error::AlreadyExists(_) => Error::AlreadyExists(leaf.to_string()),
            other => other,
        })?;

        url::Url::parse(&upload.href)
            .map_err(|_| Error::InvalidPath(format!("invalid upload URL: {}", upload.href)))?;
        let method = Method::from_bytes(upload.method.to_uppercase().as_bytes())
            .map_err(|_| Error::Transport(format!("unsupported upload method: {}", upload.method)))?;

        let request = self
            .client
            .request(method, &upload.href)
            .body(data.unwrap_or_default().to_vec());
        self.client.execute(request).await?;

        Ok(StorageResource::new(
            leaf,
            relative,
            ResourceKind::File {
                url: String::new(),
                preview_url: None,
            },
            "",
        ))
    }

    /// Move a resource within the Disk, overwriting the destination.
    async fn move_path(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.full_path(from);
        let to_path = self.full_path(to);
        tracing::info!("moving {} to {}", from_path, to_path);

        let request = self
            .client
            .request(Method::POST, &format!("{}/resources/move", self.base_url))
            .query(&[
                ("from", from_path.as_str()),
                ("path", to_path.as_str()),
                ("overwrite", "true"),
                ("force_async", "false"),
            ]);
        self.client.execute(request).await?;
        Ok(())
    }
}

#[async_trait]
impl FileStorage for YandexDiskStorage {
    async fn find_file(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource> {
        // No server-side exact lookup; page through the folder.
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .list(parent, LOOKUP_PAGE_LIMIT, cursor.as_deref())
                .await?;
            if let Some(found) = page
                .resources
                .iter()
                .find(|resource| resource.name == name && resource.is_file())
            {
                return Ok(found.clone());
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Err(Error::NotFound(name.to_string())),
            }
        }
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource> {
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .list(parent, LOOKUP_PAGE_LIMIT, cursor.as_deref())
                .await?;
            if let Some(found) = page
                .resources
                .iter()
                .find(|resource| resource.name == name && resource.is_dir())
            {
                return Ok(found.clone());
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Err(Error::NotFound(name.to_string())),
            }
        }
    }

    async fn download(&self, resource: &StorageResource) -> Result<Vec<u8>> {
        tracing::debug!("loading data for: {}", resource.path);
        let href = self.download_href(&resource.path).await?;
        let request = self.client.request(Method::GET, &href);
        self.client.fetch_bytes(request).await
    }

    async fn get_folder(&self, name: &str) -> Result<StorageResource> {
        let full = self.full_path(name);
        let request = self
            .client
            .request(Method::GET, &format!("{}/resources", self.base_url))
            .query(&[("path", full.as_str()), ("limit", "1")]);

        let metadata: ResourcesResponse =
            self.client.fetch_json(request).await.map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound(name.to_string()),
                other => other,
            })?;

        if metadata.kind == Some(ItemKind::File) {
            return Err(Error::InvalidPath(format!("not a folder: {}", name)));
        }

        Ok(StorageResource::new(
            name,
            name,
            ResourceKind::Dir,
            metadata.modified.unwrap_or_default(),
        ))
    }

    async fn list(
        &self,
        parent: Option<&StorageResource>,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ResourcePage> {
        let request_path = self.full_path(Self::parent_path(parent));
        let offset: usize = match cursor {
            None => 0,
            Some(value) => value
                .parse()
                .map_err(|_| Error::InvalidInput(format!("invalid listing cursor: {}", value)))?,
        };
        tracing::debug!(
            "fetching resources at: {}, limit: {}, offset: {}",
            request_path,
            limit,
            offset
        );

        let limit_text = limit.to_string();
        let offset_text = offset.to_string();
        let request = self
            .client
            .request(Method::GET, &format!("{}/resources", self.base_url))
            .query(&[
                ("path", request_path.as_str()),
                ("limit", limit_text.as_str()),
                ("offset", offset_text.as_str()),
            ]);

        let response: ResourcesResponse = self.client.fetch_json(request).await?;
        let items = response
            .embedded
            .map(|embedded| embedded.items)
            .unwrap_or_default();

        // The next offset is computed locally; a short page ends the listing.
        let next_cursor = if items.len() < limit {
            None
        } else {
            Some((offset + limit).to_string())
        };
        let resources = items
            .into_iter()
            .map(|item| self.to_resource(item))
            .collect();

        Ok(ResourcePage {
            resources,
            next_cursor,
        })
    }

    async fn create_folder(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
    ) -> Result<StorageResource> {
        let relative = paths::join(Self::parent_path(parent), name);
        let full = self.full_path(&relative);
        tracing::info!("creating folder at: {}", full);

        let request = self
            .client
            .request(Method::PUT, &format!("{}/resources", self.base_url))
            .query(&[("path", full.as_str())]);
        self.client.execute(request).await.map_err(|e| match e {
            Error::AlreadyExists(_) => Error::AlreadyExists(name.to_string()),
            other => other,
        })?;

        Ok(StorageResource::new(name, relative, ResourceKind::Dir, ""))
    }

    async fn create_file(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
        data: Option<&[u8]>,
    ) -> Result<StorageResource> {
        let relative = paths::join(Self::parent_path(parent), name);
        self.create_file_at(&relative, data).await
    }

    async fn update_file(&self, resource: &StorageResource, data: &[u8]) -> Result<()> {
        tracing::info!("updating file at: {}", resource.path);

        // No overwrite-in-place primitive: upload to a temporary sibling and
        // swap it over the destination. Not transactional.
        let temporary = format!("{}_tmp", resource.path);
        self.create_file_at(&temporary, Some(data)).await?;
        self.move_path(&temporary, &resource.path).await
    }

    async fn rename_file(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
        let (parent, _) = paths::parent_and_leaf(&resource.path);
        let destination = paths::join(parent, new_name);
        self.move_path(&resource.path, &destination).await?;
        tracing::debug!("renamed file {} to {}", resource.name, new_name);
        Ok(())
    }

    async fn rename_folder(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
        let (parent, _) = paths::parent_and_leaf(&resource.path);
        let destination = paths::join(parent, new_name);
        self.move_path(&resource.path, &destination).await?;
        tracing::debug!("renamed folder {} to {}", resource.name, new_name);
        Ok(())
    }

    async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        self.move_path(from, to).await
    }

    async fn delete(&self, resource: &StorageResource) -> Result<()> {
        let full = self.full_path(&resource.path);
        tracing::warn!("deleting item at: {}", full);

        let mut query = vec![("path", full.clone())];
        if resource.is_dir() {
            query.push(("recursive", "true".to_string()));
        }
        let request = self
            .client
            .request(Method::DELETE, &format!("{}/resources", self.base_url))
            .query(&query);
        self.client.execute(request).await?;
        Ok(())
    }

    /// Signs the user out; remote content is left untouched.
    async fn delete_all(&self) -> Result<()> {
        tracing::warn!("signing out of Yandex Disk");
        self.client.tokens().remove_token()
    }
}
