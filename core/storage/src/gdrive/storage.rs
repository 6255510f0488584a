//! `FileStorage` implementation over the Google Drive v3 REST API.

use async_trait::async_trait;
use reqwest::{header, Method};
use uuid::Uuid;

use omnidisk_common::{Error, ResourceKind, Result, StorageResource};

use crate::auth::AuthorizedClient;
use crate::backend::{FileStorage, ResourcePage};
use crate::paths;

use super::api::{self, DriveFile, DriveFileList};

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Google Drive storage backend.
pub struct GoogleDriveStorage {
    client: AuthorizedClient,
    /// Folder ID everything is rooted under (`"root"` for the whole drive).
    root_id: String,
    api_base: String,
    upload_base: String,
}

impl GoogleDriveStorage {
    /// Create a backend rooted at the given parent folder ID.
    pub fn new(client: AuthorizedClient, root_id: impl Into<String>) -> Self {
        Self::with_endpoints(client, root_id, DRIVE_API_BASE, DRIVE_UPLOAD_BASE)
    }

    /// Create a backend against non-default API endpoints.
    pub fn with_endpoints(
        client: AuthorizedClient,
        root_id: impl Into<String>,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            root_id: root_id.into(),
            api_base: api_base.into(),
            upload_base: upload_base.into(),
        }
    }

    /// The folder ID a lookup runs in: the parent's, or the configured root.
    fn folder_id(&self, parent: Option<&StorageResource>) -> String {
        match parent {
            Some(resource) if !resource.path.is_empty() => resource.id.clone(),
            _ => self.root_id.clone(),
        }
    }

    /// First match of a Drive query, if any.
    async fn find_first(&self, query: &str) -> Result<Option<DriveFile>> {
        let request = self
            .client
            .request(Method::GET, &format!("{}/files", self.api_base))
            .query(&[
                ("q", query),
                ("pageSize", "1"),
                ("orderBy", "name"),
                ("fields", api::LIST_FIELDS),
            ]);
        let list: DriveFileList = self.client.fetch_json(request).await?;
        Ok(list.files.into_iter().next())
    }

    /// Walk a slash-separated folder path from the root, component by
    /// component, resolving each name to an ID.
    async fn resolve_folder_path(&self, path: &str) -> Result<String> {
        let mut current = self.root_id.clone();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let folder = self
                .find_first(&api::folder_by_name_query(&current, component))
                .await?
                .ok_or_else(|| Error::NotFound(component.to_string()))?;
            current = folder.id;
        }
        Ok(current)
    }

    fn to_resource(&self, file: DriveFile, parent: Option<&StorageResource>) -> StorageResource {
        let kind = if file.is_folder() {
            ResourceKind::Dir
        } else if file.mime_type.starts_with(api::GOOGLE_APPS_MIME_PREFIX) {
            // Native-editor documents have no binary download; expose the
            // PDF export link, or the editor as a last resort.
            let url = file
                .export_links
                .as_ref()
                .and_then(|links| links.get("application/pdf").cloned())
                .unwrap_or_else(|| {
                    format!("https://docs.google.com/document/d/{}/edit", file.id)
                });
            ResourceKind::File {
                url,
                preview_url: None,
            }
        } else {
            let url = file.web_content_link.clone().unwrap_or_else(|| {
                format!("https://drive.google.com/file/d/{}/view", file.id)
            });
            ResourceKind::File {
                url,
                preview_url: None,
            }
        };

        let path = paths::join(
            parent.map(|p| p.path.as_str()).unwrap_or(""),
            &file.name,
        );
        let modified = file
            .modified_time
            .map(|time| time.to_rfc3339())
            .unwrap_or_default();

        StorageResource::with_id(file.id, file.name, path, kind, modified)
    }
}

#[async_trait]
impl FileStorage for GoogleDriveStorage {
    async fn find_file(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource> {
        let folder_id = self.folder_id(parent);
        let file = self
            .find_first(&api::file_by_name_query(&folder_id, name))
            .await?
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        Ok(self.to_resource(file, parent))
    }

    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource> {
        let folder_id = self.folder_id(parent);
        let folder = self
            .find_first(&api::folder_by_name_query(&folder_id, name))
            .await?
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        Ok(self.to_resource(folder, parent))
    }

    async fn download(&self, resource: &StorageResource) -> Result<Vec<u8>> {
        tracing::debug!("loading data for file id: {}", resource.id);
        let request = self
            .client
            .request(
                Method::GET,
                &format!("{}/files/{}", self.api_base, api::path_segment(&resource.id)),
            )
            .query(&[("alt", "media")]);
        self.client.fetch_bytes(request).await
    }

    async fn get_folder(&self, name: &str) -> Result<StorageResource> {
        let folder = self
            .find_first(&api::folder_by_name_query(&self.root_id, name))
            .await?
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        Ok(self.to_resource(folder, None))
    }

    async fn list(
        &self,
        parent: Option<&StorageResource>,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ResourcePage> {
        tracing::debug!(
            "fetching resources at: {}, limit: {}",
            parent.map(|p| p.path.as_str()).unwrap_or("root"),
            limit
        );

        let query = match parent {
            Some(resource) if !resource.path.is_empty() => api::children_query(&resource.id),
            // Root listing additionally surfaces externally-shared items.
            _ => api::root_query(&self.root_id),
        };

        let limit_text = limit.to_string();
        let mut request = self
            .client
            .request(Method::GET, &format!("{}/files", self.api_base))
            .query(&[
                ("q", query.as_str()),
                ("pageSize", limit_text.as_str()),
                ("orderBy", "name"),
                ("fields", api::LIST_FIELDS),
            ]);
        if let Some(token) = cursor {
            request = request.query(&[("pageToken", token)]);
        }

        let list: DriveFileList = self.client.fetch_json(request).await?;
        let resources = list
            .files
            .into_iter()
            .map(|file| self.to_resource(file, parent))
            .collect();

        Ok(ResourcePage {
            resources,
            next_cursor: list.next_page_token,
        })
    }

    async fn create_folder(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
    ) -> Result<StorageResource> {
        let folder_id = self.folder_id(parent);
        tracing::info!("creating folder {} in {}", name, folder_id);

        if self
            .find_first(&api::folder_by_name_query(&folder_id, name))
            .await?
            .is_some()
        {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": api::FOLDER_MIME_TYPE,
            "parents": [folder_id],
        });
        let request = self
            .client
            .request(Method::POST, &format!("{}/files", self.api_base))
            .query(&[("fields", api::FILE_FIELDS)])
            .json(&metadata);

        let folder: DriveFile = self.client.fetch_json(request).await?;
        Ok(self.to_resource(folder, parent))
    }

    async fn create_file(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
        data: Option<&[u8]>,
    ) -> Result<StorageResource> {
        let folder_id = self.folder_id(parent);
        tracing::info!("creating file {} in {}", name, folder_id);

        if self
            .find_first(&api::file_by_name_query(&folder_id, name))
            .await?
            .is_some()
        {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        let metadata = serde_json::json!({
            "name": name,
            "parents": [folder_id],
        });
        let boundary = format!("omnidiskBoundary{}", Uuid::new_v4().simple());
        let body = api::multipart_related_body(&metadata, data, &boundary);

        let request = self
            .client
            .request(
                Method::POST,
                &format!("{}/files", self.upload_base),
            )
            .query(&[("uploadType", "multipart"), ("fields", api::FILE_FIELDS)])
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);

        let file: DriveFile = self.client.fetch_json(request).await?;
        Ok(self.to_resource(file, parent))
    }

    async fn update_file(&self, resource: &StorageResource, data: &[u8]) -> Result<()> {
        tracing::info!("updating file: {}", resource.path);

        let request = self
            .client
            .request(
                Method::PATCH,
                &format!(
                    "{}/files/{}",
                    self.upload_base,
                    api::path_segment(&resource.id)
                ),
            )
            .query(&[("uploadType", "media")])
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec());

        self.client.execute(request).await?;
        Ok(())
    }

    async fn rename_file(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
        let request = self
            .client
            .request(
                Method::PATCH,
                &format!("{}/files/{}", self.api_base, api::path_segment(&resource.id)),
            )
            .query(&[("fields", api::FILE_FIELDS)])
            .json(&serde_json::json!({ "name": new_name }));

        let _: DriveFile = self.client.fetch_json(request).await?;
        tracing::debug!("renamed file {} to {}", resource.name, new_name);
        Ok(())
    }

    async fn rename_folder(&self, resource: &StorageResource, new_name: &str) -> Result<()> {
        let request = self
            .client
            .request(
                Method::PATCH,
                &format!("{}/files/{}", self.api_base, api::path_segment(&resource.id)),
            )
            .query(&[("fields", api::FILE_FIELDS)])
            .json(&serde_json::json!({ "name": new_name }));

        let _: DriveFile = self.client.fetch_json(request).await?;
        tracing::debug!("renamed folder {} to {}", resource.name, new_name);
        Ok(())
    }

    async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        tracing::info!("moving file from {} to {}", from, to);

        let (from_parent, from_name) = paths::parent_and_leaf(from);
        let from_parent_id = self.resolve_folder_path(from_parent).await?;
        let file = self
            .find_first(&api::file_by_name_query(&from_parent_id, from_name))
            .await?
            .ok_or_else(|| Error::NotFound(from.to_string()))?;

        let (to_parent, to_name) = paths::parent_and_leaf(to);
        let to_parent_id = self.resolve_folder_path(to_parent).await?;

        let request = self
            .client
            .request(
                Method::PATCH,
                &format!("{}/files/{}", self.api_base, api::path_segment(&file.id)),
            )
            .query(&[
                ("addParents", to_parent_id.as_str()),
                ("removeParents", from_parent_id.as_str()),
                ("fields", api::FILE_FIELDS),
            ])
            .json(&serde_json::json!({ "name": to_name }));

        let _: DriveFile = self.client.fetch_json(request).await?;
        Ok(())
    }

    async fn delete(&self, resource: &StorageResource) -> Result<()> {
        tracing::info!("deleting item: {}", resource.path);
        let request = self.client.request(
            Method::DELETE,
            &format!("{}/files/{}", self.api_base, api::path_segment(&resource.id)),
        );
        self.client.execute(request).await?;
        Ok(())
    }

    /// Signs the user out; remote content is left untouched.
    async fn delete_all(&self) -> Result<()> {
        tracing::warn!("signing out of Google Drive");
        self.client.tokens().remove_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthScheme;
    use crate::token::{MemoryKeyValueStore, StoredToken, TokenStore};
    use std::sync::Arc;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authed_client() -> AuthorizedClient {
        let tokens = StoredToken::new("TestTokenKey", Arc::new(MemoryKeyValueStore::new()));
        tokens.save_token("test-token").unwrap();
        AuthorizedClient::new(
            reqwest::Client::new(),
            AuthScheme::Bearer,
            Arc::new(tokens),
            None,
        )
    }

    fn storage(server: &MockServer) -> GoogleDriveStorage {
        GoogleDriveStorage::with_endpoints(authed_client(), "root-id", server.uri(), server.uri())
    }

    fn file_json(id: &str, name: &str, mime: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": name,
            "mimeType": mime,
            "modifiedTime": "2025-07-11T09:30:00Z",
        })
    }

    #[tokio::test]
    async fn test_list_maps_files_and_cursor() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("q", api::root_query("root-id")))
            .and(query_param("pageSize", "2"))
            .and(query_param("orderBy", "name"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [
                    file_json("f1", "docs", api::FOLDER_MIME_TYPE),
                    file_json("f2", "a.txt", "text/plain"),
                ],
                "nextPageToken": "token-2",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = storage(&server).list(None, 2, None).await.unwrap();

        assert_eq!(page.next_cursor.as_deref(), Some("token-2"));
        assert_eq!(page.resources.len(), 2);
        assert!(page.resources[0].is_dir());
        assert!(page.resources[1].is_file());
        assert_eq!(page.resources[1].path, "a.txt");
    }

    #[tokio::test]
    async fn test_list_in_folder_passes_page_token() {
        let server = MockServer::start().await;
        let parent = StorageResource::with_id("dir-1", "docs", "docs", ResourceKind::Dir, "");

        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("q", api::children_query("dir-1")))
            .and(query_param("pageToken", "token-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [file_json("f3", "b.txt", "text/plain")],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = storage(&server)
            .list(Some(&parent), 20, Some("token-2"))
            .await
            .unwrap();

        assert!(page.next_cursor.is_none());
        assert_eq!(page.resources[0].path, "docs/b.txt");
    }

    #[tokio::test]
    async fn test_native_document_maps_to_export_link() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [{
                    "id": "doc-1",
                    "name": "notes",
                    "mimeType": "application/vnd.google-apps.document",
                    "exportLinks": {"application/pdf": "https://export.example/doc-1.pdf"},
                }],
            })))
            .mount(&server)
            .await;

        let page = storage(&server).list(None, 20, None).await.unwrap();

        match &page.resources[0].kind {
            ResourceKind::File { url, .. } => {
                assert_eq!(url, "https://export.example/doc-1.pdf")
            }
            other => panic!("expected file, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_find_file_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"files": []})),
            )
            .mount(&server)
            .await;

        let result = storage(&server).find_file("missing.txt", None).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_file_rejects_duplicates_before_uploading() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("q", api::file_by_name_query("root-id", "a.txt")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [file_json("f1", "a.txt", "text/plain")],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = storage(&server).create_file(None, "a.txt", Some(b"x")).await;
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
        // No POST reached the server.
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_file_uploads_multipart() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"files": []})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .and(query_param("uploadType", "multipart"))
            .and(body_string_contains("\"name\":\"a.txt\""))
            .and(body_string_contains("payload"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(file_json("f9", "a.txt", "text/plain")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let file = storage(&server)
            .create_file(None, "a.txt", Some(b"payload"))
            .await
            .unwrap();

        assert_eq!(file.id, "f9");
        assert!(file.is_file());
    }

    #[tokio::test]
    async fn test_update_file_uses_media_upload() {
        let server = MockServer::start().await;
        let resource = StorageResource::with_id(
            "f1",
            "a.txt",
            "a.txt",
            ResourceKind::File {
                url: String::new(),
                preview_url: None,
            },
            "",
        );

        Mock::given(method("PATCH"))
            .and(path("/files/f1"))
            .and(query_param("uploadType", "media"))
            .and(body_string_contains("new-bytes"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        storage(&server)
            .update_file(&resource, b"new-bytes")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_move_file_resolves_parents_and_patches() {
        let server = MockServer::start().await;

        // Resolve destination folder "sub" under the root.
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("q", api::folder_by_name_query("root-id", "sub")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [file_json("sub-id", "sub", api::FOLDER_MIME_TYPE)],
            })))
            .expect(1)
            .mount(&server)
            .await;
        // Locate the source file at the root.
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("q", api::file_by_name_query("root-id", "a.txt")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [file_json("f1", "a.txt", "text/plain")],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/files/f1"))
            .and(query_param("addParents", "sub-id"))
            .and(query_param("removeParents", "root-id"))
            .and(body_string_contains("\"name\":\"a.txt\""))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(file_json("f1", "a.txt", "text/plain")),
            )
            .expect(1)
            .mount(&server)
            .await;

        storage(&server).move_file("a.txt", "sub/a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_targets_file_id() {
        let server = MockServer::start().await;
        let resource = StorageResource::with_id("f1", "a.txt", "a.txt", ResourceKind::Dir, "");

        Mock::given(method("DELETE"))
            .and(path("/files/f1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        storage(&server).delete(&resource).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_all_signs_out() {
        let server = MockServer::start().await;
        let tokens = StoredToken::new("TestTokenKey", Arc::new(MemoryKeyValueStore::new()));
        tokens.save_token("test-token").unwrap();
        let tokens = Arc::new(tokens);
        let client = AuthorizedClient::new(
            reqwest::Client::new(),
            AuthScheme::Bearer,
            tokens.clone(),
            None,
        );
        let storage =
            GoogleDriveStorage::with_endpoints(client, "root-id", server.uri(), server.uri());

        storage.delete_all().await.unwrap();

        assert!(tokens.token().is_none());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
