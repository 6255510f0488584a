//! Yandex Disk wire models.

use serde::Deserialize;

/// Resource metadata, optionally with one page of embedded children.
#[derive(Debug, Deserialize)]
pub struct ResourcesResponse {
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<Embedded>,
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: Option<ItemKind>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
}

/// One page of a folder's children.
#[derive(Debug, Deserialize)]
pub struct Embedded {
    pub items: Vec<ResourceItem>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// A single child entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub created: String,
    pub modified: String,
    /// Direct download URL (files only).
    #[serde(default)]
    pub file: Option<String>,
    /// Preview URL (files only).
    #[serde(default)]
    pub preview: Option<String>,
}

/// Backend directory marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Dir,
    File,
}

/// Response of the download-href metadata call.
#[derive(Debug, Deserialize)]
pub struct DownloadResponse {
    pub href: String,
}

/// Response of the upload-href metadata call.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub operation_id: Option<String>,
    pub href: String,
    pub method: String,
    #[serde(default)]
    pub templated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_deserialization() {
        let json = r#"{
            "_embedded": {
                "items": [
                    {
                        "name": "docs",
                        "path": "disk:/docs",
                        "type": "dir",
                        "created": "2025-04-05T10:00:00+00:00",
                        "modified": "2025-04-05T10:00:00+00:00"
                    },
                    {
                        "name": "a.txt",
                        "path": "disk:/a.txt",
                        "type": "file",
                        "created": "2025-04-05T10:00:00+00:00",
                        "modified": "2025-04-06T10:00:00+00:00",
                        "file": "https://downloader.disk.yandex.ru/a.txt",
                        "preview": "https://downloader.disk.yandex.ru/a-preview.png"
                    }
                ],
                "total": 2
            },
            "path": "disk:/",
            "type": "dir"
        }"#;

        let response: ResourcesResponse = serde_json::from_str(json).unwrap();
        let embedded = response.embedded.unwrap();

        assert_eq!(embedded.items.len(), 2);
        assert_eq!(embedded.items[0].kind, ItemKind::Dir);
        assert_eq!(embedded.items[1].kind, ItemKind::File);
        assert!(embedded.items[1].file.is_some());
        assert_eq!(response.kind, Some(ItemKind::Dir));
    }

    #[test]
    fn test_file_metadata_has_no_embedded_listing() {
        let json = r#"{"path": "disk:/a.txt", "type": "file"}"#;
        let response: ResourcesResponse = serde_json::from_str(json).unwrap();

        assert!(response.embedded.is_none());
        assert_eq!(response.kind, Some(ItemKind::File));
    }

    #[test]
    fn test_upload_response_deserialization() {
        let json = r#"{
            "operation_id": "op-1",
            "href": "https://uploader.disk.yandex.ru/upload-target",
            "method": "PUT",
            "templated": false
        }"#;

        let response: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.method, "PUT");
        assert_eq!(response.operation_id.as_deref(), Some("op-1"));
    }
}
