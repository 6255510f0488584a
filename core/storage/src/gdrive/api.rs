//! Google Drive wire models and query-language helpers.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;
use std::collections::HashMap;

/// MIME type marking a Drive folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
/// Prefix of native-editor document MIME types (Docs, Sheets, ...).
pub const GOOGLE_APPS_MIME_PREFIX: &str = "application/vnd.google-apps.";

/// Fields requested for a single file response.
pub const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,size,webContentLink,exportLinks";
/// Fields requested for a listing response.
pub const LIST_FIELDS: &str =
    "files(id,name,mimeType,modifiedTime,size,webContentLink,exportLinks),nextPageToken";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'%');

/// Percent-encode a value for embedding as one URL path segment.
pub fn path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Escape an untrusted name for embedding in a single-quoted query literal.
pub fn escape_name(name: &str) -> String {
    name.replace('\'', "\\'")
}

/// Query: all non-trashed children of a folder.
pub fn children_query(folder_id: &str) -> String {
    format!("'{}' in parents and trashed = false", folder_id)
}

/// Query: root children plus externally-shared items.
pub fn root_query(root_id: &str) -> String {
    format!(
        "(('{}' in parents) or (sharedWithMe = true)) and trashed = false",
        root_id
    )
}

/// Query: exact-name, non-directory child.
pub fn file_by_name_query(folder_id: &str, name: &str) -> String {
    format!(
        "'{}' in parents and name = '{}' and mimeType != '{}' and trashed = false",
        folder_id,
        escape_name(name),
        FOLDER_MIME_TYPE
    )
}

/// Query: exact-name, directory-typed child.
pub fn folder_by_name_query(folder_id: &str, name: &str) -> String {
    format!(
        "'{}' in parents and name = '{}' and mimeType = '{}' and trashed = false",
        folder_id,
        escape_name(name),
        FOLDER_MIME_TYPE
    )
}

/// Drive file metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    /// Size in bytes as decimal text (absent for folders).
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub web_content_link: Option<String>,
    /// Export links for native-editor documents, keyed by MIME type.
    #[serde(default)]
    pub export_links: Option<HashMap<String, String>>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileList {
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Build a `multipart/related` upload body: a JSON metadata part followed by
/// an optional binary part.
pub fn multipart_related_body(
    metadata: &serde_json::Value,
    data: Option<&[u8]>,
    boundary: &str,
) -> Vec<u8> {
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(b"\r\n");

    if let Some(data) = data {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}
