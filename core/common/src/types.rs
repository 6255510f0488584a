//! The resource value type exposed by every storage backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What a resource is: a directory, or a file with its download link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A folder that may contain further resources.
    Dir,
    /// A regular file.
    File {
        /// Backend-provided download or viewer URL ("" when the backend
        /// resolves download links lazily).
        url: String,
        /// Optional preview/thumbnail URL.
        preview_url: Option<String>,
    },
}

/// A file or folder exposed through the uniform storage contract.
///
/// Immutable snapshot: adapters create instances, callers discard them. The
/// `path` uniquely addresses the resource within one backend at one point in
/// time; `id` is authoritative for ID-based backends and synthesized
/// (random) for path-based ones. `modified` carries the backend's raw
/// timestamp text and is not normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageResource {
    /// Backend-assigned identifier, or a generated UUID where the backend
    /// addresses by path.
    pub id: String,
    /// Leaf name of the resource.
    pub name: String,
    /// Backend-relative slash-separated path, without backend prefixes.
    pub path: String,
    /// Directory or file.
    pub kind: ResourceKind,
    /// Last-modified timestamp in the backend's own format ("" if unknown).
    pub modified: String,
}

impl StorageResource {
    /// Create a resource with a freshly generated id.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        kind: ResourceKind,
        modified: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, path, kind, modified)
    }

    /// Create a resource with a backend-assigned id.
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        kind: ResourceKind,
        modified: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            kind,
            modified: modified.into(),
        }
    }

    /// Whether this resource is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self.kind, ResourceKind::File { .. })
    }

    /// Whether this resource is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, ResourceKind::Dir)
    }
}

impl fmt::Display for StorageResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.id)
    }
}
