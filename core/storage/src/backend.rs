//! The uniform storage contract.

use async_trait::async_trait;

use omnidisk_common::{Error, Result, StorageResource};

/// Page size used when the caller does not specify one.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// One page of a folder listing.
///
/// `next_cursor == None` signals the end of the listing. Cursors are opaque
/// and never portable across backends or across different listing queries.
#[derive(Debug, Clone, Default)]
pub struct ResourcePage {
    /// Resources on this page, at most the requested limit.
    pub resources: Vec<StorageResource>,
    /// Cursor for the next page, if any.
    pub next_cursor: Option<String>,
}

/// Hierarchical storage backend.
///
/// All operations are async and may suspend on network or disk I/O. No
/// operation retries internally; the only retry in the system is the
/// authenticated wrapper's single refresh-and-retry on an authorization
/// failure. `parent == None` always means the backend root.
///
/// # Errors
/// Backend failures surface as the shared error taxonomy: `NotFound`,
/// `AlreadyExists`, `InvalidPath`, `NotAuthorized`, `Transport`, `Io`.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Find an exact-name, non-directory child of `parent`.
    ///
    /// Path-addressed backends implement this by paging through `list` and
    /// matching by name, so the worst case is O(children).
    ///
    /// # Errors
    /// - `NotFound` if no file with that name exists
    async fn find_file(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource>;

    /// Find an exact-name, directory-typed child of `parent`.
    ///
    /// # Errors
    /// - `NotFound` if no folder with that name exists
    async fn find_folder(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource>;

    /// Fetch the full content of a file.
    ///
    /// Path-addressed backends resolve a signed download URL first and then
    /// fetch it, so this may be two network round-trips.
    async fn download(&self, resource: &StorageResource) -> Result<Vec<u8>>;

    /// Resolve a root-relative folder by name.
    ///
    /// # Errors
    /// - `NotFound` if the folder is missing; it is never auto-created
    async fn get_folder(&self, name: &str) -> Result<StorageResource>;

    /// List the immediate children of `parent` (root when `None`).
    ///
    /// `limit` is an upper bound, not a guarantee: a backend may return
    /// fewer entries and still signal more pages. For the ID-addressed
    /// backend, a `None` parent additionally includes externally-shared
    /// items alongside root children; other backends do not replicate that
    /// broadening.
    async fn list(
        &self,
        parent: Option<&StorageResource>,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ResourcePage>;

    /// Create a folder under `parent`.
    ///
    /// # Errors
    /// - `AlreadyExists` if a same-named sibling is present (uniform policy
    ///   across backends)
    async fn create_folder(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
    ) -> Result<StorageResource>;

    /// Create a file under `parent`, optionally with initial content.
    ///
    /// # Errors
    /// - `AlreadyExists` if a same-named file is present (uniform policy
    ///   across backends)
    async fn create_file(
        &self,
        parent: Option<&StorageResource>,
        name: &str,
        data: Option<&[u8]>,
    ) -> Result<StorageResource>;

    /// Overwrite a file's full content.
    ///
    /// Per-backend semantics: local writes in place (falling back to create
    /// if the target vanished); the ID-addressed backend uploads against the
    /// resource's id; the path-addressed backend uploads to a temporary
    /// sibling and swaps it into place with a move, which is not
    /// transactional.
    async fn update_file(&self, resource: &StorageResource, data: &[u8]) -> Result<()>;

    /// Rename a file within its parent directory.
    async fn rename_file(&self, resource: &StorageResource, new_name: &str) -> Result<()>;

    /// Rename a folder within its parent directory.
    async fn rename_folder(&self, resource: &StorageResource, new_name: &str) -> Result<()>;

    /// Move a file across directories by path.
    async fn move_file(&self, from: &str, to: &str) -> Result<()>;

    /// Delete a resource; recursive when it is a directory.
    async fn delete(&self, resource: &StorageResource) -> Result<()>;

    /// Backend-defined reset.
    ///
    /// Deliberately asymmetric: the local backend removes its entire root
    /// tree, while remote backends sign the user out (drop the stored
    /// credential) and leave remote content untouched.
    async fn delete_all(&self) -> Result<()>;

    /// `list` with the default page size and no cursor.
    async fn list_default(&self, parent: Option<&StorageResource>) -> Result<ResourcePage> {
        self.list(parent, DEFAULT_LIST_LIMIT, None).await
    }

    /// Look up a folder by name, creating it only when it is missing.
    ///
    /// Only a `NotFound` lookup result triggers creation; any other lookup
    /// failure (e.g. a transport error) propagates unchanged so a transient
    /// failure never causes a spurious create attempt.
    async fn ensure_folder(
        &self,
        name: &str,
        parent: Option<&StorageResource>,
    ) -> Result<StorageResource> {
        match self.find_folder(name, parent).await {
            Ok(folder) => Ok(folder),
            Err(Error::NotFound(_)) => self.create_folder(parent, name).await,
            Err(err) => Err(err),
        }
    }
}
