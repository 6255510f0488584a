//! Backend selection and wiring.

use std::path::PathBuf;
use std::sync::Arc;

use omnidisk_common::Result;

use crate::auth::{AuthScheme, AuthorizedClient, TokenRefresher};
use crate::backend::FileStorage;
use crate::gdrive::{GoogleAuthConfig, GoogleDriveStorage, GoogleTokenRefresher};
use crate::local::LocalStorage;
use crate::token::{KeyValueStore, StoredToken, GOOGLE_DRIVE_TOKEN_KEY, YANDEX_DISK_TOKEN_KEY};
use crate::yandex::YandexDiskStorage;

/// Tagged backend configuration; resolved by the factory, never by runtime
/// type inspection.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Sandboxed local directory.
    Local { root: PathBuf },
    /// Google Drive, rooted at `parent_id` (the whole drive when `None`).
    ///
    /// `auth` enables automatic token refresh; without it an expired
    /// credential surfaces as `NotAuthorized`.
    GoogleDrive {
        api_key: String,
        parent_id: Option<String>,
        auth: Option<GoogleAuthConfig>,
    },
    /// Yandex Disk, rooted at `root_path` (`"/"` when `None`).
    YandexDisk { root_path: Option<String> },
}

/// Which backend a token store belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    GoogleDrive,
    YandexDisk,
}

/// Builds adapters wired with their authenticated client and token store.
pub struct StorageFactory {
    http: reqwest::Client,
    store: Arc<dyn KeyValueStore>,
}

impl StorageFactory {
    /// Create a factory persisting credentials in the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("omnidisk/0.1")
            .build()
            .expect("Failed to create HTTP client");
        Self { http, store }
    }

    /// The backend-scoped token store.
    ///
    /// Exposed separately so an (external) sign-in flow can persist a
    /// credential before an adapter is built.
    pub fn token_store(&self, kind: TokenKind) -> StoredToken {
        match kind {
            TokenKind::GoogleDrive => {
                StoredToken::new(GOOGLE_DRIVE_TOKEN_KEY, self.store.clone())
            }
            TokenKind::YandexDisk => StoredToken::new(YANDEX_DISK_TOKEN_KEY, self.store.clone()),
        }
    }

    /// Build the adapter for a backend configuration.
    pub fn make(&self, config: StorageConfig) -> Result<Arc<dyn FileStorage>> {
        match config {
            StorageConfig::Local { root } => Ok(Arc::new(LocalStorage::new(root)?)),
            StorageConfig::GoogleDrive {
                api_key,
                parent_id,
                auth,
            } => {
                let tokens = Arc::new(self.token_store(TokenKind::GoogleDrive));
                let refresher = match auth {
                    Some(auth) => Some(Arc::new(GoogleTokenRefresher::new(
                        auth,
                        self.http.clone(),
                    )?) as Arc<dyn TokenRefresher>),
                    None => None,
                };
                let client = AuthorizedClient::new(
                    self.http.clone(),
                    AuthScheme::Bearer,
                    tokens,
                    refresher,
                )
                .with_query("apiKey", api_key);
                Ok(Arc::new(GoogleDriveStorage::new(
                    client,
                    parent_id.unwrap_or_else(|| "root".to_string()),
                )))
            }
            StorageConfig::YandexDisk { root_path } => {
                let tokens = Arc::new(self.token_store(TokenKind::YandexDisk));
                let client =
                    AuthorizedClient::new(self.http.clone(), AuthScheme::OAuth, tokens, None);
                Ok(Arc::new(YandexDiskStorage::new(
                    client,
                    root_path.unwrap_or_else(|| "/".to_string()),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{MemoryKeyValueStore, TokenStore};
    use tempfile::TempDir;

    fn factory() -> StorageFactory {
        StorageFactory::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn test_make_local_backend() {
        let temp = TempDir::new().unwrap();
        let storage = factory()
            .make(StorageConfig::Local {
                root: temp.path().to_path_buf(),
            })
            .unwrap();

        storage.create_file(None, "a.txt", Some(b"x")).await.unwrap();
        assert!(storage.find_file("a.txt", None).await.is_ok());
    }

    #[test]
    fn test_make_remote_backends() {
        let factory = factory();

        assert!(factory
            .make(StorageConfig::GoogleDrive {
                api_key: "key".to_string(),
                parent_id: None,
                auth: None,
            })
            .is_ok());
        assert!(factory
            .make(StorageConfig::YandexDisk { root_path: None })
            .is_ok());
    }

    #[test]
    fn test_token_stores_are_backend_scoped() {
        let factory = factory();

        factory
            .token_store(TokenKind::GoogleDrive)
            .save_token("g")
            .unwrap();
        factory
            .token_store(TokenKind::YandexDisk)
            .save_token("y")
            .unwrap();

        assert_eq!(
            factory.token_store(TokenKind::GoogleDrive).token().as_deref(),
            Some("g")
        );
        assert_eq!(
            factory.token_store(TokenKind::YandexDisk).token().as_deref(),
            Some("y")
        );
    }
}
