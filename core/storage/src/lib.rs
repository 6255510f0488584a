//! Storage backend abstraction for omnidisk.
//!
//! This crate provides one uniform hierarchical-storage contract over three
//! very different backends: a sandboxed local directory, Google Drive
//! (ID-addressed, cursor-paginated), and Yandex Disk (path-addressed,
//! offset-paginated). Remote backends talk through an authenticated request
//! wrapper that injects the stored credential and retries once after a
//! token refresh.
//!
//! # Design Principles
//! - Backend isolation: callers only see the `FileStorage` trait
//! - Async operations: all I/O is async
//! - One pagination primitive: `list` with an opaque cursor
//! - Unified error semantics across backends

pub mod auth;
pub mod backend;
pub mod factory;
pub mod gdrive;
pub mod local;
pub mod memory;
pub mod paths;
pub mod token;
pub mod yandex;

pub use auth::{AuthScheme, AuthorizedClient, TokenRefresher};
pub use backend::{FileStorage, ResourcePage, DEFAULT_LIST_LIMIT};
pub use factory::{StorageConfig, StorageFactory, TokenKind};
pub use gdrive::{GoogleAuthConfig, GoogleDriveStorage, GoogleTokenRefresher};
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use token::{
    KeyValueStore, MemoryKeyValueStore, StoredToken, TokenStore, GOOGLE_DRIVE_TOKEN_KEY,
    YANDEX_DISK_TOKEN_KEY,
};
pub use yandex::YandexDiskStorage;
