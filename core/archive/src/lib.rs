//! Archive export for omnidisk.
//!
//! Walks any storage backend's resource tree through the public pagination
//! contract and streams every file into one ZIP archive.

pub mod archiver;

pub use archiver::ZipArchiver;
