//! Extension interfaces understood by the daemon.
//!
//! [`RpcService`] providers become reachable as `<service>.<procedure>`. The
//! file transfer interfaces are discovery hooks for transfer collaborators;
//! the daemon itself only activates their providers.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use switchboard_plugins::{Interface, InterfaceId};
use switchboard_rpc::{CallError, ServiceBundle};

/// Providers of RPC service bundles.
#[derive(Debug, Clone, Copy)]
pub struct RpcService;

impl Interface for RpcService {
    type Object = dyn ServiceBundle;
    const ID: InterfaceId = InterfaceId::new("switchboard.rpc-service");
}

/// Custom handling for file downloads.
pub trait DownloadProvider: Send + Sync {
    /// Returns `true` when this provider serves `tail` under `head`.
    fn handles(&self, head: &str, tail: &str) -> bool;

    /// Bytes to send for the requested path.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] reported to the client unchanged.
    fn download(&self, head: &str, tail: &str, root: &Utf8Path) -> Result<Vec<u8>, CallError>;
}

/// Providers of [`DownloadProvider`].
#[derive(Debug, Clone, Copy)]
pub struct Downloads;

impl Interface for Downloads {
    type Object = dyn DownloadProvider;
    const ID: InterfaceId = InterfaceId::new("switchboard.download");
}

/// Custom handling for file uploads.
pub trait UploadProvider: Send + Sync {
    /// Returns `true` when this provider accepts `tail` under `head`.
    fn handles(&self, head: &str, tail: &str) -> bool;

    /// Stores uploaded bytes for the requested path.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] reported to the client unchanged.
    fn upload(&self, head: &str, tail: &str, data: &[u8], root: &Utf8Path)
    -> Result<(), CallError>;
}

/// Providers of [`UploadProvider`].
#[derive(Debug, Clone, Copy)]
pub struct Uploads;

impl Interface for Uploads {
    type Object = dyn UploadProvider;
    const ID: InterfaceId = InterfaceId::new("switchboard.upload");
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Entry name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Whether the entry is read-only.
    pub readonly: bool,
}

/// Custom directory listings.
pub trait DirectoryLister: Send + Sync {
    /// Returns `true` when this provider lists `tail` under `head`.
    fn handles(&self, head: &str, tail: &str) -> bool;

    /// Entries of the requested directory.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] reported to the client unchanged.
    fn list_dir(
        &self,
        head: &str,
        tail: &str,
        root: &Utf8Path,
    ) -> Result<Vec<DirectoryEntry>, CallError>;
}

/// Providers of [`DirectoryLister`].
#[derive(Debug, Clone, Copy)]
pub struct DirectoryListings;

impl Interface for DirectoryListings {
    type Object = dyn DirectoryLister;
    const ID: InterfaceId = InterfaceId::new("switchboard.list-dir");
}
