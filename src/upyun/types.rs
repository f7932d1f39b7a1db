//! UpYun types and completion structures

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::upyun::error::UpYunError;

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Entry name, relative to the listed directory
    pub name: String,
    pub is_folder: bool,
    /// Size in bytes (0 for folders)
    pub size: u64,
    /// Last modified time
    pub modified_at: DateTime<Utc>,
}

/// Metadata returned by a stat (HEAD) request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// "file" or "folder"
    pub kind: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Picture metadata returned after uploading to an image space
///
/// Non-picture uploads leave every field at its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicInfo {
    /// Image format, e.g. "JPEG" or "PNG"
    pub format: String,
    pub width: u64,
    pub height: u64,
    pub frames: u64,
}

/// Logical operation a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    BucketUsage,
    MakeDir,
    RemoveDir,
    List,
    Upload,
    Download,
    RemoveFile,
    Stat,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::BucketUsage => "bucket_usage",
            OperationKind::MakeDir => "mkdir",
            OperationKind::RemoveDir => "rmdir",
            OperationKind::List => "list",
            OperationKind::Upload => "upload",
            OperationKind::Download => "download",
            OperationKind::RemoveFile => "remove_file",
            OperationKind::Stat => "stat",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque correlation id for one issued request
///
/// Ids come from a per-client counter and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl RequestId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Typed result of a successful request, one variant per operation kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Bytes used by the bucket
    BucketUsage(u64),
    /// Directory created (empty reply body)
    MakeDir(bool),
    RemoveDir(bool),
    List(Vec<ItemInfo>),
    Upload { success: bool, pic: PicInfo },
    Download(Bytes),
    RemoveFile(bool),
    Stat(FileInfo),
}

impl Outcome {
    pub fn kind(&self) -> OperationKind {
        match self {
            Outcome::BucketUsage(_) => OperationKind::BucketUsage,
            Outcome::MakeDir(_) => OperationKind::MakeDir,
            Outcome::RemoveDir(_) => OperationKind::RemoveDir,
            Outcome::List(_) => OperationKind::List,
            Outcome::Upload { .. } => OperationKind::Upload,
            Outcome::Download(_) => OperationKind::Download,
            Outcome::RemoveFile(_) => OperationKind::RemoveFile,
            Outcome::Stat(_) => OperationKind::Stat,
        }
    }
}

/// Completion event delivered exactly once per issued request
#[derive(Debug)]
pub struct Completion {
    pub id: RequestId,
    pub kind: OperationKind,
    pub outcome: Result<Outcome, UpYunError>,
}

impl Completion {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
