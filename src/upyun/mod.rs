//! UpYun client module with request signing and async dispatch
//!
//! This module provides:
//! - UpYun request signing (`UpYun user:md5(...)` authorization)
//! - Non-blocking operations that return a request id immediately
//! - Typed completions demultiplexed by operation kind

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod params;
pub mod path;
pub mod request;
pub mod router;
pub mod signer;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{Credentials, UpYunClient, UploadOptions};
pub use dispatcher::InFlightTable;
pub use error::{Result, UpYunError};
pub use params::{ExtraParams, Rotate, ThumbType};
pub use request::{Endpoint, RequestParts};
pub use signer::UpYunSigner;
pub use transport::{HyperTransport, RawResponse, Transport, TransportOptions};
pub use types::{Completion, FileInfo, ItemInfo, OperationKind, Outcome, PicInfo, RequestId};
