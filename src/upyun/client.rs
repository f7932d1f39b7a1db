//! UpYun client: one method per API call
//!
//! Every operation returns a [`RequestId`] as soon as the request has been
//! handed to the transport. Results arrive later as [`Completion`]s, read with
//! [`UpYunClient::next_completion`] or [`UpYunClient::wait`].

use bytes::Bytes;
use hyper::Method;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::upyun::dispatcher::{CompletionQueue, Dispatcher};
use crate::upyun::error::Result;
use crate::upyun::params::ExtraParams;
use crate::upyun::path::{format_dir_path, format_path};
use crate::upyun::request::{Endpoint, RequestParts};
use crate::upyun::signer::{md5_hex, UpYunSigner};
use crate::upyun::transport::{HyperTransport, Transport, TransportOptions};
use crate::upyun::types::{Completion, OperationKind, RequestId};

/// Header marking a PUT as directory creation
const FOLDER_HEADER: &str = "folder";
const CONTENT_MD5: &str = "Content-MD5";
const CONTENT_SECRET: &str = "Content-Secret";

/// Bucket and operator credentials
///
/// The password is hashed on construction; only the hash is kept.
#[derive(Debug, Clone)]
pub struct Credentials {
    bucket: String,
    signer: UpYunSigner,
}

impl Credentials {
    pub fn new(bucket: impl Into<String>, user_name: impl Into<String>, password: &str) -> Self {
        Self {
            bucket: bucket.into(),
            signer: UpYunSigner::new(user_name, password),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn user_name(&self) -> &str {
        self.signer.user_name()
    }
}

/// Options for an upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Create missing parent directories
    pub auto_mkdir: bool,
    /// Send the body's MD5 so the server can reject corrupted uploads (406)
    pub append_md5: bool,
    /// Secret suffix protecting direct access to images
    pub secret: Option<String>,
    pub params: ExtraParams,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_mkdir(mut self, auto_mkdir: bool) -> Self {
        self.auto_mkdir = auto_mkdir;
        self
    }

    pub fn with_md5(mut self, append_md5: bool) -> Self {
        self.append_md5 = append_md5;
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_params(mut self, params: ExtraParams) -> Self {
        self.params = params;
        self
    }
}

/// Asynchronous UpYun client for one bucket
pub struct UpYunClient {
    bucket: String,
    dispatcher: Dispatcher,
    completions: Mutex<CompletionQueue>,
}

impl UpYunClient {
    /// Create a client using the default hyper transport
    ///
    /// Must be called from within a tokio runtime; requests are spawned on it.
    pub fn new(credentials: Credentials, endpoint: Endpoint) -> Result<Self> {
        Self::with_transport(
            credentials,
            endpoint,
            Arc::new(HyperTransport::new(TransportOptions::default())),
        )
    }

    /// Create a client with custom transport settings
    pub fn with_options(
        credentials: Credentials,
        endpoint: Endpoint,
        options: TransportOptions,
    ) -> Result<Self> {
        Self::with_transport(credentials, endpoint, Arc::new(HyperTransport::new(options)))
    }

    /// Create a client on top of any [`Transport`]
    pub fn with_transport(
        credentials: Credentials,
        endpoint: Endpoint,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let Credentials { bucket, signer } = credentials;
        let (dispatcher, queue) = Dispatcher::new(transport, signer, endpoint)?;
        Ok(Self {
            bucket,
            dispatcher,
            completions: Mutex::new(queue),
        })
    }

    /// Library version
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn user_name(&self) -> &str {
        self.dispatcher.signer().user_name()
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.dispatcher.endpoint()
    }

    /// Switch the API endpoint for requests issued from now on
    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        debug!(bucket = %self.bucket, endpoint = %endpoint, "endpoint changed");
        self.dispatcher.set_endpoint(endpoint);
    }

    /// Number of requests issued but not yet completed
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight().len()
    }

    /// Query bytes used by the bucket
    pub fn bucket_usage(&self) -> Result<RequestId> {
        let uri = format!("{}?usage", format_path(&self.bucket, "/"));
        self.issue(RequestParts::new(Method::GET, uri), OperationKind::BucketUsage)
    }

    /// Create a directory
    pub fn mkdir(&self, path: &str, auto_mkdir: bool) -> Result<RequestId> {
        let parts = RequestParts::new(Method::PUT, format_path(&self.bucket, path))
            .with_auto_mkdir(auto_mkdir)
            .with_params(ExtraParams::new().with(FOLDER_HEADER, "true"));
        self.issue(parts, OperationKind::MakeDir)
    }

    /// Remove an empty directory
    pub fn rmdir(&self, path: &str) -> Result<RequestId> {
        let parts = RequestParts::new(Method::DELETE, format_path(&self.bucket, path));
        self.issue(parts, OperationKind::RemoveDir)
    }

    /// List a directory
    pub fn list(&self, path: &str) -> Result<RequestId> {
        let parts = RequestParts::new(Method::GET, format_dir_path(&self.bucket, path));
        self.issue(parts, OperationKind::List)
    }

    /// Upload a local file; it is read fully into memory first
    pub fn upload_file(
        &self,
        path: &str,
        local_path: impl AsRef<Path>,
        options: &UploadOptions,
    ) -> Result<RequestId> {
        let data = std::fs::read(local_path.as_ref())?;
        self.upload_bytes(path, data, options)
    }

    /// Upload an in-memory body
    pub fn upload_bytes(
        &self,
        path: &str,
        data: impl Into<Bytes>,
        options: &UploadOptions,
    ) -> Result<RequestId> {
        let data = data.into();
        let mut params = options.params.clone();
        if options.append_md5 {
            params.insert(CONTENT_MD5, md5_hex(&data));
        }
        if let Some(secret) = options.secret.as_deref().filter(|s| !s.is_empty()) {
            params.insert(CONTENT_SECRET, secret);
        }

        let parts = RequestParts::new(Method::PUT, format_path(&self.bucket, path))
            .with_body(data)
            .with_auto_mkdir(options.auto_mkdir)
            .with_params(params);
        self.issue(parts, OperationKind::Upload)
    }

    /// Download a file; the body arrives as [`Outcome::Download`](crate::upyun::Outcome::Download)
    pub fn download_file(&self, path: &str) -> Result<RequestId> {
        let parts = RequestParts::new(Method::GET, format_path(&self.bucket, path));
        self.issue(parts, OperationKind::Download)
    }

    pub fn remove_file(&self, path: &str) -> Result<RequestId> {
        let parts = RequestParts::new(Method::DELETE, format_path(&self.bucket, path));
        self.issue(parts, OperationKind::RemoveFile)
    }

    /// Fetch file metadata with a HEAD request
    pub fn stat_file(&self, path: &str) -> Result<RequestId> {
        let parts = RequestParts::new(Method::HEAD, format_path(&self.bucket, path));
        self.issue(parts, OperationKind::Stat)
    }

    /// Next completion in arrival order
    pub async fn next_completion(&self) -> Option<Completion> {
        self.completions.lock().await.next().await
    }

    /// Next completion if one is ready, without waiting
    pub fn try_next_completion(&self) -> Option<Completion> {
        self.completions.try_lock().ok()?.try_next()
    }

    /// Wait for the completion of `id`
    ///
    /// Other completions received meanwhile stay queued for
    /// [`next_completion`](Self::next_completion). Returns `None` if `id` was
    /// never issued or its completion was already taken.
    pub async fn wait(&self, id: RequestId) -> Option<Completion> {
        self.completions
            .lock()
            .await
            .wait_for(id, self.dispatcher.in_flight())
            .await
    }

    fn issue(&self, parts: RequestParts, kind: OperationKind) -> Result<RequestId> {
        self.dispatcher.issue(parts, kind)
    }
}

impl std::fmt::Debug for UpYunClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpYunClient")
            .field("bucket", &self.bucket)
            .field("user_name", &self.user_name())
            .field("endpoint", self.endpoint())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
