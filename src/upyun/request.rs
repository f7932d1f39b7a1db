//! Request assembly: endpoint selection, headers and signature

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, DATE};
use hyper::{Method, Request};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::upyun::error::Result;
use crate::upyun::params::ExtraParams;
use crate::upyun::signer::{signable_method, UpYunSigner};

/// UpYun API endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Endpoint {
    /// Picked by the service based on the caller's network
    #[default]
    Auto,
    Telecom,
    Cnc,
    Ctt,
    /// Explicit `host[:port]`, for private deployments and tests
    Custom(String),
}

impl Endpoint {
    pub fn host(&self) -> &str {
        match self {
            Endpoint::Auto => "v0.api.upyun.com",
            Endpoint::Telecom => "v1.api.upyun.com",
            Endpoint::Cnc => "v2.api.upyun.com",
            Endpoint::Ctt => "v3.api.upyun.com",
            Endpoint::Custom(host) => host.as_str(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "" => Err("endpoint must not be empty".to_string()),
            "auto" | "v0" => Ok(Endpoint::Auto),
            "telecom" | "v1" => Ok(Endpoint::Telecom),
            "cnc" | "v2" => Ok(Endpoint::Cnc),
            "ctt" | "v3" => Ok(Endpoint::Ctt),
            _ if s.contains(char::is_whitespace) || s.contains('/') => {
                Err(format!("invalid endpoint host: {}", s))
            }
            _ => Ok(Endpoint::Custom(s.to_string())),
        }
    }
}

impl TryFrom<String> for Endpoint {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Auto => f.write_str("auto"),
            Endpoint::Telecom => f.write_str("telecom"),
            Endpoint::Cnc => f.write_str("cnc"),
            Endpoint::Ctt => f.write_str("ctt"),
            Endpoint::Custom(host) => f.write_str(host),
        }
    }
}

/// Everything needed to build one signed request
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: Method,
    /// Bucket-qualified URI, also the signed URI
    pub uri: String,
    pub body: Bytes,
    pub auto_mkdir: bool,
    pub params: ExtraParams,
}

impl RequestParts {
    pub fn new(method: Method, uri: String) -> Self {
        Self {
            method,
            uri,
            body: Bytes::new(),
            auto_mkdir: false,
            params: ExtraParams::new(),
        }
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn with_auto_mkdir(mut self, auto_mkdir: bool) -> Self {
        self.auto_mkdir = auto_mkdir;
        self
    }

    pub fn with_params(mut self, params: ExtraParams) -> Self {
        self.params = params;
        self
    }

    /// Full request URL on the given endpoint
    ///
    /// Each path segment is percent-encoded; the query, if any, is kept as is.
    /// The signature always covers the raw `uri`.
    pub fn url(&self, endpoint: &Endpoint) -> String {
        let host = endpoint.host();
        let (path, query) = match self.uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (self.uri.as_str(), None),
        };

        let mut url = String::with_capacity(7 + host.len() + self.uri.len() * 3);
        url.push_str("http://");
        url.push_str(host);
        for (i, segment) in path.split('/').enumerate() {
            if i > 0 {
                url.push('/');
            }
            url.push_str(&urlencoding::encode(segment));
        }
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Build the signed request, using `date` for both the `Date` header and the signature
    pub fn build(
        &self,
        signer: &UpYunSigner,
        endpoint: &Endpoint,
        date: &str,
    ) -> Result<Request<Full<Bytes>>> {
        signable_method(&self.method)?;

        // Only PUT carries a body
        let body = if self.method == Method::PUT {
            self.body.clone()
        } else {
            Bytes::new()
        };
        let content_length = body.len() as u64;
        let authorization = signer.sign(&self.method, date, &self.uri, content_length)?;

        let mut req = Request::builder()
            .method(self.method.clone())
            .uri(self.url(endpoint))
            .header(DATE, date)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_LENGTH, content_length)
            .body(Full::new(body))?;

        let headers = req.headers_mut();
        if self.auto_mkdir || self.params.auto_mkdir() {
            headers.insert("mkdir", HeaderValue::from_static("true"));
        }

        // Params replace earlier values, except the headers the signature covers
        for (key, value) in self.params.headers() {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(hyper::http::Error::from)?;
            if name == DATE || name == AUTHORIZATION || name == CONTENT_LENGTH {
                warn!(header = %name, "ignoring extra param that overrides a signed header");
                continue;
            }
            let value = HeaderValue::from_str(value).map_err(hyper::http::Error::from)?;
            headers.insert(name, value);
        }

        Ok(req)
    }
}
