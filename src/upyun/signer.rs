//! UpYun request signer
//!
//! The token is `UpYun {user}:{md5(METHOD&URI&DATE&LENGTH&md5(password))}`:
//! - the password is hashed once at construction and never stored in plain text
//! - the date must be the exact value sent in the `Date` header
//! - only GET, PUT, HEAD and DELETE can be signed

use chrono::{DateTime, Utc};
use hyper::Method;

use crate::upyun::error::{Result, UpYunError};

/// Format of the `Date` header, always rendered in GMT
const GMT_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Lowercase hex MD5 of a byte slice
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Current time as a `Date` header value
pub fn gmt_date() -> String {
    format_gmt(Utc::now())
}

/// Render a timestamp as a `Date` header value (`Www, dd Mon yyyy HH:mm:ss GMT`)
pub fn format_gmt(at: DateTime<Utc>) -> String {
    at.format(GMT_FORMAT).to_string()
}

/// UpYun signature engine
#[derive(Clone)]
pub struct UpYunSigner {
    user_name: String,
    /// Hex MD5 of the plaintext password
    password_hash: String,
}

impl std::fmt::Debug for UpYunSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpYunSigner")
            .field("user_name", &self.user_name)
            .finish_non_exhaustive()
    }
}

impl UpYunSigner {
    /// Create a signer from the operator name and plaintext password
    pub fn new(user_name: impl Into<String>, password: &str) -> Self {
        Self {
            user_name: user_name.into(),
            password_hash: md5_hex(password.as_bytes()),
        }
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Compute the `Authorization` header value for one request
    pub fn sign(&self, method: &Method, date: &str, uri: &str, content_length: u64) -> Result<String> {
        let method_name = signable_method(method)?;

        let mut signing_string = String::with_capacity(
            method_name.len() + uri.len() + date.len() + self.password_hash.len() + 24,
        );
        signing_string.push_str(method_name);
        signing_string.push('&');
        signing_string.push_str(uri);
        signing_string.push('&');
        signing_string.push_str(date);
        signing_string.push('&');
        signing_string.push_str(&content_length.to_string());
        signing_string.push('&');
        signing_string.push_str(&self.password_hash);

        Ok(format!(
            "UpYun {}:{}",
            self.user_name,
            md5_hex(signing_string.as_bytes())
        ))
    }
}

/// Uppercase verb name for the verbs the service accepts
pub(crate) fn signable_method(method: &Method) -> Result<&'static str> {
    if *method == Method::GET {
        Ok("GET")
    } else if *method == Method::PUT {
        Ok("PUT")
    } else if *method == Method::HEAD {
        Ok("HEAD")
    } else if *method == Method::DELETE {
        Ok("DELETE")
    } else {
        Err(UpYunError::InvalidMethod(method.clone()))
    }
}
