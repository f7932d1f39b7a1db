//! Bucket-qualified URI paths
//!
//! Every request URI is `/{bucket}` followed by the caller's path. The same
//! string is used both in the request URL and as the signed URI, so no
//! encoding or validation happens here.

const SEPARATOR: char = '/';

/// Format a caller path into the full `/{bucket}/...` URI path
pub fn format_path(bucket: &str, raw_path: &str) -> String {
    let mut uri = String::with_capacity(bucket.len() + raw_path.len() + 2);
    uri.push(SEPARATOR);
    uri.push_str(bucket);
    if raw_path.is_empty() {
        return uri;
    }
    let trimmed = raw_path.trim();
    if !trimmed.starts_with(SEPARATOR) {
        uri.push(SEPARATOR);
    }
    uri.push_str(trimmed);
    uri
}

/// Format a directory path for listing; the result always ends with `/`
pub fn format_dir_path(bucket: &str, raw_path: &str) -> String {
    let mut uri = format_path(bucket, raw_path);
    if !uri.ends_with(SEPARATOR) {
        uri.push(SEPARATOR);
    }
    uri
}
