//! CLI module for the `upyun` binary
//!
//! Each command issues one request through [`UpYunClient`](crate::upyun::UpYunClient),
//! waits for its completion and prints the typed result.
//!
//! # Usage
//!
//! ```bash
//! # Bucket usage
//! upyun usage
//!
//! # Create a directory, with missing parents
//! upyun mkdir photos/2024 --parents
//!
//! # List a directory as JSON
//! upyun --json ls photos
//!
//! # Upload a picture with a thumbnail transform
//! upyun put ./cat.jpg photos/cat.jpg --md5 --header x-gmkerl-type=fix_max --header x-gmkerl-value=150
//!
//! # Download, stat, remove
//! upyun get photos/cat.jpg ./cat.jpg
//! upyun stat photos/cat.jpg
//! upyun rm photos/cat.jpg
//! ```

pub mod commands;

use anyhow::{Context, Result};

use crate::upyun::ExtraParams;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Parse repeated `KEY=VALUE` header arguments
pub fn parse_headers(raw: &[String]) -> Result<ExtraParams> {
    let mut params = ExtraParams::new();
    for entry in raw {
        let (key, value) = entry
            .split_once('=')
            .context(format!("Invalid header '{}', expected KEY=VALUE", entry))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Invalid header '{}', empty name", entry);
        }
        params.insert(key, value.trim());
    }
    Ok(params)
}

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exponent = (bytes_f64.ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = bytes_f64 / 1024_f64.powi(exponent as i32);

    if exponent == 0 {
        format!("{} {}", bytes, UNITS[exponent])
    } else {
        format!("{:.2} {}", value, UNITS[exponent])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let raw = vec![
            "x-gmkerl-type=fix_max".to_string(),
            "x-gmkerl-value = 150".to_string(),
        ];
        let params = parse_headers(&raw).unwrap();
        assert_eq!(params.get("x-gmkerl-type"), Some("fix_max"));
        assert_eq!(params.get("x-gmkerl-value"), Some("150"));

        assert!(parse_headers(&["novalue".to_string()]).is_err());
        assert!(parse_headers(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
