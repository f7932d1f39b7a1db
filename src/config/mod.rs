use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::upyun::{Credentials, Endpoint, TransportOptions};

/// UpYun profile: bucket, operator credentials and API endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Bucket (service) name
    pub bucket: String,

    /// Operator name
    pub user_name: String,

    /// Operator password in plain text; hashed before use
    pub password: String,

    /// API endpoint: auto, telecom, cnc, ctt or host[:port] (default: auto)
    #[serde(default)]
    pub endpoint: Endpoint,
}

impl Profile {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.bucket.clone(), self.user_name.clone(), &self.password)
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Whole-request timeout in seconds, 0 disables it
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl TransportConfig {
    pub fn options(&self) -> TransportOptions {
        TransportOptions {
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ..TransportOptions::default()
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named profiles for different buckets or operators
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Profile used when none is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    /// Transport settings
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a profile by name, or the default profile if not specified
    pub fn get_profile(&self, name: Option<&str>) -> Option<&Profile> {
        if let Some(name) = name {
            self.profiles.get(name)
        } else if let Some(default) = &self.default_profile {
            self.profiles.get(default)
        } else if self.profiles.len() == 1 {
            self.profiles.values().next()
        } else {
            None
        }
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

    Ok(config)
}

/// Load configuration from environment variables
///
/// - UPYUN_BUCKET
/// - UPYUN_USER
/// - UPYUN_PASSWORD
/// - UPYUN_ENDPOINT (optional, defaults to auto)
/// - UPYUN_TIMEOUT (optional, seconds, 0 disables)
pub fn load_from_env() -> Result<Config> {
    // Try to load .env file if it exists (don't fail if it doesn't)
    let _ = dotenvy::dotenv();

    let bucket = std::env::var("UPYUN_BUCKET").context("UPYUN_BUCKET environment variable not set")?;
    let user_name = std::env::var("UPYUN_USER").context("UPYUN_USER environment variable not set")?;
    let password =
        std::env::var("UPYUN_PASSWORD").context("UPYUN_PASSWORD environment variable not set")?;

    let endpoint = match std::env::var("UPYUN_ENDPOINT") {
        Ok(value) => value
            .parse::<Endpoint>()
            .map_err(|e| anyhow::anyhow!("Invalid UPYUN_ENDPOINT: {}", e))?,
        Err(_) => Endpoint::default(),
    };

    let mut config = Config::new();
    config.profiles.insert(
        "default".to_string(),
        Profile {
            bucket,
            user_name,
            password,
            endpoint,
        },
    );
    config.default_profile = Some("default".to_string());

    if let Ok(timeout) = std::env::var("UPYUN_TIMEOUT") {
        config.transport.timeout_secs = timeout
            .trim()
            .parse()
            .context(format!("Invalid UPYUN_TIMEOUT: {}", timeout))?;
    }

    Ok(config)
}

/// Load configuration from file or environment
///
/// # Arguments
/// * `config_path` - Optional path to YAML config file
/// * `profile_name` - Optional profile name to use (only relevant for YAML configs)
pub fn load_config(config_path: Option<&str>, profile_name: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        let mut config = load_from_yaml(path)?;

        // If a specific profile is requested, make it the default
        if let Some(name) = profile_name {
            if !config.profiles.contains_key(name) {
                anyhow::bail!("Profile '{}' not found in config file", name);
            }
            config.default_profile = Some(name.to_string());
        }

        Ok(config)
    } else {
        load_from_env()
    }
}
