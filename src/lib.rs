//! upyun-client - Async UpYun object storage client

pub mod cli;
pub mod config;
pub mod upyun;

pub use config::Config;
pub use upyun::UpYunClient;
