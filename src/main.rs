use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use upyun_client::cli::{self, commands, OutputFormat};
use upyun_client::config;
use upyun_client::upyun::{Endpoint, UpYunClient};

#[derive(Parser)]
#[command(name = "upyun")]
#[command(version, about = "UpYun object storage client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (defaults to UPYUN_* environment variables)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Profile to use from config
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Override the profile endpoint (auto, telecom, cnc, ctt or host:port)
    #[arg(long, global = true)]
    endpoint: Option<Endpoint>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show bytes used by the bucket
    Usage,

    /// Make a directory
    Mkdir {
        /// Remote directory path
        path: String,

        /// Create missing parent directories
        #[arg(short, long)]
        parents: bool,
    },

    /// Remove an empty directory
    Rmdir {
        /// Remote directory path
        path: String,
    },

    /// List a directory
    Ls {
        /// Remote directory path
        #[arg(default_value = "/")]
        path: String,
    },

    /// Upload a local file
    Put {
        /// Local file
        local: PathBuf,

        /// Remote path
        remote: String,

        /// Create missing parent directories
        #[arg(short, long)]
        parents: bool,

        /// Send Content-MD5 so the server verifies the body
        #[arg(long)]
        md5: bool,

        /// Secret for image spaces
        #[arg(long)]
        secret: Option<String>,

        /// Extra request header (KEY=VALUE), repeatable
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },

    /// Download a file
    Get {
        /// Remote path
        remote: String,

        /// Local destination (stdout if omitted)
        local: Option<PathBuf>,
    },

    /// Remove a file
    Rm {
        /// Remote path
        path: String,
    },

    /// Show file information
    Stat {
        /// Remote path
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // One request per invocation: current_thread is sufficient
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref(), cli.profile.as_deref())?;
    let profile = config
        .get_profile(cli.profile.as_deref())
        .context("No profile found in configuration")?;

    let endpoint = cli.endpoint.clone().unwrap_or_else(|| profile.endpoint.clone());
    let client = UpYunClient::with_options(
        profile.credentials(),
        endpoint,
        config.transport.options(),
    )?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Commands::Usage => commands::cmd_usage(&client, format).await?,
        Commands::Mkdir { path, parents } => commands::cmd_mkdir(&client, &path, parents).await?,
        Commands::Rmdir { path } => commands::cmd_rmdir(&client, &path).await?,
        Commands::Ls { path } => commands::cmd_ls(&client, &path, format).await?,
        Commands::Put {
            local,
            remote,
            parents,
            md5,
            secret,
            headers,
        } => {
            let params = cli::parse_headers(&headers)?;
            let options = commands::upload_options(parents, md5, secret, params);
            commands::cmd_put(&client, &local, &remote, options, format).await?;
        }
        Commands::Get { remote, local } => commands::cmd_get(&client, &remote, local).await?,
        Commands::Rm { path } => commands::cmd_rm(&client, &path).await?,
        Commands::Stat { path } => commands::cmd_stat(&client, &path, format).await?,
    }

    Ok(())
}
