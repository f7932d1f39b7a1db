use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{format_bytes, OutputFormat};
use crate::upyun::{ExtraParams, Outcome, RequestId, UpYunClient, UploadOptions};

/// Wait for `id` and unwrap its outcome
async fn finish(client: &UpYunClient, id: RequestId) -> Result<Outcome> {
    let completion = client
        .wait(id)
        .await
        .ok_or_else(|| anyhow::anyhow!("Request {} produced no completion", id))?;
    let kind = completion.kind;
    let outcome = completion
        .outcome
        .with_context(|| format!("{} request failed", kind))?;
    Ok(outcome)
}

fn unexpected(outcome: Outcome) -> anyhow::Error {
    anyhow::anyhow!("Unexpected {} outcome", outcome.kind())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Bucket usage command
pub async fn cmd_usage(client: &UpYunClient, format: OutputFormat) -> Result<()> {
    let id = client.bucket_usage()?;
    match finish(client, id).await? {
        Outcome::BucketUsage(bytes) => {
            if format == OutputFormat::Json {
                print_json(&serde_json::json!({ "bucket": client.bucket(), "usage": bytes }))
            } else {
                println!("{}: {} ({})", client.bucket(), format_bytes(bytes), bytes);
                Ok(())
            }
        }
        other => Err(unexpected(other)),
    }
}

/// Make directory command
pub async fn cmd_mkdir(client: &UpYunClient, path: &str, parents: bool) -> Result<()> {
    let id = client.mkdir(path, parents)?;
    match finish(client, id).await? {
        Outcome::MakeDir(true) => {
            println!("Created directory: {}", path);
            Ok(())
        }
        Outcome::MakeDir(false) => anyhow::bail!("Server did not confirm directory creation: {}", path),
        other => Err(unexpected(other)),
    }
}

/// Remove directory command
pub async fn cmd_rmdir(client: &UpYunClient, path: &str) -> Result<()> {
    let id = client.rmdir(path)?;
    match finish(client, id).await? {
        Outcome::RemoveDir(true) => {
            println!("Removed directory: {}", path);
            Ok(())
        }
        Outcome::RemoveDir(false) => anyhow::bail!("Server did not confirm directory removal: {}", path),
        other => Err(unexpected(other)),
    }
}

/// List directory command
pub async fn cmd_ls(client: &UpYunClient, path: &str, format: OutputFormat) -> Result<()> {
    let id = client.list(path)?;
    let items = match finish(client, id).await? {
        Outcome::List(items) => items,
        other => return Err(unexpected(other)),
    };

    if format == OutputFormat::Json {
        return print_json(&items);
    }

    // Buffer stdout to avoid per-line flush syscalls
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    for item in &items {
        let size = if item.is_folder {
            "DIR".to_string()
        } else {
            format_bytes(item.size)
        };
        let suffix = if item.is_folder { "/" } else { "" };
        writeln!(
            out,
            "[{}] {:>12} {}{}",
            item.modified_at.format("%Y-%m-%d %H:%M:%S UTC"),
            size,
            item.name,
            suffix
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Upload command
pub async fn cmd_put(
    client: &UpYunClient,
    local: &Path,
    remote: &str,
    options: UploadOptions,
    format: OutputFormat,
) -> Result<()> {
    let id = client
        .upload_file(remote, local, &options)
        .context(format!("Failed to upload {:?}", local))?;

    match finish(client, id).await? {
        Outcome::Upload { success, pic } => {
            if !success {
                anyhow::bail!("Server did not confirm upload: {}", remote);
            }
            if format == OutputFormat::Json {
                return print_json(&pic);
            }
            println!("Uploaded {} -> {}", local.display(), remote);
            if !pic.format.is_empty() {
                println!(
                    "Picture: {} {}x{} ({} frame{})",
                    pic.format,
                    pic.width,
                    pic.height,
                    pic.frames,
                    if pic.frames == 1 { "" } else { "s" }
                );
            }
            Ok(())
        }
        other => Err(unexpected(other)),
    }
}

/// Download command; writes to stdout when no local path is given
pub async fn cmd_get(client: &UpYunClient, remote: &str, local: Option<PathBuf>) -> Result<()> {
    let id = client.download_file(remote)?;
    let data = match finish(client, id).await? {
        Outcome::Download(data) => data,
        other => return Err(unexpected(other)),
    };

    match local {
        Some(path) => {
            std::fs::write(&path, &data).context(format!("Failed to write {:?}", path))?;
            eprintln!("Downloaded {} -> {} ({})", remote, path.display(), format_bytes(data.len() as u64));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Remove file command
pub async fn cmd_rm(client: &UpYunClient, path: &str) -> Result<()> {
    let id = client.remove_file(path)?;
    match finish(client, id).await? {
        Outcome::RemoveFile(true) => {
            println!("Removed: {}", path);
            Ok(())
        }
        Outcome::RemoveFile(false) => anyhow::bail!("Server did not confirm removal: {}", path),
        other => Err(unexpected(other)),
    }
}

/// Stat command
pub async fn cmd_stat(client: &UpYunClient, path: &str, format: OutputFormat) -> Result<()> {
    let id = client.stat_file(path)?;
    let info = match finish(client, id).await? {
        Outcome::Stat(info) => info,
        other => return Err(unexpected(other)),
    };

    if format == OutputFormat::Json {
        return print_json(&info);
    }

    println!("Path: /{}/{}", client.bucket(), path.trim_start_matches('/'));
    println!("Type: {}", if info.kind.is_empty() { "unknown" } else { info.kind.as_str() });
    println!("Size: {} ({})", format_bytes(info.size), info.size);
    println!("Created: {}", info.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    Ok(())
}

/// Build upload options from command-line flags
pub fn upload_options(
    parents: bool,
    md5: bool,
    secret: Option<String>,
    params: ExtraParams,
) -> UploadOptions {
    let mut options = UploadOptions::new()
        .with_auto_mkdir(parents)
        .with_md5(md5)
        .with_params(params);
    if let Some(secret) = secret {
        options = options.with_secret(secret);
    }
    options
}
