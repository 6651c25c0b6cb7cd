//! Command-line front end for the MCP store.
//!
//! Usage:
//!   mcp-manager list
//!   mcp-manager profiles
//!   mcp-manager backups
//!   mcp-manager backup [label]
//!   mcp-manager restore <backup-id>
//!   mcp-manager export [path]
//!   mcp-manager import <path> [--allow-duplicates]
//!   mcp-manager status
//!
//! The store lives under `$MCP_MANAGER_DIR/.mcp-manager/` (current directory
//! by default). Set `RUST_LOG` to change log verbosity; logs go to stderr.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use mcp_manager::{AddOptions, Config, EntityStore, JsonFileStorage};

const ALLOW_DUPLICATES: &str = "--allow-duplicates";

const USAGE: &str = "usage: mcp-manager <list|profiles|backups|backup [label]|restore <id>|export [path]|import <path> [--allow-duplicates]|status>";

/// Split `import` arguments into the file path and options. Flags may come
/// before or after the path.
fn import_args(args: &[String]) -> Result<(&str, AddOptions)> {
    let (flags, paths): (Vec<&String>, Vec<&String>) =
        args.iter().partition(|a| a.starts_with("--"));
    if let Some(unknown) = flags.iter().find(|f| f.as_str() != ALLOW_DUPLICATES) {
        bail!("Unknown import option '{}'", unknown);
    }
    let path = match paths.as_slice() {
        [path] => path.as_str(),
        [] => bail!("import needs a file path"),
        _ => bail!("import takes a single file path"),
    };
    let options = if flags.is_empty() {
        AddOptions::default()
    } else {
        AddOptions::allow_duplicate()
    };
    Ok((path, options))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let config = Config::from_env();
    let storage = Arc::new(JsonFileStorage::new(&config.working_dir));
    let store = EntityStore::open(storage, config.store.clone())
        .await
        .with_context(|| format!("Failed to open store in {}", config.working_dir.display()))?;

    match command.as_str() {
        "list" => {
            for mcp in store.list().await {
                let state = if mcp.enabled { "on " } else { "off" };
                println!(
                    "{}  {}  {:<24} {} {}",
                    mcp.id,
                    state,
                    mcp.name,
                    mcp.command,
                    mcp.args.join(" ")
                );
            }
        }
        "profiles" => {
            for profile in store.profiles().await {
                println!(
                    "{}  {:<24} {} MCP(s)",
                    profile.id,
                    profile.name,
                    profile.mcp_ids.len()
                );
            }
        }
        "backups" => {
            for backup in store.backups().await {
                println!(
                    "{}  {}  {:<32} {} MCP(s), {} profile(s)",
                    backup.id,
                    backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                    backup.label,
                    backup.mcp_count,
                    backup.profile_count
                );
            }
        }
        "backup" => {
            let label = args[1..].join(" ");
            let info = store.create_backup(&label).await?;
            println!("{}", info.id);
        }
        "restore" => {
            let id = args.get(1).context("restore needs a backup id")?;
            let id = Uuid::parse_str(id).with_context(|| format!("Invalid backup id: {}", id))?;
            store.restore_backup(id).await?;
        }
        "export" => {
            let json = store.export().await.to_json()?;
            match args.get(1) {
                Some(path) => tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path))?,
                None => println!("{}", json),
            }
        }
        "import" => {
            let (path, options) = import_args(&args[1..])?;
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path))?;
            let report = store.import_json(&json, options).await?;
            for (index, err) in report.failed() {
                eprintln!("record {}: {}", index, err);
            }
            println!("Imported {} MCP(s)", report.imported_count());
        }
        "status" => {
            println!("{}", serde_json::to_string_pretty(&store.status().await)?);
        }
        other => bail!("Unknown command '{}'\n{}", other, USAGE),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_import_args_flag_before_or_after_path() {
        let before = strings(&["--allow-duplicates", "file.json"]);
        let after = strings(&["file.json", "--allow-duplicates"]);
        for args in [&before, &after] {
            let (path, options) = import_args(args).unwrap();
            assert_eq!(path, "file.json");
            assert_eq!(options, AddOptions::allow_duplicate());
        }

        let args = strings(&["file.json"]);
        let (path, options) = import_args(&args).unwrap();
        assert_eq!(path, "file.json");
        assert_eq!(options, AddOptions::default());
    }

    #[test]
    fn test_import_args_rejects_bad_input() {
        assert!(import_args(&strings(&["--allow-duplicates"])).is_err());
        assert!(import_args(&strings(&["a.json", "b.json"])).is_err());
        assert!(import_args(&strings(&["--force", "a.json"])).is_err());
    }
}
