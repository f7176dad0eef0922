// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envault - envelope-encrypted secret storage with online key rotation.
//!
//! This is the binary entry point for the `envault` CLI.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod context;
mod env_file;
mod rotate;
mod secrets;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use envault_config::model::EnvaultConfig;
use envault_core::EnvaultError;

use crate::context::AppContext;

/// Envault - envelope-encrypted secret storage with online key rotation.
#[derive(Parser, Debug)]
#[command(name = "envault", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new data key and re-encrypt every secret under it.
    RotateKeys {
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List data keys and their status.
    Keys,
    /// Encrypt and store a secret (replaces an existing one of the same name).
    SetSecret {
        #[arg(long)]
        user: String,
        #[arg(long)]
        project: Option<String>,
        name: String,
        value: String,
    },
    /// Decrypt and print one secret.
    GetSecret {
        #[arg(long)]
        user: String,
        name: String,
    },
    /// List a user's secrets with masked values.
    ListSecrets {
        #[arg(long)]
        user: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Delete a secret by id.
    DeleteSecret {
        #[arg(long)]
        user: String,
        id: String,
    },
    /// Import every variable of a `.env` file as a secret.
    Import {
        #[arg(long)]
        user: String,
        #[arg(long)]
        project: Option<String>,
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => envault_config::load_and_validate_path(path),
        None => envault_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            envault_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let code = match cli.command {
        Commands::RotateKeys { json } => rotate::run_rotate(&config, json).await,
        command => match run_command(&config, command).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        },
    };
    std::process::exit(code);
}

async fn run_command(config: &EnvaultConfig, command: Commands) -> Result<(), EnvaultError> {
    let ctx = AppContext::open(config).await?;
    let result = match command {
        Commands::Keys => secrets::list_keys(&ctx).await,
        Commands::SetSecret {
            user,
            project,
            name,
            value,
        } => secrets::set_secret(&ctx, &user, project.as_deref(), &name, &value).await,
        Commands::GetSecret { user, name } => secrets::get_secret(&ctx, &user, &name).await,
        Commands::ListSecrets { user, project } => {
            secrets::list_secrets(&ctx, &user, project.as_deref()).await
        }
        Commands::DeleteSecret { user, id } => secrets::delete_secret(&ctx, &user, &id).await,
        Commands::Import {
            user,
            project,
            file,
        } => secrets::import_file(&ctx, &user, project.as_deref(), &file).await,
        Commands::RotateKeys { .. } => Err(EnvaultError::Internal(
            "rotate-keys is dispatched separately".to_string(),
        )),
    };
    if let Err(e) = ctx.close().await {
        tracing::warn!(error = %e, "failed to close database");
    }
    result
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("envault={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_rotate_keys_json() {
        let cli = Cli::try_parse_from(["envault", "rotate-keys", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::RotateKeys { json: true }));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_set_secret_with_project() {
        let cli = Cli::try_parse_from([
            "envault",
            "set-secret",
            "--user",
            "alice",
            "--project",
            "web",
            "API_KEY",
            "sk-123",
        ])
        .unwrap();
        match cli.command {
            Commands::SetSecret {
                user,
                project,
                name,
                value,
            } => {
                assert_eq!(user, "alice");
                assert_eq!(project.as_deref(), Some("web"));
                assert_eq!(name, "API_KEY");
                assert_eq!(value, "sk-123");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["envault", "keys", "--config", "/tmp/envault.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/envault.toml")));
    }

    #[test]
    fn user_is_required() {
        assert!(Cli::try_parse_from(["envault", "get-secret", "API_KEY"]).is_err());
    }

    #[test]
    fn default_config_loads_without_master_key() {
        let config = envault_config::load_and_validate_str("").expect("defaults are valid");
        assert!(config.crypto.master_key.is_none());
    }
}
