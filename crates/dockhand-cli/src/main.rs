#![deny(unsafe_code)]

//! dockhand CLI: list, inspect and manage containers and images through the
//! engine's local HTTP API. Results are printed as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dockhand_config::AppConfig;
use dockhand_core::{
    ContainerListParams, Engine, InspectFormat, Inspection, ListKind, RemoveContainerOptions,
    RemoveImageOptions, build_info,
};

/// dockhand: a client for the container engine's local HTTP API.
#[derive(Parser)]
#[command(name = "dockhand", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "dockhand.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Engine Unix socket, overriding the config file.
    #[arg(long, conflicts_with = "tcp")]
    socket: Option<PathBuf>,

    /// Engine TCP address as HOST:PORT, overriding the config file.
    #[arg(long, value_parser = parse_tcp)]
    tcp: Option<TcpAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TcpAddr {
    host: String,
    port: u16,
}

fn parse_tcp(s: &str) -> Result<TcpAddr, String> {
    let (host, port) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected HOST:PORT, got {s:?}"))?;
    if host.is_empty() {
        return Err(format!("missing host in {s:?}"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|e| format!("invalid port in {s:?}: {e}"))?;
    Ok(TcpAddr {
        host: host.to_string(),
        port,
    })
}

#[derive(Subcommand)]
enum Commands {
    /// List images, one row per tag.
    Images {
        /// Attach the containers created from each image.
        #[arg(long)]
        with_containers: bool,
    },

    /// List containers (stopped ones included).
    Containers {
        /// Only running containers.
        #[arg(long)]
        running: bool,

        /// Only containers created from this image id.
        #[arg(long)]
        ancestor: Option<String>,
    },

    /// Search the registry for images.
    Search { term: String },

    /// Start a container.
    Start { name: String },

    /// Stop a container.
    Stop { name: String },

    /// Restart a container.
    Restart { name: String },

    /// Kill a container.
    Kill {
        /// Container id or name.
        name: String,

        /// Only kill if the container exists and is running.
        #[arg(long)]
        checked: bool,
    },

    /// Remove a container.
    Rm {
        name: String,

        /// Remove anonymous volumes too.
        #[arg(long)]
        volumes: bool,

        /// Kill the container first if it is running.
        #[arg(long)]
        force: bool,

        /// Remove the link instead of the container.
        #[arg(long)]
        link: bool,
    },

    /// Remove an image.
    Rmi {
        name: String,

        /// Remove even if containers use the image.
        #[arg(long)]
        force: bool,

        /// Keep untagged parents.
        #[arg(long)]
        no_prune: bool,
    },

    /// Inspect an image, or any object with --raw.
    Inspect {
        name: String,

        /// Print the engine CLI's inspect output instead of the typed image.
        #[arg(long)]
        raw: bool,
    },

    /// Pull an image (tag defaults to latest).
    Pull { image: String },

    /// Copy a host file into a container.
    CpTo { id: String, from: String, to: String },

    /// Copy a file out of a container.
    CpFrom { id: String, from: String, to: String },

    /// List a directory inside a container.
    Ls { id: String, path: String },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Show version and build information.
    Version,
}

#[derive(Serialize)]
struct ActionResult<'a> {
    target: &'a str,
    action: &'a str,
    succeeded: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (mut config, loaded) = load_config(&cli.config).await?;
    apply_overrides(&mut config, cli.socket.as_deref(), cli.tcp.as_ref());
    config.validate()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, &config.logging.level))),
        )
        .init();

    debug!(version = %build_info::version_string(), "dockhand starting");
    if !loaded {
        debug!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let succeeded = run(cli.command, &config, &cli.config).await?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `RUST_LOG` is handled by the caller; otherwise `-v` picks the level and
/// the config file is the fallback.
/// `-v` only ever raises verbosity above the configured level.
fn log_filter(verbose: u8, configured: &str) -> String {
    let requested = match verbose {
        0 => return configured.to_string(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    match (
        configured.parse::<LevelFilter>(),
        requested.parse::<LevelFilter>(),
    ) {
        (Ok(configured_level), Ok(requested_level)) if configured_level > requested_level => {
            configured.to_string()
        }
        _ => requested.to_string(),
    }
}

async fn run(command: Commands, config: &AppConfig, config_path: &Path) -> Result<bool> {
    let engine = Engine::from_config(config);

    match command {
        Commands::Images { with_containers } => {
            let kind = if with_containers {
                ListKind::ImagesWithContainers
            } else {
                ListKind::Images
            };
            print_json(&engine.list(kind).await?)?;
        }
        Commands::Containers { running, ancestor } => {
            let mut params = if running {
                ContainerListParams::running()
            } else {
                ContainerListParams::new()
            };
            if let Some(id) = ancestor {
                params = params.ancestor(id);
            }
            print_json(&engine.list(ListKind::Containers(params)).await?)?;
        }
        Commands::Search { term } => {
            print_json(&engine.list(ListKind::Search(term)).await?)?;
        }
        Commands::Start { name } => {
            return report(&name, "start", engine.start_container(&name).await?);
        }
        Commands::Stop { name } => {
            return report(&name, "stop", engine.stop_container(&name).await?);
        }
        Commands::Restart { name } => {
            return report(&name, "restart", engine.restart_container(&name).await?);
        }
        Commands::Kill { name, checked } => {
            let killed = if checked {
                engine.kill_if_running(&name).await?
            } else {
                engine.kill_container(&name).await?
            };
            return report(&name, "kill", killed);
        }
        Commands::Rm {
            name,
            volumes,
            force,
            link,
        } => {
            let opts = RemoveContainerOptions {
                v: volumes,
                force,
                link,
            };
            return report(&name, "rm", engine.remove_container(&name, opts).await?);
        }
        Commands::Rmi {
            name,
            force,
            no_prune,
        } => {
            let opts = RemoveImageOptions {
                force,
                noprune: no_prune,
            };
            return report(&name, "rmi", engine.remove_image(&name, opts).await?);
        }
        Commands::Inspect { name, raw } => {
            let format = if raw {
                InspectFormat::Lines
            } else {
                InspectFormat::Image
            };
            match engine.inspect_as(&name, format).await? {
                Inspection::Lines(lines) => println!("{}", lines.join("\n")),
                image @ Inspection::Image(_) => print_json(&image)?,
            }
        }
        Commands::Pull { image } => {
            engine.pull_image(&image).await?;
            info!(image = %image, "pull complete");
        }
        Commands::CpTo { id, from, to } => {
            engine.copy_to_container(&id, &from, &to).await?;
        }
        Commands::CpFrom { id, from, to } => {
            engine.copy_from_container(&id, &from, &to).await?;
        }
        Commands::Ls { id, path } => {
            print_json(&engine.list_directory(&id, &path).await?)?;
        }
        Commands::Config { show } => cmd_config(config, config_path, show)?,
        Commands::Version => println!("dockhand {}", build_info::version_string()),
    }

    Ok(true)
}

fn report(target: &str, action: &str, succeeded: bool) -> Result<bool> {
    print_json(&ActionResult {
        target,
        action,
        succeeded,
    })?;
    Ok(succeeded)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_config(config: &AppConfig, config_path: &Path, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render config")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// Load the config file, or defaults when it does not exist. The flag
/// reports whether a file was read.
async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if path.exists() {
        let config = AppConfig::load(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}

fn apply_overrides(config: &mut AppConfig, socket: Option<&Path>, tcp: Option<&TcpAddr>) {
    if let Some(path) = socket {
        config.engine.transport = "unix".to_string();
        config.engine.socket_path = path.to_string_lossy().into_owned();
    }
    if let Some(addr) = tcp {
        config.engine.transport = "tcp".to_string();
        config.engine.tcp_host = addr.host.clone();
        config.engine.tcp_port = addr.port;
    }
}
