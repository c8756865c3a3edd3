//! `demtiles` - contour vector tiles from raster DEM tiles.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use demtiles_contour::{ContourTile, TileAddress};
use demtiles_server::{serve, shutdown_signal, AppState, ServerConfig, TilesetRegistry};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve contour tiles over HTTP.
    Serve {
        /// Path to the YAML configuration file.
        #[arg(long)]
        config: PathBuf,

        /// Listen address, overriding the configuration file.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Validate a configuration file and list its tilesets.
    Check {
        /// Path to the YAML configuration file.
        #[arg(long)]
        config: PathBuf,
    },

    /// Render a single tile to a file.
    Render {
        /// Path to the YAML configuration file.
        #[arg(long)]
        config: PathBuf,

        /// Tileset name.
        #[arg(long)]
        tileset: String,

        #[arg(long)]
        z: u8,

        #[arg(long)]
        x: u32,

        #[arg(long)]
        y: u32,

        /// Output path for the encoded tile.
        #[arg(long)]
        out: PathBuf,
    },
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => fmt().with_env_filter(filter).init(),
        LogFormat::Json => fmt().with_env_filter(filter).json().init(),
    }
}

#[cfg(feature = "prometheus")]
fn init_metrics(config: &ServerConfig) -> anyhow::Result<()> {
    if let Some(addr) = config.metrics_listen {
        demtiles_metrics::install_prometheus_exporter(addr)
            .with_context(|| format!("failed to start metrics exporter on {}", addr))?;
        info!(addr = %addr, "prometheus exporter listening");
    }
    Ok(())
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics(config: &ServerConfig) -> anyhow::Result<()> {
    if config.metrics_listen.is_some() {
        tracing::warn!(
            "metrics_listen is set but demtiles was built without the prometheus feature"
        );
    }
    Ok(())
}

fn load(config: &Path) -> anyhow::Result<(ServerConfig, TilesetRegistry)> {
    let config = ServerConfig::load(config)
        .with_context(|| format!("invalid configuration {}", config.display()))?;
    let registry = TilesetRegistry::from_config(&config)?;
    Ok((config, registry))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command {
        Command::Serve { config, listen } => {
            let (mut config, registry) = load(&config)?;
            if let Some(listen) = listen {
                config.listen = listen;
            }
            init_metrics(&config)?;

            let state = Arc::new(AppState::new(
                Arc::new(registry),
                config.base_url(),
                Duration::from_secs(config.request_timeout_secs),
            ));
            serve(state, config.listen, shutdown_signal())
                .await
                .with_context(|| format!("server on {} failed", config.listen))?;
        }

        Command::Check { config } => {
            let (config, registry) = load(&config)?;
            println!(
                "configuration ok: {} tileset(s), serving at {}",
                registry.len(),
                config.base_url()
            );
            for tileset in registry.iter() {
                let options = tileset.options();
                println!(
                    "  {:<16} {:<10} minor {:>6} m  major {:>6} m  zoom {}-{}",
                    tileset.name(),
                    options.encoding.to_string(),
                    options.minor_interval,
                    options.major_interval,
                    tileset.min_zoom(),
                    tileset.max_zoom()
                );
            }
        }

        Command::Render { config, tileset, z, x, y, out } => {
            let (_, registry) = load(&config)?;
            let Some(tileset) = registry.get(&tileset) else {
                bail!("unknown tileset {:?}", tileset);
            };
            let center = TileAddress::new(z, x, y)?;

            let neighborhood = tileset.fetch(center).await;
            let renderer = Arc::clone(&tileset);
            let tile = tokio::task::spawn_blocking(move || renderer.render(&neighborhood)).await??;

            match tile {
                ContourTile::NotFound => bail!("no source data for tile {}/{}/{}", z, x, y),
                ContourTile::Empty => {
                    info!(z, x, y, "no contours cross this tile, nothing written");
                }
                ContourTile::Encoded { bytes, features } => {
                    tokio::fs::write(&out, &bytes)
                        .await
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    info!(
                        z,
                        x,
                        y,
                        features,
                        bytes = bytes.len(),
                        path = %out.display(),
                        "tile written"
                    );
                }
            }
        }
    }

    Ok(())
}
