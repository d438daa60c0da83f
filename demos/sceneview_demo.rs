//! Interactive viewer demo
//!
//! Opens a window and loads the model. Status badges float over every mesh
//! and the side panel lists the object hierarchy.
//!
//! Controls:
//!   Right drag: orbit around the model
//!   Middle drag or wheel: dolly towards the cursor
//!   Click a panel row: highlight that object

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sceneview_visualization::{Viewer, ViewerBuilder, ViewerConfig, ViewerStatus, WindowHost};

#[derive(Parser, Debug)]
#[command(name = "sceneview_demo", about = "Interactive 3D model viewer")]
struct Cli {
    /// Model URL; overrides the configured one
    #[arg(long)]
    url: Option<String>,

    /// JSON file with viewer settings
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1200.0)]
    width: f64,

    #[arg(long, default_value_t = 800.0)]
    height: f64,

    /// Hide the object hierarchy panel
    #[arg(long)]
    no_panel: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ViewerConfig::default(),
    };
    if let Some(url) = &cli.url {
        config = config.with_model_url(url.clone());
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = load_config(&cli)?;
    info!(url = %config.model_url, "starting viewer");

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let host = WindowHost::new("sceneview", cli.width, cli.height).with_hierarchy_panel(!cli.no_panel);

    let mut reported = false;
    host.run(ViewerBuilder::new(config), runtime.handle().clone(), move |viewer: &Viewer| {
        if reported || viewer.status() == ViewerStatus::Loading {
            return;
        }
        match viewer.model() {
            Some(model) => info!(objects = model.node_count(), meshes = model.mesh_count(), "model ready"),
            None => info!(status = ?viewer.status(), "load finished without a model"),
        }
        reported = true;
    })?;

    Ok(())
}
