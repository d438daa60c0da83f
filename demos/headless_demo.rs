//! Headless viewer demo
//!
//! Loads a model without a window, then prints the hierarchy and where each
//! status label lands in a 1280x720 viewport.

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sceneview_visualization::{
    HeadlessContainer, HierarchyWidget, ViewerBuilder, ViewerConfig, ViewerStatus, Viewport,
    DEFAULT_MODEL_URL,
};

#[derive(Parser, Debug)]
#[command(name = "headless_demo", about = "Load a model and print its labels")]
struct Cli {
    #[arg(long, default_value = DEFAULT_MODEL_URL)]
    url: String,

    /// Frames to run after loading
    #[arg(long, default_value_t = 1)]
    frames: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let container = HeadlessContainer::new(Viewport::default());
    let mut viewer = ViewerBuilder::new(ViewerConfig::default().with_model_url(cli.url))
        .build(Box::new(container))?;
    let widget = HierarchyWidget::new(&viewer);

    if viewer.finish_loading().await != ViewerStatus::Idle {
        let reason = viewer
            .last_failure()
            .map(|failure| format!("{}: {}", failure.kind, failure.message))
            .unwrap_or_else(|| "unknown".to_string());
        bail!("model did not load: {reason}");
    }
    for _ in 0..cli.frames.max(1) {
        viewer.advance(1.0 / 60.0);
    }

    for line in widget.view(&viewer).lines() {
        println!("{line}");
    }
    println!();
    for label in viewer.labels().iter().filter(|label| label.visible) {
        println!(
            "{:>5} {:<20} ({:.0}, {:.0})",
            label.node.to_string(),
            label.text,
            label.x,
            label.y
        );
    }

    viewer.dispose();
    Ok(())
}
