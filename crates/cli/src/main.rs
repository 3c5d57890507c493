mod query;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use timeline::{Sequence, TimelineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "timeline-cli")]
#[command(about = "Query timeline geometry, snapping and drops against a sequence file", long_about = None)]
struct Cli {
    /// Sequence JSON file
    #[arg(long)]
    sequence: PathBuf,

    /// Timeline config JSON; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List clips, markers and captions inside the viewport plus buffer
    Visible {
        #[arg(long, default_value_t = 0.0)]
        scroll_x: f64,
        #[arg(long, default_value_t = 1000.0)]
        width: f64,
        #[arg(long)]
        zoom: Option<f64>,
    },

    /// Snap a time to the nearest clip edge, marker or playhead
    Snap {
        #[arg(long)]
        time: f64,
        #[arg(long)]
        zoom: Option<f64>,
        #[arg(long, default_value_t = 0.0)]
        playhead: f64,
        /// Ignore this clip's own edges
        #[arg(long)]
        exclude_clip: Option<String>,
    },

    /// Preview-image sub-region for a trimmed clip
    Region {
        #[arg(long)]
        clip: String,
    },

    /// Resolve a drag-and-drop payload to a track and time
    Drop {
        /// JSON payload, e.g. {"id":"asset-1","kind":"video"}
        #[arg(long)]
        payload: String,
        #[arg(long)]
        client_x: f64,
        #[arg(long)]
        client_y: f64,
        #[arg(long, default_value_t = 0.0)]
        container_left: f64,
        #[arg(long, default_value_t = 0.0)]
        container_top: f64,
        #[arg(long, default_value_t = 0.0)]
        scroll_x: f64,
        #[arg(long)]
        zoom: Option<f64>,
    },
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let raw = std::fs::read_to_string(&cli.sequence)
        .with_context(|| format!("reading {}", cli.sequence.display()))?;
    let sequence: Sequence = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", cli.sequence.display()))?;
    let config = match &cli.config {
        Some(path) => TimelineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => TimelineConfig::default(),
    }
    .normalized();
    tracing::debug!(tracks = sequence.tracks.len(), "sequence loaded");

    let out = match cli.command {
        Commands::Visible { scroll_x, width, zoom } => {
            query::visible(&sequence, &config, scroll_x, width, zoom.unwrap_or(config.default_zoom))
        }
        Commands::Snap { time, zoom, playhead, exclude_clip } => query::snap(
            &sequence,
            &config,
            time,
            zoom.unwrap_or(config.default_zoom),
            playhead,
            exclude_clip.as_deref(),
        ),
        Commands::Region { clip } => query::region(&sequence, &clip)?,
        Commands::Drop { payload, client_x, client_y, container_left, container_top, scroll_x, zoom } => {
            let view = query::DropView {
                container_left,
                container_top,
                scroll_x,
                zoom: zoom.unwrap_or(config.default_zoom),
            };
            query::drop(&sequence, &config, &view, &payload, client_x, client_y)
        }
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
