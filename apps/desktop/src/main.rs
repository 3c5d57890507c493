use anyhow::{Context as _, Result};
use eframe::NativeOptions;
use tracing_subscriber::EnvFilter;

extern crate jobs as jobs_crate;
extern crate panels as panels_crate;
extern crate timeline as timeline_crate;

mod app;
mod host;
mod interaction;
mod jobs;
mod panels;
mod timeline;

pub(crate) use app::{App, UiMsg};
use jobs_crate::PreviewRuntime;
use timeline_crate::{Sequence, TimelineConfig};

fn load_config() -> TimelineConfig {
    let path = host::config_dir().join("timeline.json");
    if !path.exists() {
        return TimelineConfig::default();
    }
    match TimelineConfig::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "timeline config ignored");
            TimelineConfig::default()
        }
    }
}

/// Optional sequence JSON passed as the first argument.
fn load_sequence() -> Result<Sequence> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {path}"))
        }
        None => Ok(app::default_sequence()),
    }
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let config = load_config();
    let sequence = load_sequence()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let previews = PreviewRuntime::start(config.max_in_flight, host::preview_extractor(host::cache_dir().join("previews")));
    tracing::info!(tracks = sequence.tracks.len(), workers = config.max_in_flight, "starting editor");

    let options = NativeOptions::default();
    eframe::run_native(
        "Timeline Editor",
        options,
        Box::new(move |cc| Ok(Box::new(App::new(cc, config, sequence, previews, runtime)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
