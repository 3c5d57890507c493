//! Headless timeline engine: data model, time/pixel geometry, snapping, drag
//! state machines, drop handling, viewport virtualization and scene building.

use thiserror::Error;

pub mod config;
pub mod drag;
pub mod drop;
pub mod edit;
pub mod frame;
pub mod geometry;
pub mod model;
pub mod ops;
pub mod scene;
pub mod selection;
pub mod snap;
pub mod store;
pub mod virtualize;

pub use config::TimelineConfig;
pub use geometry::{clip_region, pixel_to_time, time_to_pixel, ClipRegion, Rect, TimelineGeometry, TrackRows};
pub use model::*;
pub use ops::{TimelineOp, TimelineOps};
pub use selection::Selection;
pub use snap::{find_snap_point, SnapKind, SnapPoint};
pub use store::{MemoryStore, Store};

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("track not found: {0}")]
    TrackNotFound(String),
    #[error("clip not found: {0}")]
    ClipNotFound(String),
    #[error("track is locked: {0}")]
    TrackLocked(String),
    #[error("invalid operation: {0}")]
    InvalidOp(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Parse(#[from] serde_json::Error),
}
