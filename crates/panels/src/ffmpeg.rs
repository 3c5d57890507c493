use std::sync::Arc;

use bridge::commands::{CheckFfmpeg, FfmpegStatus, NoArgs};
use bridge::{Bridge, BridgeError, BridgeExt, Liveness, LivenessTicket};
use futures::future::{BoxFuture, FutureExt};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FfmpegState {
    #[default]
    Unknown,
    Checking,
    Ready(FfmpegStatus),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct FfmpegMsg {
    ticket: LivenessTicket,
    result: Result<FfmpegStatus, BridgeError>,
}

/// Shows whether ffmpeg/ffprobe were found and where.
pub struct FfmpegPanel {
    bridge: Arc<dyn Bridge>,
    state: FfmpegState,
    live: Liveness,
}

impl FfmpegPanel {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self { bridge, state: FfmpegState::Unknown, live: Liveness::new() }
    }

    pub fn state(&self) -> &FfmpegState { &self.state }

    pub fn check(&mut self) -> BoxFuture<'static, FfmpegMsg> {
        let ticket = self.live.issue();
        self.state = FfmpegState::Checking;
        let call = self.bridge.call::<CheckFfmpeg>(NoArgs {});
        async move { FfmpegMsg { ticket, result: call.await } }.boxed()
    }

    pub fn unmount(&self) { self.live.invalidate(); }

    pub fn update(&mut self, msg: FfmpegMsg) {
        if !self.live.is_live(msg.ticket) {
            return;
        }
        self.state = match msg.result {
            Ok(status) => FfmpegState::Ready(status),
            Err(e) => {
                warn!(error = %e, "ffmpeg check failed");
                FfmpegState::Error(e.to_string())
            }
        };
    }

    /// One-line summary for the status bar.
    pub fn summary(&self) -> String {
        match &self.state {
            FfmpegState::Unknown => "FFmpeg: not checked".to_string(),
            FfmpegState::Checking => "FFmpeg: checking…".to_string(),
            FfmpegState::Ready(s) if s.available => {
                let origin = if s.is_bundled { "bundled" } else { "system" };
                format!("FFmpeg {} ({origin})", s.version.as_deref().unwrap_or("unknown version"))
            }
            FfmpegState::Ready(_) => "FFmpeg: not found".to_string(),
            FfmpegState::Error(e) => format!("FFmpeg: {e}"),
        }
    }
}
