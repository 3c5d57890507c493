use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bridge::commands::CredentialType;
use bridge::Bridge;
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use eframe::egui::{self, TextureHandle};
use futures::future::BoxFuture;
use tokio::runtime::Runtime;

use crate::host;
use crate::interaction::{TimelineInteraction, Transport};
use crate::jobs_crate::{PreviewHandle, PreviewScheduler};
use crate::panels_crate::{AssistantMsg, AssistantPanel, FfmpegMsg, FfmpegPanel, SettingsMsg, SettingsPanel};
use crate::timeline_crate::drag::PlaybackControl;
use crate::timeline_crate::scene::SceneCache;
use crate::timeline_crate::{
    AssetKind, MemoryStore, Sequence, SequenceFormat, Store, TimelineConfig, TimelineGeometry, Track, TrackKind,
};

/// Replies from bridge calls, delivered back on the UI thread.
pub(crate) enum UiMsg {
    Settings(SettingsMsg),
    Ffmpeg(FfmpegMsg),
    Assistant(AssistantMsg),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LibraryAsset {
    pub path: String,
    pub kind: Option<AssetKind>,
}

impl LibraryAsset {
    pub fn name(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone())
    }

    /// JSON carried by a library drag; asset ids are file paths.
    pub fn payload(&self) -> String {
        let kind = self.kind.and_then(|k| serde_json::to_value(k).ok());
        serde_json::json!({ "id": self.path, "kind": kind }).to_string()
    }
}

pub(crate) fn kind_for_path(path: &str) -> Option<AssetKind> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "mov" | "mkv" | "webm" | "avi" | "m4v" => Some(AssetKind::Video),
        "wav" | "mp3" | "flac" | "aac" | "ogg" | "m4a" | "opus" => Some(AssetKind::Audio),
        "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" => Some(AssetKind::Image),
        "srt" | "vtt" | "ass" => Some(AssetKind::Caption),
        _ => None,
    }
}

pub(crate) fn default_sequence() -> Sequence {
    let mut seq = Sequence::new("Main", SequenceFormat::default());
    seq.add_track(Track::new("V1", TrackKind::Video));
    seq.add_track(Track::new("V2", TrackKind::Overlay));
    seq.add_track(Track::new("A1", TrackKind::Audio));
    seq.add_track(Track::new("C1", TrackKind::Caption));
    seq
}

pub(crate) struct App {
    pub(crate) config: TimelineConfig,
    pub(crate) store: MemoryStore<Sequence>,
    pub(crate) snapshot: Sequence,
    pub(crate) snapshot_rev: u64,
    pub(crate) interaction: TimelineInteraction,
    pub(crate) transport: Transport,
    pub(crate) zoom: f64,
    pub(crate) scroll_x: f64,
    pub(crate) snap_enabled: bool,
    pub(crate) scene_cache: SceneCache,
    pub(crate) previews: PreviewScheduler,
    pub(crate) textures: HashMap<String, TextureHandle>,
    pub(crate) broken_textures: HashSet<String>,
    pub(crate) assets: Vec<LibraryAsset>,
    pub(crate) import_path: String,
    pub(crate) settings: SettingsPanel,
    pub(crate) ffmpeg: FfmpegPanel,
    pub(crate) assistant: AssistantPanel,
    pub(crate) key_drafts: HashMap<CredentialType, String>,
    pub(crate) show_settings: bool,
    pub(crate) show_assistant: bool,
    pub(crate) show_previews: bool,
    runtime: Runtime,
    tx: Sender<UiMsg>,
    rx: Receiver<UiMsg>,
    egui_ctx: egui::Context,
    last_frame: Instant,
}

impl App {
    pub(crate) fn new(
        cc: &eframe::CreationContext<'_>,
        config: TimelineConfig,
        sequence: Sequence,
        previews: PreviewHandle,
        runtime: Runtime,
    ) -> Self {
        let bridge: Arc<dyn Bridge> = Arc::new(host::router());
        let store = MemoryStore::new(sequence);
        let ctx = cc.egui_ctx.clone();
        let repaint = ctx.clone();
        store.subscribe(Arc::new(move |_: &Sequence| repaint.request_repaint()));

        let snapshot = store.get();
        let (tx, rx) = unbounded();
        let settings = SettingsPanel::new(bridge.clone(), host::load_ai_settings())
            .with_on_error(|e| tracing::warn!(error = %e, "settings"));
        let mut interaction = TimelineInteraction::new(&config);
        interaction.set_snap_enabled(config.snap_enabled);
        let mut app = Self {
            zoom: config.default_zoom,
            snap_enabled: config.snap_enabled,
            transport: Transport { duration: snapshot.duration(), ..Default::default() },
            snapshot_rev: store.revision(),
            snapshot,
            store,
            interaction,
            scroll_x: 0.0,
            scene_cache: SceneCache::new(),
            previews: PreviewScheduler::new(previews),
            textures: HashMap::new(),
            broken_textures: HashSet::new(),
            assets: Vec::new(),
            import_path: String::new(),
            settings,
            ffmpeg: FfmpegPanel::new(bridge.clone()),
            assistant: AssistantPanel::new(bridge),
            key_drafts: HashMap::new(),
            show_settings: false,
            show_assistant: false,
            show_previews: false,
            runtime,
            tx,
            rx,
            egui_ctx: ctx,
            last_frame: Instant::now(),
            config,
        };
        let models = app.settings.load_models();
        app.spawn(models, UiMsg::Settings);
        let creds = app.settings.refresh_credentials();
        app.spawn(creds, UiMsg::Settings);
        let check = app.ffmpeg.check();
        app.spawn(check, UiMsg::Ffmpeg);
        app
    }

    /// Runs a panel action on the runtime and routes its message back here.
    pub(crate) fn spawn<M: Send + 'static>(&self, fut: BoxFuture<'static, M>, wrap: fn(M) -> UiMsg) {
        let tx = self.tx.clone();
        let ctx = self.egui_ctx.clone();
        self.runtime.spawn(async move {
            let msg = fut.await;
            if tx.send(wrap(msg)).is_ok() {
                ctx.request_repaint();
            }
        });
    }

    fn drain_messages(&mut self) {
        loop {
            select! {
                recv(self.rx) -> msg => match msg {
                    Ok(UiMsg::Settings(m)) => self.settings.update(m),
                    Ok(UiMsg::Ffmpeg(m)) => self.ffmpeg.update(m),
                    Ok(UiMsg::Assistant(m)) => self.assistant.update(m),
                    Err(_) => break,
                },
                default => break,
            }
        }
    }

    pub(crate) fn add_asset(&mut self, path: String) -> LibraryAsset {
        if let Some(existing) = self.assets.iter().find(|a| a.path == path) {
            return existing.clone();
        }
        let asset = LibraryAsset { kind: kind_for_path(&path), path };
        tracing::info!(path = %asset.path, kind = ?asset.kind, "asset added");
        self.assets.push(asset.clone());
        asset
    }

    fn import_from_path(&mut self) {
        let path = std::mem::take(&mut self.import_path);
        let path = path.trim();
        if path.is_empty() {
            return;
        }
        if Path::new(path).exists() {
            self.add_asset(path.to_string());
        } else {
            tracing::warn!(%path, "import path does not exist");
        }
    }

    fn hotkeys(&mut self, ctx: &egui::Context) {
        if ctx.memory(|m| m.focused().is_some()) {
            return;
        }
        let (space, split) = ctx.input(|i| (i.key_pressed(egui::Key::Space), i.key_pressed(egui::Key::K)));
        if space {
            self.transport.toggle();
        }
        if split {
            self.split_at_playhead();
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let label = if self.transport.is_playing() { "Pause (Space)" } else { "Play (Space)" };
                if ui.button(label).clicked() {
                    self.transport.toggle();
                }
                ui.monospace(format!("{:.2}s / {:.2}s", self.transport.time, self.transport.duration));
                ui.separator();
                if ui.checkbox(&mut self.snap_enabled, "Snap").changed() {
                    self.interaction.set_snap_enabled(self.snap_enabled);
                }
                if ui.button("Fit").clicked() {
                    let width = ui.ctx().screen_rect().width() as f64 - self.config.header_width;
                    let geometry = TimelineGeometry::new(self.zoom, 0.0, self.config.header_width, width);
                    self.zoom = geometry.fit_zoom(self.snapshot.duration());
                    self.scroll_x = 0.0;
                }
                if ui.button("Split (K)").clicked() {
                    self.split_at_playhead();
                }
                ui.separator();
                ui.toggle_value(&mut self.show_previews, "Previews");
                ui.toggle_value(&mut self.show_assistant, "Assistant");
                if ui.toggle_value(&mut self.show_settings, "Settings").clicked() && self.show_settings {
                    let fut = self.settings.refresh_credentials();
                    self.spawn(fut, UiMsg::Settings);
                }
                ui.separator();
                ui.label(self.ffmpeg.summary());
            });
        });
    }

    fn library_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("library").resizable(true).default_width(220.0).show(ctx, |ui| {
            ui.heading("Library");
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.import_path);
                if ui.button("Add").clicked() {
                    self.import_from_path();
                }
            });
            if ui.button("Browse…").clicked() {
                if let Some(files) = rfd::FileDialog::new().pick_files() {
                    for f in files {
                        self.add_asset(f.display().to_string());
                    }
                }
            }
            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                for asset in &self.assets {
                    let id = egui::Id::new(("asset", &asset.path));
                    ui.dnd_drag_source(id, asset.payload(), |ui| {
                        let kind = asset.kind.map(|k| format!("{k:?}")).unwrap_or_else(|| "?".into());
                        ui.label(format!("[{kind}] {}", asset.name()));
                    })
                    .response
                    .on_hover_text(&asset.path);
                }
            });
        });
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;

        self.drain_messages();
        self.transport.tick(dt);
        if self.transport.is_playing() {
            ctx.request_repaint();
        }
        if self.poll_previews() > 0 {
            ctx.request_repaint();
        } else if self.previews.in_flight() > 0 {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
        self.hotkeys(ctx);

        self.top_bar(ctx);
        self.library_panel(ctx);
        self.assistant_panel(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                self.timeline_ui(ui);
            });
        });
        self.settings_window(ctx);
        self.previews_window(ctx);
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.settings.unmount();
        self.ffmpeg.unmount();
        self.assistant.unmount();
        if let Err(e) = self.previews.handle().shutdown() {
            tracing::warn!(error = %e, "preview workers did not stop cleanly");
        }
    }
}
