use std::time::Instant;

use eframe::egui::{self, pos2, vec2, Align2, Color32, FontId, Rect, Sense, Stroke};

use crate::interaction::Layout;
use crate::jobs_crate::PreviewRequest;
use crate::timeline_crate::drag::Modifiers;
use crate::timeline_crate::drop::{handle_asset_drop, DropContext, DropPayload};
use crate::timeline_crate::edit::StoreEditor;
use crate::timeline_crate::ops::{split_request, TimelineOps, TrackToggle};
use crate::timeline_crate::scene::{SceneInput, ScenePrimitive};
use crate::timeline_crate::{Rect as TRect, Store, TimelineGeometry, TrackKind, TrackRows};
use crate::App;

const WAVEFORM_SIZE: (u32, u32) = (1024, 64);
const MAX_TEXTURE_LOADS_PER_FRAME: usize = 4;
const TOGGLE_SIZE: f32 = 18.0;

pub(crate) fn parse_hex_color(hex: &str) -> Option<Color32> {
    let trimmed = hex.trim_start_matches('#');
    if trimmed.len() == 6 {
        if let Ok(v) = u32::from_str_radix(trimmed, 16) {
            let r = ((v >> 16) & 0xff) as u8;
            let g = ((v >> 8) & 0xff) as u8;
            let b = (v & 0xff) as u8;
            return Some(Color32::from_rgb(r, g, b));
        }
    }
    None
}

fn track_color(kind: TrackKind) -> Color32 {
    match kind {
        TrackKind::Audio => Color32::from_rgb(40, 120, 40),
        TrackKind::Caption => Color32::from_rgb(150, 80, 150),
        TrackKind::Overlay => Color32::from_rgb(200, 140, 60),
        TrackKind::Video => Color32::from_rgb(40, 90, 160),
    }
}

fn to_screen(origin: egui::Pos2, r: &TRect) -> Rect {
    Rect::from_min_max(
        pos2(origin.x + r.x0 as f32, origin.y + r.y0 as f32),
        pos2(origin.x + r.x1 as f32, origin.y + r.y1 as f32),
    )
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum HeaderToggle { Mute, Lock, Visibility }

/// M / L / V squares at the right edge of a track header.
fn header_toggles(header: Rect) -> [(Rect, HeaderToggle, &'static str); 3] {
    let y = header.center().y - TOGGLE_SIZE / 2.0;
    let at = |i: f32| Rect::from_min_size(pos2(header.right() - (TOGGLE_SIZE + 4.0) * i, y), vec2(TOGGLE_SIZE, TOGGLE_SIZE));
    [
        (at(3.0), HeaderToggle::Mute, "M"),
        (at(2.0), HeaderToggle::Lock, "L"),
        (at(1.0), HeaderToggle::Visibility, "V"),
    ]
}

/// Ruler tick spacing: the smallest step at least 60px wide.
fn ruler_step(zoom: f64) -> f64 {
    [0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 300.0]
        .into_iter()
        .find(|s| s * zoom >= 60.0)
        .unwrap_or(600.0)
}

fn format_time(t: f64) -> String {
    let total = t.max(0.0);
    let m = (total / 60.0).floor();
    let s = total - m * 60.0;
    format!("{:02}:{:05.2}", m as u64, s)
}

/// Thumbnail frames are taken on a fixed grid so keys survive zooming.
const THUMB_GRID_SECS: f64 = 0.5;

fn thumb_time(source_time: f64) -> f64 { (source_time.max(0.0) / THUMB_GRID_SECS).round() * THUMB_GRID_SECS }

fn thumb_key(asset_id: &str, source_time: f64) -> String { format!("thumb:{asset_id}:{:.2}", thumb_time(source_time)) }

fn wave_key(asset_id: &str) -> String { format!("wave:{asset_id}") }

impl App {
    /// Pulls a fresh copy of the sequence when the store moved on.
    pub(crate) fn refresh_snapshot(&mut self) {
        let rev = self.store.revision();
        if rev != self.snapshot_rev {
            self.snapshot = self.store.get();
            self.snapshot_rev = rev;
            self.transport.duration = self.snapshot.duration();
        }
    }

    fn texture_for(&mut self, ctx: &egui::Context, key: &str, loads: &mut usize) -> Option<egui::TextureId> {
        if let Some(t) = self.textures.get(key) {
            return Some(t.id());
        }
        if self.broken_textures.contains(key) || *loads >= MAX_TEXTURE_LOADS_PER_FRAME {
            return None;
        }
        let path = self.previews.get(key)?.path.clone();
        *loads += 1;
        match image::open(&path) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                let color = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                let handle = ctx.load_texture(key, color, egui::TextureOptions::LINEAR);
                let id = handle.id();
                self.textures.insert(key.to_string(), handle);
                Some(id)
            }
            Err(e) => {
                tracing::warn!(%path, error = %e, "preview image unreadable");
                self.broken_textures.insert(key.to_string());
                None
            }
        }
    }

    fn toggle_track(&mut self, track_index: usize, which: HeaderToggle) {
        let Some(track) = self.snapshot.tracks.get(track_index) else { return };
        let mut editor = StoreEditor::new(&self.store);
        match which {
            HeaderToggle::Mute => editor.on_track_mute_toggle(TrackToggle { track_id: track.id.clone(), value: !track.muted }),
            HeaderToggle::Lock => editor.on_track_lock_toggle(TrackToggle { track_id: track.id.clone(), value: !track.locked }),
            HeaderToggle::Visibility => {
                editor.on_track_visibility_toggle(TrackToggle { track_id: track.id.clone(), value: !track.visible })
            }
        }
    }

    /// Splits every selected clip under the playhead.
    pub(crate) fn split_at_playhead(&mut self) {
        let time = self.transport.time;
        let requests: Vec<_> = self
            .interaction
            .selection
            .clips()
            .iter()
            .filter_map(|id| self.snapshot.find_clip(id))
            .filter_map(|(track, clip)| split_request(&track.id, clip, time))
            .collect();
        let mut editor = StoreEditor::new(&self.store);
        for req in requests {
            editor.on_clip_split(req);
        }
    }

    pub(crate) fn timeline_ui(&mut self, ui: &mut egui::Ui) {
        self.refresh_snapshot();
        let cfg = self.config.clone();
        let track_count = self.snapshot.tracks.len();
        let content_h = (cfg.ruler_height + cfg.track_height * track_count as f64) as f32;
        let size = vec2(ui.available_width(), content_h.max(ui.available_height()));
        let (canvas, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let origin = canvas.min;
        let header_w = cfg.header_width as f32;

        // horizontal wheel pans, ctrl/pinch zooms
        if response.hovered() {
            let (scroll, zoom_delta, hover) = ui.input(|i| (i.smooth_scroll_delta, i.zoom_delta(), i.pointer.hover_pos()));
            if zoom_delta != 1.0 {
                let anchor = hover.map(|p| (p.x - origin.x) as f64).unwrap_or(cfg.header_width);
                let mut g = TimelineGeometry::new(self.zoom, self.scroll_x, cfg.header_width, 0.0);
                g.zoom_around(self.zoom * zoom_delta as f64, anchor);
                self.zoom = g.zoom;
                self.scroll_x = g.scroll_x;
            } else if scroll.x != 0.0 {
                self.scroll_x = (self.scroll_x - scroll.x as f64).max(0.0);
            }
        }

        let layout = Layout {
            geometry: TimelineGeometry::new(self.zoom, self.scroll_x, cfg.header_width, (canvas.width() - header_w).max(0.0) as f64),
            rows: TrackRows::new(cfg.ruler_height, cfg.track_height, track_count),
        };

        // pointer routing
        let (pressed, released, pos, mods, focused) = ui.input(|i| {
            (i.pointer.primary_pressed(), i.pointer.primary_released(), i.pointer.interact_pos(), i.modifiers, i.focused)
        });
        let local = pos.map(|p| ((p.x - origin.x) as f64, (p.y - origin.y) as f64));
        if let (true, Some((x, y)), Some(p)) = (pressed, local, pos) {
            if canvas.contains(p) {
                let header_hit = (x < cfg.header_width)
                    .then(|| layout.rows.row_at(y))
                    .flatten()
                    .and_then(|row| {
                        let header = to_screen(origin, &layout.rows.row_rect(row, 0.0, cfg.header_width));
                        header_toggles(header).into_iter().find(|(r, _, _)| r.contains(p)).map(|(_, t, _)| (row, t))
                    });
                if let Some((row, toggle)) = header_hit {
                    self.toggle_track(row, toggle);
                } else {
                    let modifiers = Modifiers { shift: mods.shift, ctrl: mods.command, alt: mods.alt };
                    self.interaction.pointer_down(x, y, modifiers, &self.snapshot, &layout, &mut self.transport);
                }
            }
        }
        if self.interaction.active().is_some() {
            if let Some((x, y)) = local {
                self.interaction.pointer_move(x, y, &self.snapshot, &layout, &mut self.transport);
                self.scroll_x = (self.scroll_x + self.interaction.auto_scroll).max(0.0);
            }
            if released {
                let mut editor = StoreEditor::new(&self.store);
                self.interaction.pointer_up(&mut editor, &mut self.transport);
            } else if !focused || ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                self.interaction.cancel(&mut self.transport);
            }
            ui.ctx().request_repaint();
        }
        self.interaction.flush_frame(Instant::now(), &layout.geometry);
        self.refresh_snapshot();

        let scene = {
            let input = SceneInput {
                sequence: &self.snapshot,
                geometry: &layout.geometry,
                rows: &layout.rows,
                selection: &self.interaction.selection,
                playhead: self.transport.time,
                overlay: self.interaction.overlay(),
                ruler_height: cfg.ruler_height,
                buffer_px: cfg.buffer_px,
                tile_width: Some(cfg.thumbnail_tile_width),
            };
            self.scene_cache.get_or_build(self.snapshot_rev, &input).clone()
        };

        let painter = ui.painter_at(canvas);
        let body = painter.with_clip_rect(Rect::from_min_max(pos2(origin.x + header_w, canvas.top()), canvas.max));
        painter.rect_filled(canvas, 0.0, Color32::from_gray(24));
        let ruler = Rect::from_min_max(pos2(origin.x + header_w, canvas.top()), pos2(canvas.right(), origin.y + cfg.ruler_height as f32));
        painter.rect_filled(ruler, 0.0, Color32::from_gray(36));

        let step = ruler_step(layout.geometry.zoom());
        let window_start = (self.scroll_x / layout.geometry.zoom() / step).floor() * step;
        let mut t = window_start;
        while layout.geometry.time_to_pixel(t) < canvas.width() as f64 {
            let x = origin.x + layout.geometry.time_to_pixel(t) as f32;
            body.line_segment([pos2(x, ruler.bottom() - 6.0), pos2(x, ruler.bottom())], Stroke::new(1.0, Color32::GRAY));
            body.text(pos2(x + 2.0, ruler.top() + 2.0), Align2::LEFT_TOP, format_time(t), FontId::monospace(10.0), Color32::GRAY);
            t += step;
        }

        let ctx = ui.ctx().clone();
        let mut loads = 0usize;
        let mut wanted: Vec<PreviewRequest> = Vec::new();
        for prim in &scene.primitives {
            match prim {
                ScenePrimitive::TrackRow { index, kind, name, rect, muted, locked, visible, selected, .. } => {
                    let row = to_screen(origin, rect);
                    let shade = if index % 2 == 0 { 30 } else { 34 };
                    painter.rect_filled(row, 0.0, Color32::from_gray(shade));
                    let header = Rect::from_min_max(row.min, pos2(row.left() + header_w, row.bottom()));
                    let fill = if *selected { Color32::from_gray(60) } else { Color32::from_gray(44) };
                    painter.rect_filled(header, 0.0, fill);
                    painter.rect_filled(Rect::from_min_size(header.min, vec2(4.0, header.height())), 0.0, track_color(*kind));
                    painter.text(
                        pos2(header.left() + 10.0, header.center().y),
                        Align2::LEFT_CENTER,
                        format!("{} {}", kind.short_label(), name),
                        FontId::proportional(12.0),
                        Color32::LIGHT_GRAY,
                    );
                    for (r, toggle, label) in header_toggles(header) {
                        let on = match toggle {
                            HeaderToggle::Mute => *muted,
                            HeaderToggle::Lock => *locked,
                            HeaderToggle::Visibility => !*visible,
                        };
                        painter.rect_filled(r, 3.0, if on { Color32::from_rgb(200, 140, 60) } else { Color32::from_gray(70) });
                        painter.text(r.center(), Align2::CENTER_CENTER, label, FontId::monospace(11.0), Color32::WHITE);
                    }
                    painter.line_segment([row.left_bottom(), row.right_bottom()], Stroke::new(1.0, Color32::from_gray(20)));
                }
                ScenePrimitive::ClipBox { clip_id, track_id, label, color, rect, region, selected, dragging } => {
                    let r = to_screen(origin, rect).shrink2(vec2(0.0, 2.0));
                    let kind = self.snapshot.track(track_id).map(|t| t.kind).unwrap_or(TrackKind::Video);
                    let fill = color.as_deref().and_then(parse_hex_color).unwrap_or_else(|| track_color(kind));
                    let fill = if *dragging { fill.gamma_multiply(0.7) } else { fill };
                    body.rect_filled(r, 4.0, fill);
                    let asset = self.snapshot.find_clip(clip_id).map(|(_, c)| c.asset_id.clone());
                    if let (TrackKind::Audio, Some(asset)) = (kind, asset) {
                        let key = wave_key(&asset);
                        wanted.push(PreviewRequest::waveform(key.clone(), asset, WAVEFORM_SIZE.0, WAVEFORM_SIZE.1));
                        if let Some(tex) = self.texture_for(&ctx, &key, &mut loads) {
                            // waveform covers the whole asset; show only the trimmed slice
                            let u0 = (region.offset_percent / 100.0) as f32;
                            let u1 = ((region.offset_percent + region.width_percent) / 100.0) as f32;
                            body.image(tex, r, Rect::from_min_max(pos2(u0, 0.0), pos2(u1, 1.0)), Color32::WHITE);
                        }
                    }
                    let stroke = if *selected { Stroke::new(2.0, Color32::WHITE) } else { Stroke::new(1.0, Color32::from_gray(15)) };
                    body.rect_stroke(r, 4.0, stroke);
                    body.text(r.left_top() + vec2(6.0, 4.0), Align2::LEFT_TOP, label, FontId::proportional(11.0), Color32::WHITE);
                }
                ScenePrimitive::Thumbnail { asset_id, rect, source_time, .. } => {
                    let r = to_screen(origin, rect).shrink2(vec2(1.0, 14.0));
                    let key = thumb_key(asset_id, *source_time);
                    wanted.push(PreviewRequest::thumbnail(key.clone(), asset_id.clone(), thumb_time(*source_time)));
                    match self.texture_for(&ctx, &key, &mut loads) {
                        Some(tex) => body.image(tex, r, Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)), Color32::WHITE),
                        None => body.rect_filled(r, 0.0, Color32::from_black_alpha(40)),
                    };
                }
                ScenePrimitive::CaptionPin { rect, text, .. } => {
                    let r = to_screen(origin, rect);
                    body.rect_filled(r, 2.0, Color32::from_rgba_unmultiplied(150, 80, 150, 160));
                    body.text(r.left_center() + vec2(3.0, 0.0), Align2::LEFT_CENTER, text, FontId::proportional(10.0), Color32::WHITE);
                }
                ScenePrimitive::MarkerPin { x, label, color, .. } => {
                    let x = origin.x + *x as f32;
                    let c = parse_hex_color(color).unwrap_or(Color32::YELLOW);
                    body.line_segment([pos2(x, ruler.top()), pos2(x, canvas.bottom())], Stroke::new(1.0, c.gamma_multiply(0.5)));
                    body.circle_filled(pos2(x, ruler.top() + 6.0), 4.0, c);
                    body.text(pos2(x + 6.0, ruler.top() + 1.0), Align2::LEFT_TOP, label, FontId::proportional(10.0), c);
                }
                ScenePrimitive::SnapGuide { x, kind } => {
                    let x = origin.x + *x as f32;
                    let c = parse_hex_color(kind.color()).unwrap_or(Color32::LIGHT_BLUE);
                    body.line_segment([pos2(x, canvas.top()), pos2(x, canvas.bottom())], Stroke::new(1.5, c));
                    body.text(pos2(x + 4.0, ruler.bottom() + 2.0), Align2::LEFT_TOP, kind.label(), FontId::proportional(10.0), c);
                }
                ScenePrimitive::Marquee { rect } => {
                    let r = to_screen(origin, rect);
                    body.rect_filled(r, 0.0, Color32::from_rgba_unmultiplied(120, 180, 240, 30));
                    body.rect_stroke(r, 0.0, Stroke::new(1.0, Color32::from_rgb(120, 180, 240)));
                }
                ScenePrimitive::Playhead { x } => {
                    let x = origin.x + *x as f32;
                    body.line_segment([pos2(x, canvas.top()), pos2(x, canvas.bottom())], Stroke::new(2.0, Color32::from_rgb(240, 80, 80)));
                }
            }
        }
        for key in self.previews.update_visible(wanted) {
            self.textures.remove(&key);
            self.broken_textures.remove(&key);
        }

        if let (Some(text), Some(p)) = (self.interaction.audio_readout(), pos) {
            painter.text(p + vec2(12.0, -12.0), Align2::LEFT_BOTTOM, text, FontId::monospace(11.0), Color32::WHITE);
        }

        self.handle_drops(ui, &response, canvas, &cfg, &layout);
    }

    fn handle_drops(&mut self, ui: &egui::Ui, response: &egui::Response, canvas: Rect, cfg: &crate::timeline_crate::TimelineConfig, layout: &Layout) {
        let origin = canvas.min;
        let rows = TrackRows::new(origin.y as f64 + cfg.ruler_height, cfg.track_height, self.snapshot.tracks.len());
        let pointer = ui.input(|i| i.pointer.hover_pos());

        if let (Some(payload), Some(p)) = (response.dnd_hover_payload::<String>(), pointer) {
            let ctx = DropContext { sequence: &self.snapshot, geometry: &layout.geometry, rows: &rows, container_left: origin.x as f64 };
            let ok = DropPayload::parse(Some(payload.as_str()), None)
                .map(|pl| ctx.evaluate(&pl, p.x as f64, p.y as f64).is_ok())
                .unwrap_or(false);
            if let Some(row) = rows.row_at(p.y as f64) {
                let r = Rect::from_min_max(
                    pos2(canvas.left(), rows.row_top(row) as f32),
                    pos2(canvas.right(), (rows.row_top(row) + rows.track_height) as f32),
                );
                let c = if ok { Color32::from_rgba_unmultiplied(80, 200, 120, 40) } else { Color32::from_rgba_unmultiplied(220, 80, 80, 40) };
                ui.painter().rect_filled(r, 0.0, c);
            }
        }

        let mut drops: Vec<(String, egui::Pos2)> = Vec::new();
        if let (Some(payload), Some(p)) = (response.dnd_release_payload::<String>(), pointer) {
            drops.push((payload.as_str().to_owned(), p));
        }
        let files = ui.input(|i| i.raw.dropped_files.clone());
        if let Some(p) = pointer.filter(|p| canvas.contains(*p)) {
            for file in files {
                let Some(path) = file.path else { continue };
                let asset = self.add_asset(path.display().to_string());
                drops.push((asset.payload(), p));
            }
        }
        if drops.is_empty() {
            return;
        }

        let mut editor = StoreEditor::new(&self.store);
        let ctx = DropContext { sequence: &self.snapshot, geometry: &layout.geometry, rows: &rows, container_left: origin.x as f64 };
        for (payload, p) in drops {
            let _ = handle_asset_drop(Some(&payload), None, p.x as f64, p.y as f64, &ctx, &mut editor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#ff8000"), Some(Color32::from_rgb(255, 128, 0)));
        assert_eq!(parse_hex_color("fff"), None);
    }

    #[test]
    fn ruler_step_keeps_labels_apart() {
        assert_eq!(ruler_step(100.0), 1.0);
        assert_eq!(ruler_step(10.0), 10.0);
        assert_eq!(ruler_step(1000.0), 0.1);
        assert_eq!(format_time(65.5), "01:05.50");
    }

    #[test]
    fn thumb_keys_snap_to_grid() {
        assert_eq!(thumb_key("a", 1.13), "thumb:a:1.00");
        assert_eq!(thumb_key("a", 1.26), "thumb:a:1.50");
        assert_eq!(thumb_key("a", 0.97), thumb_key("a", 1.04));
        assert_eq!(thumb_time(-0.2), 0.0);
    }
}
