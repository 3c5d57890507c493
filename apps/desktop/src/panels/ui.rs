use bridge::commands::{CredentialType, EditContext, ProviderType};
use eframe::egui::{self, Color32, RichText};

use crate::panels_crate::{ChatRole, FfmpegState, ModelListState};
use crate::{App, UiMsg};

const ERROR_COLOR: Color32 = Color32::from_rgb(220, 90, 90);

impl App {
    pub(crate) fn settings_window(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }
        let mut open = true;
        egui::Window::new("AI Settings").open(&mut open).resizable(true).show(ctx, |ui| {
            self.settings_section(ui);
            ui.separator();
            self.credentials_section(ui);
            ui.separator();
            self.ffmpeg_section(ui);
        });
        if !open {
            self.show_settings = false;
            self.settings.unmount();
        }
    }

    fn settings_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Provider");
        let current = self.settings.draft.primary_provider;
        let mut chosen = current;
        egui::ComboBox::from_label("Primary provider")
            .selected_text(current.label())
            .show_ui(ui, |ui| {
                for p in ProviderType::ALL {
                    ui.selectable_value(&mut chosen, p, p.label());
                }
            });
        if chosen != current {
            if let Some(fut) = self.settings.set_provider(chosen) {
                self.spawn(fut, UiMsg::Settings);
            }
        }

        let models = self.settings.models().clone();
        ui.horizontal(|ui| {
            egui::ComboBox::from_label("Model")
                .selected_text(self.settings.draft.primary_model.clone())
                .show_ui(ui, |ui| {
                    for m in models.models() {
                        ui.selectable_value(&mut self.settings.draft.primary_model, m.id.clone(), &m.name);
                    }
                });
            if matches!(models, ModelListState::Loading) {
                ui.spinner();
            } else if ui.small_button("Reload").clicked() {
                let fut = self.settings.load_models();
                self.spawn(fut, UiMsg::Settings);
            }
        });
        if let Some(err) = models.error() {
            ui.colored_label(ERROR_COLOR, format!("Using built-in model list: {err}"));
        }

        let draft = &mut self.settings.draft;
        ui.add(egui::Slider::new(&mut draft.temperature, 0.0..=1.0).text("Temperature"));
        ui.add(egui::Slider::new(&mut draft.max_tokens, 256..=128_000).logarithmic(true).text("Max tokens"));
        ui.add(egui::Slider::new(&mut draft.frame_extraction_rate, 0.5..=2.0).text("Frames per second for analysis"));
        ui.add(egui::Slider::new(&mut draft.per_request_limit_cents, 1..=500).text("Per-request limit (¢)"));
        ui.add(egui::Slider::new(&mut draft.cache_duration_hours, 1..=168).text("Cache duration (h)"));
        ui.checkbox(&mut draft.local_only_mode, "Local only");

        ui.horizontal(|ui| {
            let can_save = self.settings.is_dirty() && !self.settings.is_saving();
            if ui.add_enabled(can_save, egui::Button::new("Save")).clicked() {
                let fut = self.settings.save();
                self.spawn(fut, UiMsg::Settings);
            }
            if self.settings.is_saving() {
                ui.spinner();
            }
        });
        if let Some(err) = self.settings.save_error() {
            ui.colored_label(ERROR_COLOR, err);
        }
    }

    fn credentials_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("API keys");
        for ty in [CredentialType::Openai, CredentialType::Anthropic, CredentialType::Google] {
            ui.horizontal(|ui| {
                let present = self.settings.has_credential(ty);
                ui.label(format!("{ty:?}"));
                ui.label(if present { "stored" } else { "missing" });
                let entry = self.key_drafts.entry(ty).or_default();
                ui.add(egui::TextEdit::singleline(entry).password(true).desired_width(180.0));
                if ui.small_button("Save").clicked() {
                    let value = std::mem::take(entry);
                    if let Ok(fut) = self.settings.store_credential(ty, value) {
                        self.spawn(fut, UiMsg::Settings);
                    }
                }
                if present && ui.small_button("Delete").clicked() {
                    let fut = self.settings.delete_credential(ty);
                    self.spawn(fut, UiMsg::Settings);
                }
            });
        }
        if let Some(err) = self.settings.credential_error() {
            ui.colored_label(ERROR_COLOR, err);
        }
    }

    fn ffmpeg_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("FFmpeg");
        ui.horizontal(|ui| {
            ui.label(self.ffmpeg.summary());
            if matches!(self.ffmpeg.state(), FfmpegState::Checking) {
                ui.spinner();
            } else if ui.small_button("Check again").clicked() {
                let fut = self.ffmpeg.check();
                self.spawn(fut, UiMsg::Ffmpeg);
            }
        });
        if let FfmpegState::Ready(status) = self.ffmpeg.state() {
            if let Some(p) = &status.ffmpeg_path {
                ui.monospace(format!("ffmpeg:  {p}"));
            }
            if let Some(p) = &status.ffprobe_path {
                ui.monospace(format!("ffprobe: {p}"));
            }
        }
    }

    pub(crate) fn assistant_panel(&mut self, ctx: &egui::Context) {
        if !self.show_assistant {
            return;
        }
        egui::SidePanel::right("assistant").resizable(true).default_width(300.0).show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Assistant");
                if ui.small_button("Clear").clicked() {
                    self.assistant.clear();
                }
            });
            ui.separator();
            egui::ScrollArea::vertical().stick_to_bottom(true).max_height(ui.available_height() - 80.0).show(ui, |ui| {
                for entry in self.assistant.history() {
                    let (who, color) = match entry.role {
                        ChatRole::User => ("You", Color32::LIGHT_GRAY),
                        ChatRole::Assistant => ("AI", Color32::from_rgb(120, 180, 240)),
                        ChatRole::Error => ("Error", ERROR_COLOR),
                    };
                    ui.label(RichText::new(who).strong().color(color));
                    ui.label(&entry.text);
                    if let Some(script) = &entry.script {
                        for cmd in &script.commands {
                            ui.monospace(format!("• {} {}", cmd.command_type, cmd.params));
                        }
                    }
                    ui.add_space(6.0);
                }
                if self.assistant.is_pending() {
                    ui.spinner();
                }
            });
            ui.separator();
            let edit = ui.add(egui::TextEdit::multiline(&mut self.assistant.input).desired_rows(2).hint_text("Describe an edit…"));
            let send = ui.add_enabled(!self.assistant.is_pending(), egui::Button::new("Send")).clicked()
                || (edit.has_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter) && i.modifiers.command));
            if send {
                let context = self.edit_context();
                match self.assistant.submit(context) {
                    Ok(fut) => self.spawn(fut, UiMsg::Assistant),
                    Err(e) => tracing::debug!(error = %e, "assistant submit refused"),
                }
            }
        });
    }

    fn edit_context(&self) -> EditContext {
        let seq = &self.snapshot;
        EditContext {
            project_name: Some(seq.name.clone()),
            timeline_duration: seq.duration(),
            asset_ids: self.assets.iter().map(|a| a.path.clone()).collect(),
            track_ids: seq.tracks.iter().map(|t| t.id.clone()).collect(),
            playhead_position: self.transport.time,
            selected_clips: self.interaction.selection.clips().to_vec(),
        }
    }
}
