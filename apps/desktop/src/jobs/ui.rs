use eframe::egui;
use egui_extras::TableBuilder;

use crate::jobs_crate::SlotStatus;
use crate::App;

impl App {
    pub(crate) fn poll_previews(&mut self) -> usize {
        let ready = self.previews.poll();
        if ready > 0 {
            tracing::debug!(ready, in_flight = self.previews.in_flight(), "previews ready");
        }
        ready
    }

    pub(crate) fn previews_window(&mut self, ctx: &egui::Context) {
        if !self.show_previews {
            return;
        }

        let slots = self.previews.slots();
        let mut cancel: Option<String> = None;
        let mut retry: Option<String> = None;
        egui::Window::new("Previews")
            .open(&mut self.show_previews)
            .resizable(true)
            .show(ctx, |ui| {
                ui.label(format!(
                    "{} in flight, {} queued",
                    self.previews.in_flight(),
                    self.previews.handle().queued()
                ));
                TableBuilder::new(ui)
                    .striped(true)
                    .column(egui_extras::Column::auto())
                    .column(egui_extras::Column::remainder())
                    .header(18.0, |mut h| {
                        h.col(|ui| {
                            ui.strong("Slot");
                        });
                        h.col(|ui| {
                            ui.strong("Status");
                        });
                    })
                    .body(|mut b| {
                        for (key, status) in &slots {
                            b.row(20.0, |mut r| {
                                r.col(|ui| {
                                    ui.monospace(key);
                                });
                                r.col(|ui| match status {
                                    SlotStatus::InFlight { job_id } => {
                                        ui.label(format!("running {}", &job_id[..8.min(job_id.len())]));
                                        if ui.small_button("Cancel").clicked() {
                                            cancel = Some(key.clone());
                                        }
                                    }
                                    SlotStatus::Ready(out) => {
                                        ui.label(&out.path);
                                    }
                                    SlotStatus::Canceled => {
                                        ui.weak("canceled");
                                        if ui.small_button("Retry").clicked() {
                                            retry = Some(key.clone());
                                        }
                                    }
                                    SlotStatus::Failed(err) => {
                                        ui.colored_label(egui::Color32::from_rgb(220, 90, 90), err);
                                        if ui.small_button("Retry").clicked() {
                                            retry = Some(key.clone());
                                        }
                                    }
                                });
                            });
                        }
                    });
            });

        if let Some(key) = cancel {
            self.previews.cancel(&key);
        }
        if let Some(key) = retry {
            self.previews.invalidate(&key);
        }
    }
}
