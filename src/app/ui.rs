use super::ActionProgress;
use super::DropzoneApp;
use crate::adapters::{AdapterId, DriveEntry};
use crate::preview::PreviewContent;
use crate::selection::View;
use crate::upload::UploadStatus;
use crate::utils::FileSizeUtils;
use eframe::egui::{self, Align, Color32, RichText};

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const SUCCESS: Color32 = Color32::from_rgb(0, 180, 0);
const FAILURE: Color32 = Color32::from_rgb(220, 50, 50);
const MUTED: Color32 = Color32::from_rgb(150, 150, 150);

impl DropzoneApp {
    pub fn render(&mut self, ctx: &egui::Context) {
        // Only a visible drop zone accepts dropped files.
        self.drop_rect = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let total_height = ui.available_height();
            let footer_height = 40.0;
            let footer_margin = 15.0;
            let content_height = total_height - footer_height - footer_margin;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Dropzone Uploader");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new("Pick files from your device or the cloud and upload them")
                                .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });
                    ui.add_space(20.0);

                    match self.selection.view() {
                        View::Browsing => {
                            self.render_adapter_selector(ui);
                            ui.add_space(10.0);
                            self.render_dropzone(ui);
                        }
                        View::AddingMore => {
                            if ui.button("← Back to files").clicked() {
                                self.selection.cancel();
                            }
                            ui.add_space(10.0);
                            self.render_adapter_selector(ui);
                            ui.add_space(10.0);
                            self.render_dropzone(ui);
                        }
                        View::AdapterActive(id) => self.render_browser(ui, id),
                        View::Previewing => {
                            self.render_files(ui);
                            ui.add_space(20.0);
                            self.render_actions(ui);
                        }
                    }

                    ui.add_space(20.0);

                    if !matches!(self.state.progress, ActionProgress::NotStarted) {
                        self.render_progress(ui);
                    }

                    if !self.state.file_statuses.is_empty() {
                        ui.add_space(10.0);
                        self.render_details(ui);
                    }

                    ui.add_space(20.0);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(footer_margin);
                self.render_footer(ui);
            });
        });
    }

    fn render_adapter_selector(&mut self, ui: &mut egui::Ui) {
        let mut chosen = None;
        ui.group(|ui| {
            ui.label("Choose a source");
            ui.add_space(8.0);
            ui.horizontal_wrapped(|ui| {
                for descriptor in self.registry.list() {
                    let button = egui::Button::new(format!("{} {}", descriptor.icon, descriptor.title))
                        .min_size(egui::vec2(120.0, 32.0));
                    let response = ui.add_enabled(descriptor.enabled, button);
                    let response = if descriptor.enabled {
                        response
                    } else {
                        response.on_disabled_hover_text("Not configured")
                    };
                    if response.clicked() {
                        chosen = Some(descriptor.id);
                    }
                }
            });
        });

        if let Some(id) = chosen {
            self.choose_adapter(id);
        }
    }

    fn render_dropzone(&mut self, ui: &mut egui::Ui) {
        let height = if self.config.mini { 80.0 } else { 140.0 };
        let (rect, response) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), height),
            egui::Sense::click(),
        );
        self.drop_rect = Some(rect);

        let dragging = self.drag.is_dragging();
        let stroke_color = if dragging || response.hovered() {
            ACCENT
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke.color
        };
        let fill = if dragging {
            ACCENT.gamma_multiply(0.15)
        } else {
            ui.visuals().extreme_bg_color
        };
        ui.painter().rect(rect, 8.0, fill, egui::Stroke::new(2.0, stroke_color));

        let text = if dragging {
            "Release to add the files".to_string()
        } else {
            let noun = if self.config.allows_multiple() { "files" } else { "a file" };
            format!("📥 Drop {} here or click to browse", noun)
        };
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            text,
            egui::FontId::proportional(16.0),
            ui.visuals().text_color(),
        );

        if response.clicked() {
            self.choose_adapter(AdapterId::Internal);
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if self.config.allows_multiple() && ui.button("📁 Add Folder").clicked() {
                self.add_folder();
            }
            let mut hints = Vec::new();
            if let Some(accept) = &self.config.accept {
                hints.push(format!("Accepts: {}", accept));
            }
            if let Some(max) = self.config.max_file_bytes() {
                hints.push(format!("Max size: {}", FileSizeUtils::format_size(max)));
            }
            if let Some(limit) = self.config.max_files() {
                hints.push(format!("Up to {} file(s)", limit));
            }
            if !hints.is_empty() {
                ui.label(RichText::new(hints.join(" | ")).color(MUTED));
            }
        });
    }

    fn render_browser(&mut self, ui: &mut egui::Ui, id: AdapterId) {
        ui.horizontal(|ui| {
            if ui.button("← Back").clicked() {
                self.close_browser();
            }
            ui.heading(format!("{} {}", id.icon(), id.title()));
            if self.browser.loading {
                ui.spinner();
            }
        });
        ui.add_space(10.0);

        if id.is_cloud_drive() && self.browser.needs_sign_in {
            self.render_sign_in(ui, id);
            return;
        }

        if id == AdapterId::Link {
            ui.group(|ui| {
                ui.label("Paste a public file URL");
                ui.horizontal(|ui| {
                    let edit = egui::TextEdit::singleline(&mut self.browser.link_input)
                        .hint_text("https://example.com/photo.jpg")
                        .desired_width(ui.available_width() - 80.0);
                    let response = ui.add(edit);
                    let submitted =
                        response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if ui.button("Fetch").clicked() || submitted {
                        self.submit_link();
                    }
                });
            });
            ui.add_space(10.0);
        }

        if let Some(error) = &self.browser.error {
            ui.colored_label(FAILURE, error);
            ui.add_space(6.0);
        }

        self.render_trail(ui);
        self.render_listing(ui);

        ui.add_space(10.0);
        let count = self.browser.selected.len();
        ui.vertical_centered(|ui| {
            let label = if id == AdapterId::Camera {
                "📷 Take Photo".to_string()
            } else {
                format!("➕ Add {} file(s)", count)
            };
            let is_camera = id == AdapterId::Camera;
            ui.add_enabled_ui((count > 0 || is_camera) && !self.browser.loading, |ui| {
                let button = egui::Button::new(label).min_size(egui::vec2(200.0, 36.0));
                if ui.add(button).clicked() {
                    if is_camera && count == 0 {
                        if let Some(listing) = &self.browser.listing {
                            self.browser.selected = listing.entries.clone();
                        }
                    }
                    self.confirm_browser();
                }
            });
        });
    }

    fn render_sign_in(&mut self, ui: &mut egui::Ui, id: AdapterId) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label(format!("Sign in to {}", id.title()));
                ui.add_space(4.0);
                ui.label("ℹ").on_hover_text_at_pointer(
                    "Complete the provider's sign-in flow in your browser\n\
                    and paste the access token it hands back here.",
                );
            });
            ui.add_space(8.0);
            let edit = egui::TextEdit::singleline(&mut self.browser.token_input)
                .password(true)
                .hint_text("access token")
                .desired_width(ui.available_width());
            ui.add(edit);
            ui.add_space(8.0);
            ui.add_enabled_ui(!self.browser.token_input.trim().is_empty(), |ui| {
                if ui.button("🔑 Sign In").clicked() {
                    self.sign_in();
                }
            });
        });

        if let Some(error) = &self.browser.error {
            ui.add_space(6.0);
            ui.colored_label(FAILURE, error);
        }
    }

    fn render_trail(&mut self, ui: &mut egui::Ui) {
        if self.browser.trail.is_empty() {
            return;
        }
        let mut jump = None;
        ui.horizontal_wrapped(|ui| {
            if ui.link("Root").clicked() {
                jump = Some(0);
            }
            for (depth, (_, name)) in self.browser.trail.iter().enumerate() {
                ui.label("›");
                if ui.link(name).clicked() {
                    jump = Some(depth + 1);
                }
            }
        });
        if let Some(depth) = jump {
            self.jump_to(depth);
        }
        ui.add_space(6.0);
    }

    fn render_listing(&mut self, ui: &mut egui::Ui) {
        let Some(listing) = self.browser.listing.clone() else {
            return;
        };
        let multiple = self.config.allows_multiple();
        let mut open: Option<DriveEntry> = None;
        let mut toggled: Option<DriveEntry> = None;

        egui::ScrollArea::vertical()
            .id_source("adapter_listing")
            .max_height(300.0)
            .show(ui, |ui| {
                egui::Frame::none()
                    .fill(ui.style().visuals.extreme_bg_color)
                    .show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        if listing.entries.is_empty() {
                            ui.label(RichText::new("This folder is empty").color(MUTED));
                        }
                        for entry in &listing.entries {
                            ui.horizontal(|ui| {
                                if entry.is_folder {
                                    if ui.button(format!("📁 {}", entry.name)).clicked() {
                                        open = Some(entry.clone());
                                    }
                                } else {
                                    let mut checked = self.browser.is_selected(entry);
                                    let response = ui.checkbox(&mut checked, &entry.name);
                                    if response.changed() {
                                        toggled = Some(entry.clone());
                                    }
                                    if let Some(size) = entry.size {
                                        ui.label(
                                            RichText::new(FileSizeUtils::format_size(size)).color(MUTED),
                                        );
                                    }
                                }
                            });
                        }
                    });
            });

        if let Some(entry) = toggled {
            self.browser.toggle(&entry, multiple);
        }
        if let Some(entry) = open {
            self.open_folder(&entry);
        }
    }

    fn render_files(&mut self, ui: &mut egui::Ui) {
        let mut removed = None;
        let mut toggled = None;

        ui.group(|ui| {
            ui.label(format!("{} file(s) selected", self.selection.len()));
            ui.add_space(8.0);

            for file in self.selection.files() {
                let preview = self.previews.get(&file.id);
                ui.horizontal(|ui| {
                    ui.label(icon_for(&file.mime));
                    ui.label(&file.name);
                    ui.label(
                        RichText::new(format!(
                            "{} · {}",
                            FileSizeUtils::format_size(file.size),
                            file.mime
                        ))
                        .color(MUTED),
                    );

                    ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                        if ui.button("🗑").on_hover_text("Remove").clicked() {
                            removed = Some(file.id.clone());
                        }
                        if preview.is_some_and(|p| p.can_preview()) {
                            let open = preview.is_some_and(|p| p.show_preview_portal);
                            if ui.selectable_label(open, "👁").on_hover_text("Preview").clicked() {
                                toggled = Some(file.id.clone());
                            }
                        }
                        if file.is_uploaded() {
                            ui.colored_label(SUCCESS, "✅");
                        } else if let Some(percentage) = self.state.file_percentage(&file.id) {
                            ui.add(
                                egui::ProgressBar::new(percentage as f32 / 100.0)
                                    .desired_width(80.0)
                                    .fill(ACCENT),
                            );
                        }
                    });
                });

                if let Some(preview) = preview.filter(|p| p.show_preview_portal) {
                    render_preview(ui, &file.id, preview.content.as_ref());
                }
                ui.add_space(4.0);
            }
        });

        if let Some(id) = removed {
            self.remove_file(&id);
        }
        if let Some(id) = toggled {
            self.toggle_preview(&id);
        }
    }

    fn render_actions(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            if !matches!(self.state.progress, ActionProgress::Completed { .. }) {
                let can_upload = !self.pending_files().is_empty() && !self.state.is_uploading;
                ui.add_enabled_ui(can_upload, |ui| {
                    let button =
                        egui::Button::new("📤 Upload Files").min_size(egui::vec2(200.0, 40.0));
                    if ui.add(button).clicked() {
                        self.start_upload();
                    }
                });

                let has_room = self.selection.remaining_quota() != Some(0);
                ui.add_space(5.0);
                ui.add_enabled_ui(has_room && !self.state.is_uploading, |ui| {
                    if ui.button("➕ Add More").clicked() {
                        self.selection.add_more();
                    }
                });
            } else {
                if self.can_retry() {
                    let button =
                        egui::Button::new("🔁 Retry Failed").min_size(egui::vec2(200.0, 40.0));
                    if ui.add(button).clicked() {
                        self.retry_failed();
                    }
                    ui.add_space(5.0);
                }
                if ui.button("🗑 Clear All").clicked() {
                    self.reset();
                }
            }
        });
    }

    fn render_progress(&self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            if let Some(current_file) = &self.state.current_file {
                let status_text = match &self.state.progress {
                    ActionProgress::Completed { failed, .. } => {
                        if *failed > 0 {
                            "Upload Failed"
                        } else {
                            "Upload Complete"
                        }
                    }
                    _ => "📤 Uploading",
                };
                ui.label(format!("{}: {}", status_text, current_file));
            }

            let progress_bar = egui::ProgressBar::new(self.state.get_progress_percentage())
                .show_percentage()
                .animate(self.state.is_uploading)
                .fill(ACCENT);
            ui.add(progress_bar);

            ui.label(self.state.get_status_text());
        });
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        if ui
            .button(if self.state.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
        {
            self.state.show_details = !self.state.show_details;
        }

        if self.state.show_details {
            egui::ScrollArea::vertical()
                .id_source("upload_details")
                .max_height(200.0)
                .show(ui, |ui| {
                    egui::Frame::none()
                        .fill(ui.style().visuals.extreme_bg_color)
                        .show(ui, |ui| {
                            ui.add_space(8.0);
                            for status in &self.state.file_statuses {
                                let (icon, color, text) = match &status.status {
                                    UploadStatus::Pending => ("⏸", MUTED, status.name.clone()),
                                    UploadStatus::Uploading => {
                                        ("⏳", MUTED, format!("{} - Uploading...", status.name))
                                    }
                                    UploadStatus::Success => ("✅", SUCCESS, status.name.clone()),
                                    UploadStatus::Error(err) => {
                                        ("❌", FAILURE, format!("{} - {}", status.name, err))
                                    }
                                    UploadStatus::Skipped(reason) => {
                                        ("⏩", MUTED, format!("{} - {}", status.name, reason))
                                    }
                                };
                                ui.horizontal(|ui| {
                                    ui.label(icon);
                                    ui.colored_label(color, text);
                                });
                                ui.add_space(4.0);
                            }

                            for file in &self.state.uploaded_files {
                                if let Some(url) = &file.public_url {
                                    if ui.link(url).clicked() {
                                        if let Err(e) = open::that(url) {
                                            tracing::warn!("Failed to open {}: {}", url, e);
                                        }
                                    }
                                }
                            }
                            ui.add_space(8.0);
                        });
                });
        }
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.label(
                RichText::new(format!("Uploads go to {}", self.config.token_endpoint)).color(MUTED),
            );
        });

        if let Some(warning) = &self.state.warning_message {
            ui.add_space(5.0);
            ui.vertical_centered(|ui| {
                ui.colored_label(Color32::from_rgb(220, 160, 40), warning);
            });
        }

        if let Some(error) = &self.state.error_message {
            ui.add_space(5.0);
            ui.vertical_centered(|ui| {
                ui.colored_label(FAILURE, error);
            });
        }
    }
}

fn icon_for(mime: &str) -> &'static str {
    match mime.split('/').next().unwrap_or_default() {
        "image" => "🖼",
        "video" => "🎞",
        "audio" => "🎵",
        "text" => "📝",
        _ => "📄",
    }
}

fn render_preview(ui: &mut egui::Ui, file_id: &str, content: Option<&PreviewContent>) {
    egui::Frame::none()
        .fill(ui.style().visuals.extreme_bg_color)
        .inner_margin(8.0)
        .show(ui, |ui| match content {
            None => {
                ui.spinner();
            }
            Some(PreviewContent::Image { uri, bytes }) => {
                ui.add(
                    egui::Image::from_bytes(uri.clone(), bytes.clone())
                        .max_height(200.0)
                        .maintain_aspect_ratio(true),
                );
            }
            Some(PreviewContent::Text { body, truncated }) => {
                egui::ScrollArea::vertical()
                    .id_source(file_id)
                    .max_height(200.0)
                    .show(ui, |ui| {
                        ui.label(RichText::new(body).monospace());
                    });
                if *truncated {
                    ui.label(RichText::new("Preview truncated").color(MUTED));
                }
            }
            Some(PreviewContent::External { .. }) => {
                ui.label(RichText::new("Opened in the system viewer").color(MUTED));
            }
            Some(PreviewContent::Icon { label }) => {
                ui.label(RichText::new(format!("📄 {}", label)).size(32.0));
            }
        });
}
