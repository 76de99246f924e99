//! egui desktop shell.
//!
//! Every frame ticks the session, reads the panel models from its UI state,
//! and forwards user input back to it. Analyzed images are downloaded on
//! short-lived worker threads and cached as textures by their backend path.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use indassist_app::{AppError, Session, app_version};
use indassist_capture::{CaptureSettings, MediaDevices};
use indassist_client::AnalysisClient;
use indassist_ui::{
    ANALYZING_IMAGE, DetectionQuality, ENTER_HINT, INITIALIZING_CAMERA, NO_ANALYSIS, NO_HISTORY,
    ResultsPanel, View,
};
use indassist_upload::ACCEPTED_EXTENSIONS;

const WINDOW_TITLE: &str = "Industrial AI Assistant";
const REPAINT_INTERVAL: Duration = Duration::from_millis(33);
const UPLOAD_TIPS: [&str; 4] = [
    "For best results, ensure good lighting",
    "Center the objects in the frame",
    "Use images with clear visibility of tools/equipment",
    "Recommended resolution: 800x600 or higher",
];

/// Opens the main window and blocks until it closes.
pub fn run(
    client: AnalysisClient,
    devices: Arc<dyn MediaDevices>,
    capture_settings: CaptureSettings,
) -> Result<(), AppError> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |_cc| {
            Ok(Box::new(AssistantApp::new(
                client,
                devices,
                capture_settings,
            )))
        }),
    )
    .map_err(|error| AppError::Gui(error.to_string()))
}

enum RemoteImage {
    Loading(Receiver<Result<egui::ColorImage, String>>),
    Ready(egui::TextureHandle),
    Failed,
}

struct AssistantApp {
    session: Session,
    started: Instant,
    preview: Option<egui::TextureHandle>,
    images: HashMap<String, RemoteImage>,
}

impl AssistantApp {
    fn new(
        client: AnalysisClient,
        devices: Arc<dyn MediaDevices>,
        capture_settings: CaptureSettings,
    ) -> Self {
        let session = Session::new(app_version(), client, devices, capture_settings, 0);
        // The status check only logs; its handle is not needed.
        let _ = session.spawn_status_check();
        Self {
            session,
            started: Instant::now(),
            preview: None,
            images: HashMap::new(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn refresh_preview(&mut self, ctx: &egui::Context) {
        let Some(frame) = self.session.preview_frame() else {
            if self.session.state().view != View::Camera {
                self.preview = None;
            }
            return;
        };

        let size = [frame.width() as usize, frame.height() as usize];
        let image = egui::ColorImage::from_rgb(size, frame.as_raw());
        match &mut self.preview {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.preview =
                    Some(ctx.load_texture("camera-preview", image, egui::TextureOptions::LINEAR));
            }
        }
    }

    fn poll_images(&mut self, ctx: &egui::Context) {
        for (url, slot) in self.images.iter_mut() {
            let next = match slot {
                RemoteImage::Loading(receiver) => match receiver.try_recv() {
                    Ok(Ok(image)) => Some(RemoteImage::Ready(ctx.load_texture(
                        url.as_str(),
                        image,
                        egui::TextureOptions::LINEAR,
                    ))),
                    Ok(Err(error)) => {
                        tracing::warn!(stage = "image", action = "decode_failed", "{url}: {error}");
                        Some(RemoteImage::Failed)
                    }
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => Some(RemoteImage::Failed),
                },
                RemoteImage::Ready(_) | RemoteImage::Failed => None,
            };
            if let Some(next) = next {
                *slot = next;
            }
        }
    }

    fn remote_image(&mut self, ui: &mut egui::Ui, image_url: &str, max_height: f32) {
        let client = self.session.client();
        let slot = self
            .images
            .entry(image_url.to_string())
            .or_insert_with(|| spawn_fetch(client.clone(), image_url.to_string()));

        match slot {
            RemoteImage::Ready(texture) => {
                ui.add(egui::Image::new(&*texture).max_height(max_height));
            }
            RemoteImage::Loading(_) => {
                ui.spinner();
            }
            RemoteImage::Failed => {
                ui.weak("Image unavailable");
            }
        }
    }

    fn navigation(&mut self, ctx: &egui::Context, now_ms: u64) {
        let current = self.session.state().view;
        let mut target = None;
        egui::TopBottomPanel::top("navigation").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("INDUSTRIAL AI ASSISTANT");
                ui.separator();
                for view in View::ALL {
                    if ui.selectable_label(current == view, view.label()).clicked() {
                        target = Some(view);
                    }
                }
            });
        });
        if let Some(view) = target {
            self.session.switch_view(view, now_ms);
        }
    }

    fn footer(&self, ctx: &egui::Context) {
        let label = self.session.state().footer_label();
        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.small(label);
            });
        });
    }

    fn notifications(&mut self, ctx: &egui::Context) {
        let visible: Vec<_> = self
            .session
            .notifications()
            .visible()
            .iter()
            .map(|notification| (notification.id, notification.message.clone()))
            .collect();
        if visible.is_empty() {
            return;
        }

        let mut dismissed = None;
        egui::Area::new(egui::Id::new("notifications"))
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 56.0))
            .show(ctx, |ui| {
                for (id, message) in &visible {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(message);
                            if ui.small_button("x").clicked() {
                                dismissed = Some(*id);
                            }
                        });
                    });
                }
            });
        if let Some(id) = dismissed {
            self.session.dismiss_notification(id);
        }
    }

    fn camera_view(&mut self, ui: &mut egui::Ui, now_ms: u64) {
        ui.columns(2, |columns| {
            self.camera_panel(&mut columns[0], now_ms);
            self.results_panel(&mut columns[1], now_ms);
        });
    }

    fn camera_panel(&mut self, ui: &mut egui::Ui, now_ms: u64) {
        let panel = self.session.state().camera_panel();

        ui.horizontal(|ui| {
            ui.heading("CAMERA FEED");
            if let Some(countdown) = panel.countdown {
                ui.label(
                    egui::RichText::new(countdown.to_string())
                        .strong()
                        .color(egui::Color32::RED),
                );
            }
            if ui.button("Settings").clicked() {
                self.session.toggle_settings();
            }
            if ui
                .add_enabled(panel.capture_enabled, egui::Button::new("Capture"))
                .clicked()
            {
                self.session.press_capture(now_ms);
            }
        });

        let width = ui.available_width();
        let feed_size = egui::vec2(width, width * 9.0 / 16.0);
        match &self.preview {
            Some(texture) => {
                ui.add(egui::Image::new(texture).fit_to_exact_size(feed_size));
            }
            None => {
                ui.allocate_space(feed_size);
            }
        }

        if panel.initializing {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(INITIALIZING_CAMERA);
            });
        }
        if let Some(error) = &panel.error {
            ui.group(|ui| {
                ui.strong("CAMERA ERROR");
                ui.label(error);
                ui.horizontal(|ui| {
                    if ui.button("Retry").clicked() {
                        self.session.retry_camera(now_ms);
                    }
                    if ui.button("Upload Instead").clicked() {
                        self.session.fallback_to_upload(now_ms);
                    }
                });
            });
        }
        if panel.analyzing {
            self.analyzing_indicator(ui, ANALYZING_IMAGE, now_ms);
        }
        if panel.show_enter_hint {
            ui.label(ENTER_HINT);
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.group(|ui| {
                ui.small("STATUS");
                ui.strong(panel.status_label);
            });
            ui.group(|ui| {
                ui.small("RESOLUTION");
                ui.strong(&panel.resolution_label);
            });
            ui.group(|ui| {
                ui.small("HELP");
                ui.strong("PRESS ENTER TO CAPTURE");
            });
        });

        if self.session.state().show_settings {
            self.settings_panel(ui);
        }
    }

    fn settings_panel(&mut self, ui: &mut egui::Ui) {
        let original = self.session.state().draft_settings;
        let mut draft = original;
        let mut apply = false;
        let mut close = false;

        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.strong("Detection Settings");
                if ui.small_button("x").clicked() {
                    close = true;
                }
            });
            egui::ComboBox::from_label("Detection Quality")
                .selected_text(draft.quality.label())
                .show_ui(ui, |ui| {
                    for quality in DetectionQuality::ALL {
                        ui.selectable_value(&mut draft.quality, quality, quality.label());
                    }
                });
            ui.add(
                egui::Slider::new(&mut draft.confidence_threshold, 0..=100)
                    .text("Confidence Threshold"),
            );
            ui.horizontal(|ui| {
                ui.small("Lower (More Objects)");
                ui.small("Higher (More Accurate)");
            });
            apply = ui.button("Apply Settings").clicked();
        });

        if draft != original {
            self.session.set_draft_settings(draft);
        }
        if apply {
            self.session.apply_settings();
        }
        if close {
            self.session.toggle_settings();
        }
    }

    fn analyzing_indicator(&mut self, ui: &mut egui::Ui, text: &str, now_ms: u64) {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(text);
            if ui.small_button("Cancel").clicked() {
                self.session.cancel_analysis(now_ms);
            }
        });
    }

    fn upload_view(&mut self, ui: &mut egui::Ui, now_ms: u64) {
        ui.columns(2, |columns| {
            self.upload_panel(&mut columns[0], now_ms);
            self.results_panel(&mut columns[1], now_ms);
        });
    }

    fn upload_panel(&mut self, ui: &mut egui::Ui, now_ms: u64) {
        ui.heading("UPLOAD IMAGE");

        let width = ui.available_width();
        let picked = ui
            .add_sized([width, 240.0], egui::Button::new("Click to select image"))
            .clicked();
        ui.small("JPG, PNG, GIF, BMP, WEBP files accepted");

        if picked
            && let Some(path) = rfd::FileDialog::new()
                .add_filter("Images", ACCEPTED_EXTENSIONS)
                .pick_file()
        {
            self.session.upload_file(&path, now_ms);
        }

        if self.session.state().analyzing {
            self.analyzing_indicator(ui, "Processing image...", now_ms);
        }

        ui.separator();
        ui.small("UPLOAD TIPS:");
        for tip in UPLOAD_TIPS {
            ui.small(format!("- {tip}"));
        }
    }

    fn results_panel(&mut self, ui: &mut egui::Ui, _now_ms: u64) {
        let panel = self.session.state().results_panel();
        let mut clear = false;

        ui.horizontal(|ui| {
            ui.heading("ANALYSIS RESULTS");
            if let ResultsPanel::Record(view) = &panel {
                ui.label(&view.id_label);
                clear = ui.small_button("CLEAR").clicked();
            }
        });

        match &panel {
            ResultsPanel::Empty { hint } => {
                ui.label(NO_ANALYSIS);
                ui.small(*hint);
            }
            ResultsPanel::Record(view) => {
                ui.small("DETECTED OBJECTS");
                self.remote_image(ui, &view.image_url, 280.0);

                ui.small("OPERATION PHASE:");
                ui.strong(&view.phase_label);

                ui.small("DETECTED ENTITIES:");
                ui.horizontal_wrapped(|ui| {
                    for badge in &view.badges {
                        ui.label(badge.text());
                    }
                    if let Some(empty) = view.empty_badges_label {
                        ui.weak(empty);
                    }
                });

                ui.small("SAFETY STATUS:");
                ui.label(&view.safety_assessment);

                ui.small("EXPERT ANALYSIS");
                egui::ScrollArea::vertical()
                    .id_salt("expert-analysis")
                    .max_height(240.0)
                    .show(ui, |ui| {
                        ui.label(&view.expert_analysis);
                    });

                if let Some(next_steps) = &view.next_steps {
                    ui.small("NEXT STEPS");
                    ui.label(next_steps);
                }
            }
        }

        if clear {
            self.session.clear_current();
        }
    }

    fn history_view(&mut self, ui: &mut egui::Ui, now_ms: u64) {
        let header = self.session.state().history_header();
        let cards = self.session.state().history_cards();
        let mut open = None;

        ui.horizontal(|ui| {
            ui.heading("ANALYSIS HISTORY");
            ui.label(header);
        });

        if cards.is_empty() {
            ui.label(NO_HISTORY);
            ui.small("Analysis records will appear here");
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("history")
            .max_height(ui.available_height() * 0.6)
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for card in &cards {
                        ui.group(|ui| {
                            ui.set_width(280.0);
                            self.remote_image(ui, &card.image_url, 160.0);
                            ui.label(&card.object_count_label);
                            ui.small(&card.timestamp_label);
                            ui.strong(&card.phase_label);
                            ui.horizontal_wrapped(|ui| {
                                for label in &card.preview.shown {
                                    ui.label(label);
                                }
                                if let Some(more) = card.preview.more_label() {
                                    ui.label(more);
                                }
                            });
                            if ui.button("View").clicked() {
                                open = Some(card.id.clone());
                            }
                        });
                    }
                });
            });

        if let Some(id) = open {
            self.session.view_history_entry(&id);
        }
        if self.session.state().current_analysis.is_some() {
            ui.separator();
            self.results_panel(ui, now_ms);
        }
    }
}

impl eframe::App for AssistantApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now_ms = self.now_ms();
        self.session.tick(now_ms);
        if ctx.input(|input| input.key_pressed(egui::Key::Enter)) {
            self.session.on_enter_key(now_ms);
        }

        self.refresh_preview(ctx);
        self.poll_images(ctx);
        self.navigation(ctx, now_ms);
        self.footer(ctx);
        egui::CentralPanel::default().show(ctx, |ui| match self.session.state().view {
            View::Camera => self.camera_view(ui, now_ms),
            View::Upload => self.upload_view(ui, now_ms),
            View::History => self.history_view(ui, now_ms),
        });
        self.notifications(ctx);

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

impl Drop for AssistantApp {
    fn drop(&mut self) {
        self.session.shutdown();
    }
}

fn spawn_fetch(client: AnalysisClient, image_url: String) -> RemoteImage {
    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("indassist-image".to_string())
        .spawn(move || {
            let result = client
                .fetch_image(&image_url)
                .map_err(|error| error.to_string())
                .and_then(|bytes| decode_texture(&bytes));
            // The shell may have closed before the download finished.
            let _ = sender.send(result);
        });

    match spawned {
        Ok(_) => RemoteImage::Loading(receiver),
        Err(error) => {
            tracing::warn!(stage = "image", action = "spawn_failed", "{error}");
            RemoteImage::Failed
        }
    }
}

fn decode_texture(bytes: &[u8]) -> Result<egui::ColorImage, String> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|error| error.to_string())?
        .to_rgb8();
    let size = [decoded.width() as usize, decoded.height() as usize];
    Ok(egui::ColorImage::from_rgb(size, decoded.as_raw()))
}
