pub mod theme;

use crate::source::{Delegate, FrameSource};
use crate::waterfall::{Canvas, GradientLibrary, SharedSettings, WaterfallRenderer};
use eframe::egui;
use std::sync::Arc;
use std::time::Duration;

/// Display refresh interval (30 Hz).
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// The display surface: drives the renderer once per refresh, reports size
/// changes to it, and turns control edits into renderer calls.
pub struct WaterfallApp {
    renderer: Arc<WaterfallRenderer>,
    delegate: Delegate,
    source: Option<Box<dyn FrameSource>>,
    settings: SharedSettings,
    library: GradientLibrary,
    span_locked: bool,

    //
    // Pixel target and the texture it is uploaded to.
    //
    canvas: Canvas,
    texture: Option<egui::TextureHandle>,
    configured: bool,

    //
    // Last values pushed to the renderer.
    //
    gradient_index: usize,
    span: (f64, f64),
}

impl WaterfallApp {
    pub fn new(
        renderer: Arc<WaterfallRenderer>,
        delegate: Delegate,
        source: Box<dyn FrameSource>,
        settings: SharedSettings,
        library: GradientLibrary,
        span_locked: bool,
    ) -> Self {
        let (gradient_index, span) = {
            let s = settings.read();
            (s.gradient_index, (s.start(), s.end()))
        };

        Self {
            renderer,
            delegate,
            source: Some(source),
            settings,
            library,
            span_locked,
            canvas: Canvas::default(),
            texture: None,
            configured: false,
            gradient_index,
            span,
        }
    }

    /// Pushes setting changes that need more than a per-frame sample.
    fn apply_settings(&mut self, ctx: &egui::Context) {
        let (gradient_index, span) = {
            let s = self.settings.read();
            (s.gradient_index, (s.start(), s.end()))
        };

        if gradient_index != self.gradient_index {
            self.gradient_index = gradient_index;
            match self.library.load_index(gradient_index) {
                Ok(gradient) => self.renderer.set_gradient(gradient),
                Err(e) => {
                    log::error!("{}", e);
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
        }

        if span != self.span {
            self.span = span;
            self.renderer.reset_for_new_span(span.0, span.1);
        }
    }

    /// Tracks the surface size in pixels; the first size seen also
    /// establishes the buffer geometry.
    fn track_size(&mut self, width: usize, height: usize) {
        if !self.configured {
            self.canvas.resize(width, height);
            self.renderer.configure(height);
            self.configured = true;
        } else if self.canvas.size() != [width, height] {
            let resized = self.canvas.height() != height;
            self.canvas.resize(width, height);
            if resized {
                self.renderer.reset_for_geometry(height);
            }
        }
    }

    fn status(&self) -> Vec<String> {
        let source = match &self.source {
            Some(source) if self.delegate.is_attached() => source.name(),
            Some(_) => "Detached",
            None => "Stopped",
        };
        vec![
            source.to_string(),
            self.renderer.gradient_name(),
            format!("{:.0}..{:.0} Hz", self.span.0, self.span.1),
        ]
    }

    fn teardown(&mut self) {
        teardown(&self.delegate, self.source.take(), &self.renderer);
    }
}

/// Detaches the source before anything else goes away, then stops its
/// delivery thread and closes the renderer to late frames.
pub fn teardown(
    delegate: &Delegate,
    source: Option<Box<dyn FrameSource>>,
    renderer: &WaterfallRenderer,
) {
    delegate.detach();
    if let Some(mut source) = source {
        source.stop();
    }
    renderer.shutdown();
}

impl eframe::App for WaterfallApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(FRAME_INTERVAL);

        let status = self.status();
        egui::CentralPanel::default().show(ctx, |ui| {
            theme::draw_menu_bar(ui, &status);

            //
            // Controls edit a copy; only real changes are written back.
            //
            egui::SidePanel::left("controls")
                .resizable(false)
                .show_inside(ui, |ui| {
                    let before = self.settings.read().clone();
                    let mut edited = before.clone();
                    theme::draw_platinum_window(ui, "Display", |ui| {
                        theme::draw_controls(ui, &mut edited, self.span_locked)
                    });
                    if edited != before {
                        *self.settings.write() = edited;
                    }
                });
            self.apply_settings(ui.ctx());

            theme::draw_platinum_window(ui, "Waterfall", |ui| {
                let available = ui.available_size();
                let ppp = ui.ctx().pixels_per_point();
                let width = (available.x * ppp).round().max(1.0) as usize;
                let height = (available.y * ppp).round().max(1.0) as usize;
                self.track_size(width, height);

                self.renderer.draw(&mut self.canvas);

                let image =
                    egui::ColorImage::from_rgba_unmultiplied(self.canvas.size(), self.canvas.pixels());
                if let Some(texture) = &mut self.texture {
                    texture.set(image, egui::TextureOptions::NEAREST);
                } else {
                    self.texture = Some(ui.ctx().load_texture(
                        "waterfall",
                        image,
                        egui::TextureOptions::NEAREST,
                    ));
                }

                if let Some(texture) = &self.texture {
                    ui.image((texture.id(), available));
                }
            });
        });
    }
}

impl Drop for WaterfallApp {
    fn drop(&mut self) {
        self.teardown();
    }
}
