use crate::waterfall::gradient::{gradient_name, GRADIENT_NAMES};
use crate::waterfall::WaterfallSettings;
use eframe::egui;

pub const PLATINUM_BG: egui::Color32 = egui::Color32::from_rgb(212, 208, 200);
pub const PLATINUM_DARK: egui::Color32 = egui::Color32::from_rgb(128, 128, 128);
pub const TITLE_BG: egui::Color32 = egui::Color32::from_rgb(200, 200, 200);

pub fn setup_global_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    style.visuals.panel_fill = PLATINUM_BG;
    style.visuals.window_fill = PLATINUM_BG;

    //
    // Square corners everywhere.
    //
    for widget in [
        &mut style.visuals.widgets.noninteractive,
        &mut style.visuals.widgets.inactive,
        &mut style.visuals.widgets.hovered,
        &mut style.visuals.widgets.active,
    ] {
        widget.rounding = egui::Rounding::ZERO;
    }

    ctx.set_style(style);
}

/// Top bar: application name on the left, status items on the right.
pub fn draw_menu_bar(ui: &mut egui::Ui, status: &[String]) {
    egui::TopBottomPanel::top("menubar").show_inside(ui, |ui| {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("waterfall").strong());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                for item in status.iter().rev() {
                    ui.label(egui::RichText::new(item).italics().size(10.0));
                    ui.separator();
                }
            });
        });
    });
}

/// Draws `content` inside a titled, bevelled frame.
pub fn draw_platinum_window<R>(
    ui: &mut egui::Ui,
    title: &str,
    content: impl FnOnce(&mut egui::Ui) -> R,
) -> R {
    let frame = egui::Frame::none()
        .fill(PLATINUM_BG)
        .stroke(egui::Stroke::new(1.0, egui::Color32::BLACK))
        .inner_margin(2.0);

    frame
        .show(ui, |ui| {
            let (rect, _) = ui.allocate_exact_size(
                egui::vec2(ui.available_width(), 18.0),
                egui::Sense::hover(),
            );

            //
            // Pinstriped title bar.
            //
            let painter = ui.painter();
            painter.rect_filled(rect, 0.0, TITLE_BG);
            let stripe = egui::Stroke::new(
                1.0,
                egui::Color32::from_rgba_premultiplied(255, 255, 255, 50),
            );
            let mut x = rect.min.x;
            while x < rect.max.x {
                painter.line_segment(
                    [egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)],
                    stripe,
                );
                x += 2.0;
            }
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                title,
                egui::FontId::proportional(14.0),
                egui::Color32::BLACK,
            );

            ui.add_space(4.0);
            egui::Frame::group(ui.style())
                .stroke(egui::Stroke::new(1.0, PLATINUM_DARK))
                .inner_margin(6.0)
                .show(ui, content)
                .inner
        })
        .inner
}

/// Display controls. The span fields are read-only when the source fixes
/// the span itself.
pub fn draw_controls(ui: &mut egui::Ui, settings: &mut WaterfallSettings, span_locked: bool) {
    egui::ComboBox::from_label("Gradient")
        .selected_text(gradient_name(settings.gradient_index))
        .show_ui(ui, |ui| {
            for (i, name) in GRADIENT_NAMES.iter().enumerate() {
                ui.selectable_value(&mut settings.gradient_index, i, *name);
            }
        });

    ui.add(egui::Slider::new(&mut settings.color_gain, 0..=100).text("Color gain"));
    ui.checkbox(&mut settings.auto_black_enabled, "Auto black");
    ui.add_enabled(
        !settings.auto_black_enabled,
        egui::Slider::new(&mut settings.black_level, 0..=100).text("Black level"),
    );
    ui.add(
        egui::Slider::new(&mut settings.line_duration, 1..=100)
            .text("Line duration")
            .suffix(" ms"),
    );

    ui.separator();
    ui.add_enabled_ui(!span_locked, |ui| {
        ui.add(
            egui::DragValue::new(&mut settings.center)
                .speed(1000.0)
                .range(0.0..=f64::MAX)
                .prefix("Center ")
                .suffix(" Hz"),
        );
        ui.add(
            egui::DragValue::new(&mut settings.bandwidth)
                .speed(1000.0)
                .range(1.0..=f64::MAX)
                .prefix("Bandwidth ")
                .suffix(" Hz"),
        );
    });

    ui.separator();
    ui.horizontal(|ui| {
        let [r, g, b, a] = settings.background;
        let mut color = egui::Color32::from_rgba_unmultiplied(r, g, b, a);
        if ui.color_edit_button_srgba(&mut color).changed() {
            settings.background = color.to_array();
        }
        ui.label("Background");
    });
}
