mod error;
mod fft;
mod gui;
mod source;
mod waterfall;

use clap::Parser;
use error::Result;
use gui::WaterfallApp;
use source::{Delegate, SourceKind};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use waterfall::{settings, GradientLibrary, WaterfallRenderer, WaterfallSettings};

#[derive(Parser, Debug)]
#[command(name = "waterfall")]
#[command(about = "Scrolling spectrum waterfall display")]
#[command(version = "0.1.0")]
struct Cli {
    /// Where frames come from
    #[arg(long, value_enum, default_value = "synthetic")]
    source: SourceKind,

    /// Directory holding the <Name>.tex gradient files
    #[arg(long)]
    gradients: Option<PathBuf>,

    /// Gradient index (0 Basic, 1 Dark, 2 Deuteranopia, 3 Grayscale, 4 Purple, 5 Tritanopia)
    #[arg(long, default_value = "0")]
    gradient: usize,

    /// Contrast, 0 to 100
    #[arg(long, default_value = "50", value_parser = clap::value_parser!(u16).range(0..=100))]
    color_gain: u16,

    /// Manual black level in percent, 0 to 100
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u16).range(0..=100))]
    black_level: u16,

    /// Take the black level from each frame instead of --black-level
    #[arg(long)]
    auto_black: bool,

    /// Time between lines in ms
    #[arg(long, default_value = "33", value_parser = clap::value_parser!(u32).range(1..=100))]
    line_duration: u32,

    /// Center of the visible span in Hz (synthetic source)
    #[arg(long, default_value = "14100000")]
    center: f64,

    /// Width of the visible span in Hz (synthetic source)
    #[arg(long, default_value = "200000")]
    bandwidth: f64,
}

impl Cli {
    fn settings(&self) -> WaterfallSettings {
        WaterfallSettings {
            gradient_index: self.gradient,
            color_gain: self.color_gain,
            black_level: self.black_level,
            auto_black_enabled: self.auto_black,
            line_duration: self.line_duration,
            center: self.center,
            bandwidth: self.bandwidth.max(1.0),
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    //
    // Initialize logging with default filter set to "info".
    //
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    log::info!("Starting waterfall display...");

    let settings = settings::shared(cli.settings());
    let library = cli
        .gradients
        .clone()
        .map(GradientLibrary::new)
        .unwrap_or_else(GradientLibrary::bundled);
    log::info!("Gradients from {}", library.dir().display());

    //
    // Renderer setup; a missing gradient is fatal here.
    //
    let gradient = library.load_index(cli.gradient)?;
    let renderer = Arc::new(WaterfallRenderer::new(gradient, settings.clone())?);

    //
    // Start the frame source, then hand it the renderer.
    //
    let delegate = Delegate::new();
    let source = source::start(cli.source, delegate.clone(), settings.clone())?;
    delegate.attach(renderer.clone());

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 600.0])
            .with_min_inner_size([600.0, 400.0])
            .with_title("waterfall"),
        ..Default::default()
    };

    let span_locked = cli.source == SourceKind::Audio;
    eframe::run_native(
        "waterfall",
        options,
        Box::new(move |cc| {
            gui::theme::setup_global_style(&cc.egui_ctx);

            Ok(Box::new(WaterfallApp::new(
                renderer,
                delegate,
                source,
                settings,
                library,
                span_locked,
            )))
        }),
    )?;

    Ok(())
}
