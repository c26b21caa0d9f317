pub mod constants;
pub mod gradient;
pub mod renderer;
pub mod ring;
pub mod settings;

pub use constants::RenderConstants;
pub use gradient::{Gradient, GradientLibrary};
pub use renderer::{Canvas, WaterfallRenderer};
pub use ring::{LineRing, WaterfallLine};
pub use settings::{SharedSettings, WaterfallSettings};

/// Lines of history kept per display (must be >= tallest supported screen).
pub const MAX_LINES: usize = 2048;
/// Bins per line (must be >= widest frame a source can deliver).
pub const MAX_BINS: usize = 3360;

/// One delivered unit of spectrum data, as handed over by a frame source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaterfallFrame {
    /// Frequency of the first bin in Hz.
    pub first_bin_freq: f64,
    /// Bandwidth of a single bin in Hz.
    pub bin_bandwidth: f64,
    /// Duration of this line in ms (1 to 100).
    pub line_duration: u32,
    /// Source-estimated black level; only the low 16 bits are used.
    pub auto_black_level: u32,
    /// Bins in the full line this frame belongs to.
    pub total_bins: usize,
    /// Intensities carried by this frame.
    pub bins: Vec<u16>,
}

impl WaterfallFrame {
    pub fn new(first_bin_freq: f64, bin_bandwidth: f64, bins: Vec<u16>) -> Self {
        Self {
            first_bin_freq,
            bin_bandwidth,
            line_duration: 0,
            auto_black_level: 0,
            total_bins: bins.len(),
            bins,
        }
    }

    pub fn with_auto_black(mut self, level: u32) -> Self {
        self.auto_black_level = level;
        self
    }

    /// Number of bins in this frame, capped at what a line can hold.
    pub fn bins_in_this_frame(&self) -> usize {
        self.bins.len().min(MAX_BINS)
    }
}
