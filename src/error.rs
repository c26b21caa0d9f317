use thiserror::Error;

/// Unrecoverable setup failures. Anything listed here means the display
/// cannot be brought up (bad packaging or unsupported platform), so the
/// caller tears the display down instead of retrying.
#[derive(Debug, Error)]
pub enum WaterfallError {
    #[error("Unknown gradient '{0}'")]
    UnknownGradient(String),
    #[error("Gradient file '{0}' not found")]
    GradientNotFound(String),
    #[error("Gradient file '{name}' is {len} bytes, expected {expected}")]
    MalformedGradient {
        name: String,
        len: usize,
        expected: usize,
    },
    #[error("Gradient I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unusable ring geometry: {lines} lines of {bins} bins")]
    RingGeometry { lines: usize, bins: usize },
    #[error("No audio input device found")]
    NoInputDevice,
    #[error("Unsupported audio sample format: {0}")]
    UnsupportedFormat(String),
    #[error("Audio stream error: {0}")]
    Audio(String),
    #[error("GUI error: {0}")]
    Gui(#[from] eframe::Error),
}

pub type Result<T> = std::result::Result<T, WaterfallError>;
