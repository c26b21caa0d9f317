use parking_lot::RwLock;
use std::sync::Arc;

/// Live display configuration, written by the UI and sampled by the
/// ingestion path once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallSettings {
    /// Index into `gradient::GRADIENT_NAMES`.
    pub gradient_index: usize,
    /// Contrast, 0 to 100.
    pub color_gain: u16,
    /// Manual black level in percent of full scale, 0 to 100.
    pub black_level: u16,
    pub auto_black_enabled: bool,
    /// Time between lines in ms (1 to 100).
    pub line_duration: u32,
    /// Center of the visible span in Hz.
    pub center: f64,
    /// Width of the visible span in Hz.
    pub bandwidth: f64,
    /// Clear color, RGBA.
    pub background: [u8; 4],
}

impl Default for WaterfallSettings {
    fn default() -> Self {
        Self {
            gradient_index: 0,
            color_gain: 50,
            black_level: 20,
            auto_black_enabled: true,
            line_duration: 33,
            center: 14_100_000.0,
            bandwidth: 200_000.0,
            background: [0, 0, 0, 255],
        }
    }
}

impl WaterfallSettings {
    pub fn start(&self) -> f64 {
        self.center - self.bandwidth / 2.0
    }

    pub fn end(&self) -> f64 {
        self.center + self.bandwidth / 2.0
    }

    /// Black level to draw with, given the level a frame estimated for itself.
    pub fn effective_black_level(&self, auto_black_level: u32) -> u16 {
        if self.auto_black_enabled {
            auto_black_level as u16
        } else {
            let percent = self.black_level.min(100) as f32;
            ((percent / 100.0) * u16::MAX as f32).round() as u16
        }
    }
}

pub type SharedSettings = Arc<RwLock<WaterfallSettings>>;

pub fn shared(settings: WaterfallSettings) -> SharedSettings {
    Arc::new(RwLock::new(settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_is_centered() {
        let s = WaterfallSettings {
            center: 1000.0,
            bandwidth: 200.0,
            ..Default::default()
        };
        assert_eq!(s.start(), 900.0);
        assert_eq!(s.end(), 1100.0);
    }

    #[test]
    fn auto_black_uses_frame_level_truncated() {
        let s = WaterfallSettings {
            auto_black_enabled: true,
            ..Default::default()
        };
        assert_eq!(s.effective_black_level(1234), 1234);
        assert_eq!(s.effective_black_level(0x1_0005), 5);
    }

    #[test]
    fn manual_black_is_percent_of_full_scale() {
        let mut s = WaterfallSettings {
            auto_black_enabled: false,
            black_level: 25,
            ..Default::default()
        };
        assert_eq!(s.effective_black_level(9999), 16384);

        s.black_level = 100;
        assert_eq!(s.effective_black_level(0), u16::MAX);

        s.black_level = 0;
        assert_eq!(s.effective_black_level(0), 0);
    }
}
