use crate::error::{Result, WaterfallError};
use std::path::{Path, PathBuf};

/// Number of colors in a gradient.
pub const GRADIENT_SIZE: usize = 256;
/// Size of a gradient resource: one BGRA8 texel per color.
pub const GRADIENT_BYTES: usize = GRADIENT_SIZE * 4;
/// File extension of gradient resources.
pub const GRADIENT_EXTENSION: &str = "tex";

/// The shipped gradient set, in selection-index order.
pub const GRADIENT_NAMES: [&str; 6] = [
    "Basic",
    "Dark",
    "Deuteranopia",
    "Grayscale",
    "Purple",
    "Tritanopia",
];

/// Name for a selection index. Out-of-range indices select the first gradient.
pub fn gradient_name(index: usize) -> &'static str {
    GRADIENT_NAMES.get(index).copied().unwrap_or(GRADIENT_NAMES[0])
}

/// Maps an intensity to a gradient coordinate in `[0, 1]`.
///
/// Intensities at or below `black_level` map to 0. Above it the ramp spans
/// the remaining 16-bit range, steepened by `color_gain` (0 to 100): a gain
/// of 0 reaches the top of the gradient only at full scale, a gain of 100
/// reaches it 11 times sooner.
pub fn gradient_position(intensity: u16, black_level: u16, color_gain: u16) -> f32 {
    if intensity <= black_level {
        return 0.0;
    }
    let range = (u16::MAX - black_level) as f32;
    let slope = 1.0 + color_gain.min(100) as f32 / 10.0;
    ((intensity - black_level) as f32 / range * slope).clamp(0.0, 1.0)
}

/// A 1-D color lookup table.
#[derive(Clone, PartialEq)]
pub struct Gradient {
    name: String,
    /// BGRA, as stored in the resource.
    texels: Box<[[u8; 4]; GRADIENT_SIZE]>,
}

impl std::fmt::Debug for Gradient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gradient").field("name", &self.name).finish()
    }
}

impl Gradient {
    /// Builds a gradient from a raw resource, which must be exactly
    /// `GRADIENT_BYTES` long.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != GRADIENT_BYTES {
            return Err(WaterfallError::MalformedGradient {
                name: name.to_string(),
                len: bytes.len(),
                expected: GRADIENT_BYTES,
            });
        }

        let mut texels = Box::new([[0u8; 4]; GRADIENT_SIZE]);
        for (texel, chunk) in texels.iter_mut().zip(bytes.chunks_exact(4)) {
            texel.copy_from_slice(chunk);
        }

        Ok(Self {
            name: name.to_string(),
            texels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw BGRA texel.
    pub fn texel(&self, index: usize) -> [u8; 4] {
        self.texels[index.min(GRADIENT_SIZE - 1)]
    }

    /// Color at `position` in `[0, 1]` as RGBA, nearest texel, clamped at
    /// both ends.
    pub fn sample(&self, position: f32) -> [u8; 4] {
        let index = (position.clamp(0.0, 1.0) * (GRADIENT_SIZE - 1) as f32).round() as usize;
        let [b, g, r, a] = self.texel(index);
        [r, g, b, a]
    }
}

/// The directory the named gradient resources are shipped in.
#[derive(Debug, Clone)]
pub struct GradientLibrary {
    dir: PathBuf,
}

impl GradientLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The `gradients/` directory shipped with the crate.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("gradients"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads a gradient by name. Names outside the shipped set, missing
    /// files and files of the wrong size are all fatal.
    pub fn load(&self, name: &str) -> Result<Gradient> {
        if !GRADIENT_NAMES.contains(&name) {
            return Err(WaterfallError::UnknownGradient(name.to_string()));
        }

        let path = self.dir.join(format!("{name}.{GRADIENT_EXTENSION}"));
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WaterfallError::GradientNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let gradient = Gradient::from_bytes(name, &bytes)?;
        log::info!("Loaded gradient '{}' from {}", name, path.display());
        Ok(gradient)
    }

    pub fn load_index(&self, index: usize) -> Result<Gradient> {
        self.load(gradient_name(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_shipped_gradient_loads() {
        let library = GradientLibrary::bundled();
        for name in GRADIENT_NAMES {
            let gradient = library.load(name).unwrap();
            assert_eq!(gradient.name(), name);
        }
    }

    #[test]
    fn basic_has_256_texels() {
        let bytes = std::fs::read(GradientLibrary::bundled().dir().join("Basic.tex")).unwrap();
        assert_eq!(bytes.len(), GRADIENT_SIZE * 4);
        assert!(Gradient::from_bytes("Basic", &bytes).is_ok());
    }

    #[test]
    fn unknown_name_is_fatal() {
        let err = GradientLibrary::bundled().load("Rainbow").unwrap_err();
        assert!(matches!(err, WaterfallError::UnknownGradient(name) if name == "Rainbow"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let library = GradientLibrary::new("/nonexistent/gradients");
        let err = library.load("Basic").unwrap_err();
        assert!(matches!(err, WaterfallError::GradientNotFound(_)));
    }

    #[test]
    fn wrong_size_is_fatal() {
        let err = Gradient::from_bytes("Basic", &[0; 1000]).unwrap_err();
        assert!(matches!(
            err,
            WaterfallError::MalformedGradient { len: 1000, .. }
        ));
    }

    #[test]
    fn out_of_range_index_selects_first() {
        assert_eq!(gradient_name(3), "Grayscale");
        assert_eq!(gradient_name(42), "Basic");
    }

    #[test]
    fn sample_swaps_bgra_to_rgba() {
        let mut bytes = vec![0u8; GRADIENT_BYTES];
        bytes[..4].copy_from_slice(&[1, 2, 3, 4]);
        bytes[GRADIENT_BYTES - 4..].copy_from_slice(&[10, 20, 30, 40]);
        let gradient = Gradient::from_bytes("Basic", &bytes).unwrap();

        assert_eq!(gradient.sample(0.0), [3, 2, 1, 4]);
        assert_eq!(gradient.sample(1.0), [30, 20, 10, 40]);
        assert_eq!(gradient.sample(7.0), [30, 20, 10, 40]);
        assert_eq!(gradient.sample(-1.0), [3, 2, 1, 4]);
    }

    #[test]
    fn position_is_zero_at_or_below_black() {
        assert_eq!(gradient_position(0, 1000, 50), 0.0);
        assert_eq!(gradient_position(1000, 1000, 50), 0.0);
        assert!(gradient_position(1001, 1000, 50) > 0.0);
    }

    #[test]
    fn position_is_monotonic_in_intensity() {
        let mut last = 0.0;
        for v in (0..=u16::MAX).step_by(97) {
            let p = gradient_position(v, 8000, 30);
            assert!(p >= last);
            assert!((0.0..=1.0).contains(&p));
            last = p;
        }
    }

    #[test]
    fn gain_steepens_the_ramp() {
        let flat = gradient_position(20_000, 10_000, 0);
        let steep = gradient_position(20_000, 10_000, 100);
        assert!(steep > flat);

        assert_eq!(gradient_position(u16::MAX, 0, 0), 1.0);
        assert!((gradient_position(32_768, 0, 0) - 0.5).abs() < 0.001);
        assert_eq!(gradient_position(u16::MAX / 11 + 1, 0, 100), 1.0);
    }
}
