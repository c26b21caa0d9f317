use super::{auto_black_level, Delegate, DeliveryStats, FrameSource, Worker};
use crate::waterfall::{SharedSettings, WaterfallFrame, WaterfallSettings};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Bins per generated line.
pub const SYNTHETIC_BINS: usize = 2048;

/// Noise floor as a fraction of full scale.
const NOISE_FLOOR: f32 = 0.25;
/// Peak noise above the floor.
const NOISE_SPREAD: f32 = 0.08;

/// A carrier drifting across the span.
struct Carrier {
    /// Position across the span, 0 to 1.
    position: f32,
    /// Drift per line.
    drift: f32,
    /// Width in bins.
    width: f32,
    /// Peak as a fraction of full scale.
    level: f32,
}

/// Generates test lines: a noisy floor with a few drifting carriers.
pub struct Generator {
    rng: StdRng,
    carriers: Vec<Carrier>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(0x9E37_79B9_7F4A_7C15)
    }
}

impl Generator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            carriers: vec![
                Carrier {
                    position: 0.2,
                    drift: 0.0,
                    width: 6.0,
                    level: 0.9,
                },
                Carrier {
                    position: 0.5,
                    drift: 0.0004,
                    width: 20.0,
                    level: 0.7,
                },
                Carrier {
                    position: 0.8,
                    drift: -0.0007,
                    width: 3.0,
                    level: 0.8,
                },
            ],
        }
    }

    /// Produces the next line across the span in `settings`.
    pub fn next_frame(&mut self, settings: &WaterfallSettings, bins: usize) -> WaterfallFrame {
        let mut levels: Vec<f32> = (0..bins)
            .map(|_| NOISE_FLOOR + NOISE_SPREAD * self.rng.gen::<f32>())
            .collect();

        for carrier in &mut self.carriers {
            let center = carrier.position * bins as f32;
            for (i, level) in levels.iter_mut().enumerate() {
                let d = (i as f32 - center) / carrier.width;
                *level += carrier.level * (-d * d).exp();
            }
            carrier.position = (carrier.position + carrier.drift).rem_euclid(1.0);
        }

        let intensities: Vec<u16> = levels
            .into_iter()
            .map(|v| (v.clamp(0.0, 1.0) * u16::MAX as f32) as u16)
            .collect();

        let auto_black = auto_black_level(&intensities);
        let mut frame = WaterfallFrame::new(
            settings.start(),
            settings.bandwidth / bins as f64,
            intensities,
        )
        .with_auto_black(auto_black);
        frame.line_duration = settings.line_duration;
        frame
    }
}

/// Delivers generated lines every `line_duration` ms.
pub struct SyntheticSource {
    worker: Worker,
}

impl SyntheticSource {
    pub fn start(delegate: Delegate, settings: SharedSettings) -> Self {
        log::info!("Starting synthetic frame source ({} bins)", SYNTHETIC_BINS);

        let worker = Worker::spawn("synthetic-source", move |running| {
            let mut generator = Generator::default();
            let mut stats = DeliveryStats::new("Synthetic");

            while running.load(Ordering::Acquire) {
                let snapshot = settings.read().clone();
                let frame = generator.next_frame(&snapshot, SYNTHETIC_BINS);
                stats.record(delegate.deliver(&frame));

                std::thread::sleep(Duration::from_millis(
                    snapshot.line_duration.clamp(1, 100) as u64,
                ));
            }
        });

        Self { worker }
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "Synthetic"
    }

    fn stop(&mut self) {
        self.worker.stop();
        log::info!("Synthetic frame source stopped");
    }
}
