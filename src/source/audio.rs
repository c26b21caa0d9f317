use super::{auto_black_level, Delegate, DeliveryStats, FrameSource, Worker};
use crate::error::{Result, WaterfallError};
use crate::fft::{find_dft, hann};
use crate::waterfall::{SharedSettings, WaterfallFrame};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use num_complex::Complex32;
use ringbuf::{Consumer, HeapRb};
use rustfft::Fft;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// DFT size; each line carries half as many bins.
pub const DFT_SIZE: usize = 2048;

/// Display range mapped onto the 16-bit intensity scale.
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = 0.0;

type SampleConsumer = Consumer<f32, Arc<HeapRb<f32>>>;

/// Spectrum of the default audio input, delivered as waterfall frames.
pub struct AudioSource {
    _stream: cpal::Stream,
    worker: Worker,
}

impl AudioSource {
    pub fn start(delegate: Delegate, settings: SharedSettings) -> Result<Self> {
        let (stream, consumer, sample_rate) = start_capture(DFT_SIZE)?;

        //
        // The audio span is fixed by the device: 0 Hz to Nyquist.
        //
        {
            let mut settings = settings.write();
            settings.bandwidth = sample_rate as f64 / 2.0;
            settings.center = settings.bandwidth / 2.0;
        }

        let worker = Worker::spawn("audio-source", move |running| {
            let mut analyzer = SpectrumAnalyzer::new(DFT_SIZE, sample_rate);
            let mut consumer = consumer;
            let mut stats = DeliveryStats::new("Audio");

            while running.load(Ordering::Acquire) {
                while let Some(sample) = consumer.pop() {
                    analyzer.push(sample);
                }

                let line_duration = settings.read().line_duration;
                let mut frame = analyzer.frame();
                frame.line_duration = line_duration;
                stats.record(delegate.deliver(&frame));

                std::thread::sleep(Duration::from_millis(line_duration.clamp(1, 100) as u64));
            }
        });

        Ok(Self {
            _stream: stream,
            worker,
        })
    }
}

impl FrameSource for AudioSource {
    fn name(&self) -> &str {
        "Audio"
    }

    fn stop(&mut self) {
        self.worker.stop();
        log::info!("Audio frame source stopped");
    }
}

/// Sliding window of samples turned into one waterfall line per call.
pub struct SpectrumAnalyzer {
    dft: Arc<dyn Fft<f32>>,
    window: VecDeque<f32>,
    sample_rate: u32,
}

impl SpectrumAnalyzer {
    pub fn new(dft_size: usize, sample_rate: u32) -> Self {
        Self {
            dft: find_dft(dft_size),
            window: VecDeque::from(vec![0.0; dft_size]),
            sample_rate,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.window.pop_front();
        self.window.push_back(sample);
    }

    /// Windows and transforms the current samples; bins cover 0 Hz up to
    /// Nyquist, with −100..0 dBFS spread over the 16-bit range.
    pub fn frame(&self) -> WaterfallFrame {
        let n = self.dft.len();

        //
        // Apply window function and prepare complex FFT input.
        //
        let mut buffer: Vec<Complex32> = self
            .window
            .iter()
            .enumerate()
            .map(|(i, &x)| Complex32::new(x * hann(i, n), 0.0))
            .collect();
        self.dft.process(&mut buffer);

        //
        // Single-sided amplitude, corrected for the Hann window's 0.5 gain.
        //
        let scale = 4.0 / n as f32;
        let bins: Vec<u16> = buffer[..n / 2]
            .iter()
            .map(|c| {
                let db = 20.0 * (c.norm() * scale).max(1e-9).log10();
                let norm = ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0);
                (norm * u16::MAX as f32) as u16
            })
            .collect();

        let auto_black = auto_black_level(&bins);
        WaterfallFrame::new(0.0, self.sample_rate as f64 / n as f64, bins)
            .with_auto_black(auto_black)
    }
}

/// Starts audio capture on the default input device.
/// Supports f32, i16, and u16 formats and performs stereo-to-mono downmixing.
fn start_capture(buffer_size: usize) -> Result<(cpal::Stream, SampleConsumer, u32)> {
    let host = cpal::default_host();

    //
    // Log all available input devices for debugging.
    //
    if let Ok(devices) = host.input_devices() {
        for (i, dev) in devices.enumerate() {
            let name = dev.name().unwrap_or_else(|_| "Unknown".into());
            log::debug!("Input device [{}]: {}", i, name);
        }
    }

    let device = host
        .default_input_device()
        .ok_or(WaterfallError::NoInputDevice)?;

    log::info!(
        "Selected audio device: {}",
        device.name().unwrap_or_else(|_| "Unknown".into())
    );

    //
    // Ring of 4x the DFT size so the delivery thread can fall behind a little.
    //
    let (mut producer, consumer) = HeapRb::<f32>::new(buffer_size * 4).split();

    let supported_config = device
        .default_input_config()
        .map_err(|e| WaterfallError::Audio(e.to_string()))?;

    let sample_format = supported_config.sample_format();
    let config: cpal::StreamConfig = supported_config.into();
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;

    log::info!(
        "Audio config: {:?} @ {}Hz, Channels: {}",
        sample_format,
        sample_rate,
        channels
    );

    let err_fn = |err: cpal::StreamError| log::error!("Audio input error: {}", err);

    //
    // Push mono samples into the ring. Stereo is averaged; wider layouts
    // keep only the first channel.
    //
    let mut push_mono = move |data: &[f32]| match channels {
        1 => {
            let _ = producer.push_slice(data);
        }
        2 => {
            for chunk in data.chunks_exact(2) {
                let _ = producer.push((chunk[0] + chunk[1]) * 0.5);
            }
        }
        _ => {
            for chunk in data.chunks_exact(channels) {
                let _ = producer.push(chunk[0]);
            }
        }
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &_| push_mono(data),
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &_| {
                let f32_data: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                push_mono(&f32_data);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &_| {
                let f32_data: Vec<f32> = data
                    .iter()
                    .map(|&s| (s as f32 - 32768.0) / 32768.0)
                    .collect();
                push_mono(&f32_data);
            },
            err_fn,
            None,
        ),
        other => return Err(WaterfallError::UnsupportedFormat(format!("{other:?}"))),
    }
    .map_err(|e| WaterfallError::Audio(e.to_string()))?;

    stream
        .play()
        .map_err(|e| WaterfallError::Audio(e.to_string()))?;

    Ok((stream, consumer, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_sits_at_the_bottom() {
        let analyzer = SpectrumAnalyzer::new(256, 48_000);
        let frame = analyzer.frame();

        assert_eq!(frame.bins.len(), 128);
        assert_eq!(frame.first_bin_freq, 0.0);
        assert_eq!(frame.bin_bandwidth, 48_000.0 / 256.0);
        assert!(frame.bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_peaks_in_its_bin() {
        let n = 256;
        let rate = 25_600;
        let mut analyzer = SpectrumAnalyzer::new(n, rate);

        //
        // 1 kHz at 100 Hz per bin lands in bin 10.
        //
        for i in 0..n {
            let t = i as f32 / rate as f32;
            analyzer.push(0.5 * (2.0 * std::f32::consts::PI * 1000.0 * t).sin());
        }

        let frame = analyzer.frame();
        let peak = (0..frame.bins.len()).max_by_key(|&i| frame.bins[i]).unwrap();
        assert_eq!(peak, 10);
        assert!(frame.bins[10] > frame.auto_black_level as u16);
    }
}
