use super::gradient::{gradient_position, Gradient};
use super::{LineRing, RenderConstants, SharedSettings, WaterfallFrame, WaterfallLine};
use super::{MAX_BINS, MAX_LINES};
use crate::error::Result;
use crate::source::StreamHandler;
use parking_lot::Mutex;
use std::sync::Arc;

/// RGBA pixel target the draw path paints into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width * height * 4, 0);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let stride = self.width * 4;
        &mut self.pixels[y * stride..(y + 1) * stride]
    }
}

/// Everything guarded by the drawing lock.
struct DrawState {
    constants: RenderConstants,
    /// Next slot to be overwritten.
    write_index: usize,
    gradient: Arc<Gradient>,
    closed: bool,
}

/// What the draw path works from once the lock is released.
struct Snapshot {
    constants: RenderConstants,
    gradient: Arc<Gradient>,
}

/// Renders a waterfall from a ring of historical lines.
///
/// Frames arrive on a source's delivery thread through [`StreamHandler`];
/// geometry and span resets come from the UI thread; [`draw`] runs once per
/// display tick. All three meet only at the drawing lock, which is held for
/// a few copies at a time and never while a frame is being painted.
///
/// [`draw`]: WaterfallRenderer::draw
pub struct WaterfallRenderer {
    ring: LineRing,
    state: Mutex<DrawState>,
    /// Line the draw path paints from, so no slot stays locked while painting.
    scratch: Mutex<WaterfallLine>,
    settings: SharedSettings,
}

impl WaterfallRenderer {
    /// A renderer sized for the largest supported display.
    pub fn new(gradient: Gradient, settings: SharedSettings) -> Result<Self> {
        Self::with_capacity(MAX_LINES, MAX_BINS, gradient, settings)
    }

    pub fn with_capacity(
        lines: usize,
        bins: usize,
        gradient: Gradient,
        settings: SharedSettings,
    ) -> Result<Self> {
        let ring = LineRing::new(lines, bins)?;

        log::info!(
            "Waterfall renderer: {} lines x {} bins, gradient '{}'",
            lines,
            bins,
            gradient.name()
        );

        Ok(Self {
            scratch: Mutex::new(ring.blank_line()),
            ring,
            state: Mutex::new(DrawState {
                constants: RenderConstants::default(),
                write_index: 0,
                gradient: Arc::new(gradient),
                closed: false,
            }),
            settings,
        })
    }

    /// Copy of the current constants.
    pub fn constants(&self) -> RenderConstants {
        self.state.lock().constants
    }

    #[cfg(test)]
    pub fn write_index(&self) -> usize {
        self.state.lock().write_index
    }

    #[cfg(test)]
    pub fn line(&self, slot: usize) -> parking_lot::RwLockReadGuard<'_, WaterfallLine> {
        self.ring.read(slot)
    }

    pub fn gradient_name(&self) -> String {
        self.state.lock().gradient.name().to_string()
    }

    /// Establishes the buffer geometry for a display `screen_lines` pixels
    /// tall and starts history over on the span from the settings. Frames are
    /// accepted from here on.
    pub fn configure(&self, screen_lines: usize) {
        let (start, end) = {
            let settings = self.settings.read();
            (settings.start(), settings.end())
        };

        let mut state = self.state.lock();
        state.constants.number_of_screen_lines = clamp_lines(screen_lines);
        Self::restart(&mut state, self.ring.capacity(), start, end);
    }

    /// The visible area changed height. History is kept.
    pub fn reset_for_geometry(&self, screen_lines: usize) {
        let lines = clamp_lines(screen_lines);
        self.state.lock().constants.number_of_screen_lines = lines;

        log::debug!("Waterfall resized to {} lines", lines);
    }

    /// The frequency axis changed, so history no longer lines up with it.
    /// Slots are not cleared; they are simply overwritten from slot 0 on.
    pub fn reset_for_new_span(&self, start: f64, end: f64) {
        let mut state = self.state.lock();
        Self::restart(&mut state, self.ring.capacity(), start, end);
        drop(state);

        log::info!("Waterfall restarted on {:.0}..{:.0} Hz", start, end);
    }

    fn restart(state: &mut DrawState, capacity: usize, start: f64, end: f64) {
        state.constants.number_of_buffer_lines = capacity as u16;
        state.constants.top_line_index = 0;
        state.constants.starting_frequency = start as f32;
        state.constants.ending_frequency = end as f32;
        state.write_index = 0;
    }

    /// Replaces the gradient. A draw already holding the old one finishes
    /// with it; the next draw sees the new one whole.
    pub fn set_gradient(&self, gradient: Gradient) {
        log::info!("Waterfall gradient set to '{}'", gradient.name());
        self.state.lock().gradient = Arc::new(gradient);
    }

    /// Installs one frame at the write cursor. Frames arriving before the
    /// geometry is configured, or after shutdown, are dropped.
    pub fn ingest(&self, frame: &WaterfallFrame) {
        //
        // Sample the live configuration before taking the drawing lock.
        //
        let (start, end, black_level, color_gain) = {
            let settings = self.settings.read();
            (
                settings.start() as f32,
                settings.end() as f32,
                settings.effective_black_level(frame.auto_black_level),
                settings.color_gain,
            )
        };

        let mut state = self.state.lock();
        if state.closed || !state.constants.is_sized() {
            log::trace!("Waterfall frame dropped ({} bins)", frame.total_bins);
            return;
        }

        let slot = state.write_index;
        self.ring.write(slot, frame);

        state.constants.top_line_index = slot as u16;
        state.write_index = (slot + 1) % self.ring.capacity();

        state.constants.starting_frequency = start;
        state.constants.ending_frequency = end;
        state.constants.black_level = black_level;
        state.constants.color_gain = color_gain;
    }

    /// Paints the visible history into `canvas`, newest line on top.
    pub fn draw(&self, canvas: &mut Canvas) {
        let background = self.settings.read().background;

        let snapshot = {
            let state = self.state.lock();
            Snapshot {
                constants: state.constants,
                gradient: state.gradient.clone(),
            }
        };

        canvas.fill(background);
        if !snapshot.constants.is_sized() || canvas.width() == 0 {
            return;
        }

        let mut line = self.scratch.lock();
        let rows = snapshot.constants.drawn_lines().min(canvas.height());
        for y in 0..rows {
            if let Some(slot) = snapshot.constants.slot_for_screen_row(y) {
                self.ring.copy_into(slot, &mut line);
                Self::draw_line(canvas, y, &line, &snapshot);
            }
        }
    }

    /// Paints one line into pixel row `y`. Columns with no bin on this
    /// line's frequency axis keep the background.
    fn draw_line(canvas: &mut Canvas, y: usize, line: &WaterfallLine, snapshot: &Snapshot) {
        let c = &snapshot.constants;
        let width = canvas.width();
        let hz_per_pixel = (c.ending_frequency - c.starting_frequency) / width as f32;

        let row = canvas.row_mut(y);
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let frequency = c.starting_frequency + (x as f32 + 0.5) * hz_per_pixel;
            if let Some(intensity) = line.intensity_at(frequency) {
                let position = gradient_position(intensity, c.black_level, c.color_gain);
                px.copy_from_slice(&snapshot.gradient.sample(position));
            }
        }
    }

    /// Stops accepting frames. Detach the source first; anything still
    /// arriving after this is discarded.
    pub fn shutdown(&self) {
        self.state.lock().closed = true;
        log::info!("Waterfall renderer shut down");
    }
}

impl StreamHandler for WaterfallRenderer {
    fn stream_handler(&self, frame: &WaterfallFrame) {
        self.ingest(frame);
    }
}

fn clamp_lines(lines: usize) -> u16 {
    lines.min(u16::MAX as usize) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waterfall::gradient::{GRADIENT_BYTES, GRADIENT_SIZE};
    use crate::waterfall::settings::{self, WaterfallSettings};
    use std::time::{Duration, Instant};

    /// Gradient whose texel `i` is RGBA `(i, 0, 255 - i, 255)`.
    fn ramp() -> Gradient {
        let mut bytes = Vec::with_capacity(GRADIENT_BYTES);
        for i in 0..GRADIENT_SIZE {
            bytes.extend_from_slice(&[255 - i as u8, 0, i as u8, 255]);
        }
        Gradient::from_bytes("Basic", &bytes).unwrap()
    }

    fn manual_settings() -> SharedSettings {
        settings::shared(WaterfallSettings {
            auto_black_enabled: false,
            black_level: 0,
            color_gain: 0,
            center: 2.0,
            bandwidth: 4.0,
            ..Default::default()
        })
    }

    fn renderer(lines: usize) -> WaterfallRenderer {
        WaterfallRenderer::with_capacity(lines, 4, ramp(), manual_settings()).unwrap()
    }

    fn frame(value: u16) -> WaterfallFrame {
        WaterfallFrame::new(0.0, 1.0, vec![value])
    }

    #[test]
    fn ring_wraps_and_tracks_top() {
        let r = renderer(4);
        r.configure(4);
        for v in [10, 20, 30, 40, 50, 60] {
            r.ingest(&frame(v));
        }

        let slots: Vec<u16> = (0..4).map(|s| r.line(s).intensities[0]).collect();
        assert_eq!(slots, vec![50, 60, 30, 40]);
        assert_eq!(r.constants().top_line_index, 1);
        assert_eq!(r.write_index(), 2);

        let c = r.constants();
        let rows: Vec<u16> = (0..4)
            .map(|y| r.line(c.slot_for_screen_row(y).unwrap()).intensities[0])
            .collect();
        assert_eq!(rows, vec![60, 50, 40, 30]);
    }

    #[test]
    fn full_ring_is_covered_and_top_follows_count() {
        let r = renderer(8);
        r.configure(8);
        for n in 1..=20usize {
            r.ingest(&frame(n as u16));
            assert_eq!(r.constants().top_line_index as usize, (n - 1) % 8);
            if n >= 8 {
                assert!((0..8).all(|s| r.line(s).bin_count == 1));
            }
        }
    }

    #[test]
    fn frames_before_configure_are_dropped() {
        let r = renderer(4);

        //
        // A height change alone does not size the buffer; configure does.
        //
        r.reset_for_geometry(4);
        let before = r.constants();

        r.ingest(&frame(99).with_auto_black(5));

        assert_eq!(r.constants(), before);
        assert_eq!(r.write_index(), 0);
        assert!((0..4).all(|s| r.line(s).bin_count == 0));
    }

    #[test]
    fn frames_after_shutdown_are_dropped() {
        let r = renderer(4);
        r.configure(4);
        r.ingest(&frame(1));
        r.shutdown();
        r.ingest(&frame(2));

        assert_eq!(r.write_index(), 1);
        assert_eq!(r.line(1).bin_count, 0);
    }

    #[test]
    fn black_level_follows_auto_setting() {
        let settings = manual_settings();
        let r = WaterfallRenderer::with_capacity(4, 4, ramp(), settings.clone()).unwrap();
        r.configure(4);

        settings.write().auto_black_enabled = true;
        r.ingest(&frame(1).with_auto_black(0x2_1234));
        assert_eq!(r.constants().black_level, 0x1234);

        {
            let mut s = settings.write();
            s.auto_black_enabled = false;
            s.black_level = 40;
        }
        r.ingest(&frame(1).with_auto_black(0x1234));
        assert_eq!(r.constants().black_level, 26214);
    }

    #[test]
    fn ingestion_samples_live_span_and_gain() {
        let settings = manual_settings();
        let r = WaterfallRenderer::with_capacity(4, 4, ramp(), settings.clone()).unwrap();
        r.configure(4);
        {
            let mut s = settings.write();
            s.center = 1000.0;
            s.bandwidth = 100.0;
            s.color_gain = 70;
        }
        r.ingest(&frame(1));

        let c = r.constants();
        assert_eq!(c.starting_frequency, 950.0);
        assert_eq!(c.ending_frequency, 1050.0);
        assert_eq!(c.color_gain, 70);
    }

    #[test]
    fn resize_is_idempotent_and_keeps_history() {
        let r = renderer(4);
        r.configure(2);
        r.ingest(&frame(7));
        r.ingest(&frame(8));

        r.reset_for_geometry(3);
        let once = (r.constants(), r.write_index());
        r.reset_for_geometry(3);
        assert_eq!((r.constants(), r.write_index()), once);

        assert_eq!(r.constants().number_of_screen_lines, 3);
        assert_eq!(r.line(0).intensities[0], 7);
        assert_eq!(r.line(1).intensities[0], 8);
    }

    #[test]
    fn span_reset_restarts_cursor() {
        let r = renderer(4);
        r.configure(4);
        for v in 0..3 {
            r.ingest(&frame(v));
        }

        r.reset_for_new_span(7_000_000.0, 7_300_000.0);

        let c = r.constants();
        assert_eq!(r.write_index(), 0);
        assert_eq!(c.top_line_index, 0);
        assert_eq!(c.number_of_buffer_lines, 4);
        assert_eq!(c.starting_frequency, 7_000_000.0);
        assert_eq!(c.ending_frequency, 7_300_000.0);

        //
        // Old lines stay until overwritten.
        //
        assert_eq!(r.line(2).intensities[0], 2);
        r.ingest(&frame(42));
        assert_eq!(r.line(0).intensities[0], 42);
    }

    #[test]
    fn draw_puts_newest_line_on_top() {
        let r = renderer(4);
        r.configure(4);
        for v in [0, u16::MAX / 2, u16::MAX] {
            r.ingest(&WaterfallFrame::new(0.0, 1.0, vec![v; 4]));
        }

        let mut canvas = Canvas::new(4, 4);
        r.draw(&mut canvas);

        assert_eq!(canvas.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(3, 1), [127, 0, 128, 255]);
        assert_eq!(canvas.pixel(2, 2), [0, 0, 255, 255]);

        //
        // Slot 3 has never been written, so its row stays background.
        //
        assert_eq!(canvas.pixel(0, 3), [0, 0, 0, 255]);
    }

    #[test]
    fn draw_places_bins_by_frequency() {
        let r = renderer(2);
        r.configure(1);

        //
        // Visible span is 0..4 Hz; this line covers 2..4 Hz only.
        //
        r.ingest(&WaterfallFrame::new(2.0, 1.0, vec![u16::MAX, u16::MAX]));

        let mut canvas = Canvas::new(4, 1);
        r.draw(&mut canvas);

        assert_eq!(canvas.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(canvas.pixel(1, 0), [0, 0, 0, 255]);
        assert_eq!(canvas.pixel(2, 0), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(3, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn draw_before_configure_is_background() {
        let settings = manual_settings();
        settings.write().background = [1, 2, 3, 255];
        let r = WaterfallRenderer::with_capacity(4, 4, ramp(), settings).unwrap();

        let mut canvas = Canvas::new(3, 2);
        r.draw(&mut canvas);
        assert!(canvas.pixels().chunks_exact(4).all(|px| px == [1, 2, 3, 255]));
    }

    #[test]
    fn tall_screen_leaves_rows_below_history_blank() {
        let r = renderer(2);
        r.configure(5);
        r.ingest(&WaterfallFrame::new(0.0, 1.0, vec![u16::MAX; 4]));
        r.ingest(&WaterfallFrame::new(0.0, 1.0, vec![u16::MAX; 4]));

        let mut canvas = Canvas::new(4, 5);
        r.draw(&mut canvas);

        assert_eq!(canvas.pixel(0, 1), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(0, 2), [0, 0, 0, 255]);
        assert_eq!(canvas.pixel(0, 4), [0, 0, 0, 255]);
    }

    #[test]
    fn gradient_swap_applies_to_next_draw() {
        let r = renderer(2);
        r.configure(1);
        r.ingest(&WaterfallFrame::new(0.0, 1.0, vec![0; 4]));

        let mut bytes = vec![0u8; GRADIENT_BYTES];
        bytes[..4].copy_from_slice(&[9, 8, 7, 255]);
        r.set_gradient(Gradient::from_bytes("Dark", &bytes).unwrap());

        let mut canvas = Canvas::new(1, 1);
        r.draw(&mut canvas);
        assert_eq!(canvas.pixel(0, 0), [7, 8, 9, 255]);
        assert_eq!(r.gradient_name(), "Dark");
    }

    #[test]
    fn concurrent_ingest_and_draw() {
        let r = Arc::new(renderer(16));
        r.configure(16);

        let producer = {
            let r = r.clone();
            std::thread::spawn(move || {
                for v in 0..2000u16 {
                    r.ingest(&WaterfallFrame::new(0.0, 1.0, vec![v; 4]));
                }
            })
        };

        let mut canvas = Canvas::new(4, 16);
        for _ in 0..200 {
            r.draw(&mut canvas);
        }
        producer.join().unwrap();

        assert_eq!(r.constants().top_line_index as usize, 1999 % 16);
        assert_eq!(r.line(1999 % 16).intensities[0], 1999);
    }

    #[test]
    fn ingest_does_not_wait_for_a_wide_draw() {
        let r = Arc::new(renderer(1));
        r.configure(1);
        r.ingest(&WaterfallFrame::new(0.0, 1.0, vec![u16::MAX; 4]));

        let mut canvas = Canvas::new(4_000_000, 1);
        let painter = {
            let r = r.clone();
            std::thread::spawn(move || {
                let started = Instant::now();
                r.draw(&mut canvas);
                (started.elapsed(), canvas.pixel(0, 0))
            })
        };

        std::thread::sleep(Duration::from_millis(5));
        let started = Instant::now();
        r.ingest(&WaterfallFrame::new(0.0, 1.0, vec![u16::MAX; 4]));
        let ingest_time = started.elapsed();

        let (draw_time, corner) = painter.join().unwrap();
        assert_eq!(corner, [255, 0, 0, 255]);
        assert!(
            ingest_time * 2 < draw_time,
            "ingest took {:?} against a {:?} draw",
            ingest_time,
            draw_time
        );
        assert_eq!(r.write_index(), 0);
        assert_eq!(r.constants().top_line_index, 0);
    }
}
