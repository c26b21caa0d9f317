use super::WaterfallFrame;
use crate::error::{Result, WaterfallError};
use parking_lot::{RwLock, RwLockReadGuard};

/// One row of history: intensities plus the frequency axis they were taken on.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallLine {
    pub first_bin_frequency: f32,
    pub bin_bandwidth: f32,
    pub bin_count: usize,
    pub intensities: Box<[u16]>,
}

impl WaterfallLine {
    /// An unwritten line, allocated at full width.
    pub fn new(max_bins: usize) -> Self {
        Self {
            first_bin_frequency: 0.0,
            bin_bandwidth: 0.0,
            bin_count: 0,
            intensities: vec![0; max_bins].into_boxed_slice(),
        }
    }

    /// Copies the frame's bins and axis into this line.
    /// Bins past the frame's count keep whatever they held before.
    fn copy_from(&mut self, frame: &WaterfallFrame) {
        let count = frame.bins_in_this_frame().min(self.intensities.len());
        self.intensities[..count].copy_from_slice(&frame.bins[..count]);
        self.bin_count = count;
        self.first_bin_frequency = frame.first_bin_freq as f32;
        self.bin_bandwidth = frame.bin_bandwidth as f32;
    }

    /// Takes over another line's axis and live bins.
    fn copy_line(&mut self, other: &WaterfallLine) {
        let count = other.bin_count.min(self.intensities.len());
        self.intensities[..count].copy_from_slice(&other.intensities[..count]);
        self.bin_count = count;
        self.first_bin_frequency = other.first_bin_frequency;
        self.bin_bandwidth = other.bin_bandwidth;
    }

    /// Intensity of the bin covering `frequency`, if this line has one.
    pub fn intensity_at(&self, frequency: f32) -> Option<u16> {
        if self.bin_bandwidth <= 0.0 {
            return None;
        }
        let offset = (frequency - self.first_bin_frequency) / self.bin_bandwidth;
        if offset < 0.0 {
            return None;
        }
        let bin = offset as usize;
        if bin < self.bin_count {
            Some(self.intensities[bin])
        } else {
            None
        }
    }
}

/// Fixed-capacity circular store of waterfall lines.
///
/// Every slot is allocated at full width up front and never resized.
/// Slots are individually locked so the draw path can read one line while
/// the ingestion path writes another. The write cursor itself lives with
/// the render constants, under the renderer's drawing lock.
pub struct LineRing {
    slots: Box<[RwLock<WaterfallLine>]>,
    max_bins: usize,
}

impl LineRing {
    pub fn new(capacity: usize, max_bins: usize) -> Result<Self> {
        //
        // Line indices travel as u16 in the render constants.
        //
        if capacity == 0 || capacity > u16::MAX as usize || max_bins == 0 {
            return Err(WaterfallError::RingGeometry {
                lines: capacity,
                bins: max_bins,
            });
        }

        let slots = (0..capacity)
            .map(|_| RwLock::new(WaterfallLine::new(max_bins)))
            .collect();

        Ok(Self { slots, max_bins })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// A blank line as wide as the ring's slots.
    pub fn blank_line(&self) -> WaterfallLine {
        WaterfallLine::new(self.max_bins)
    }

    /// Installs `frame` into `slot`. Panics if `slot` is out of range.
    pub fn write(&self, slot: usize, frame: &WaterfallFrame) {
        self.slots[slot].write().copy_from(frame);
    }

    pub fn read(&self, slot: usize) -> RwLockReadGuard<'_, WaterfallLine> {
        self.slots[slot].read()
    }

    /// Copies `slot` into `line`. The slot is locked only for the copy.
    pub fn copy_into(&self, slot: usize, line: &mut WaterfallLine) {
        line.copy_line(&self.slots[slot].read());
    }
}
