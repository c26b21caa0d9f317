use lazy_static::lazy_static;
use parking_lot::Mutex;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    static ref PLANNER: Mutex<FftPlanner<f32>> = Mutex::new(FftPlanner::new());
    static ref PLAN_CACHE: Mutex<HashMap<usize, Arc<dyn Fft<f32>>>> = Mutex::new(HashMap::new());
}

/// Returns a forward FFT plan for size `n`, cached per size.
pub fn find_dft(n: usize) -> Arc<dyn Fft<f32>> {
    let mut cache = PLAN_CACHE.lock();
    cache
        .entry(n)
        .or_insert_with(|| {
            log::info!("Planning forward FFT for N={}", n);
            PLANNER.lock().plan_fft_forward(n)
        })
        .clone()
}

/// Hann window coefficient for sample `i` of `n`.
pub fn hann(i: usize, n: usize) -> f32 {
    if n < 2 {
        return 1.0;
    }
    0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos())
}
