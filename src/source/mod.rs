pub mod audio;
pub mod synthetic;

use crate::error::Result;
use crate::waterfall::{SharedSettings, WaterfallFrame};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Receives waterfall frames pushed by a source, one per call, on the
/// source's delivery thread.
pub trait StreamHandler: Send + Sync {
    fn stream_handler(&self, frame: &WaterfallFrame);
}

/// A running producer of waterfall frames.
pub trait FrameSource {
    fn name(&self) -> &str;
    /// Stops delivery and joins the delivery thread.
    fn stop(&mut self);
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Generated test signal.
    Synthetic,
    /// Spectrum of the default audio input.
    Audio,
}

/// Starts a source of the given kind, pushing into `delegate`.
pub fn start(
    kind: SourceKind,
    delegate: Delegate,
    settings: SharedSettings,
) -> Result<Box<dyn FrameSource>> {
    Ok(match kind {
        SourceKind::Synthetic => Box::new(synthetic::SyntheticSource::start(delegate, settings)),
        SourceKind::Audio => Box::new(audio::AudioSource::start(delegate, settings)?),
    })
}

/// The slot a source delivers into. Sources never hold the handler
/// directly, so detaching here is enough to stop frames reaching it.
#[derive(Clone, Default)]
pub struct Delegate {
    handler: Arc<RwLock<Option<Arc<dyn StreamHandler>>>>,
}

impl Delegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, handler: Arc<dyn StreamHandler>) {
        *self.handler.write() = Some(handler);
    }

    /// Detaches the current handler. Returns once any delivery already in
    /// progress has finished; no frame reaches the old handler afterwards.
    pub fn detach(&self) {
        if self.handler.write().take().is_some() {
            log::info!("Stream handler detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Hands `frame` to the attached handler. Returns false when nothing is
    /// attached and the frame was discarded.
    pub fn deliver(&self, frame: &WaterfallFrame) -> bool {
        match self.handler.read().as_ref() {
            Some(handler) => {
                handler.stream_handler(frame);
                true
            }
            None => false,
        }
    }
}

/// Once-per-second delivery statistics for a source.
pub(crate) struct DeliveryStats {
    source: &'static str,
    since: Instant,
    delivered: usize,
    discarded: usize,
}

impl DeliveryStats {
    pub(crate) fn new(source: &'static str) -> Self {
        Self {
            source,
            since: Instant::now(),
            delivered: 0,
            discarded: 0,
        }
    }

    pub(crate) fn record(&mut self, delivered: bool) {
        if delivered {
            self.delivered += 1;
        } else {
            self.discarded += 1;
        }

        if self.since.elapsed() > Duration::from_secs(1) {
            log::info!(
                "{} | Delivered: {} | Discarded: {}",
                self.source,
                self.delivered,
                self.discarded
            );
            self.delivered = 0;
            self.discarded = 0;
            self.since = Instant::now();
        }
    }
}

/// Estimates a frame's black level as the intensity below which a tenth of
/// its bins fall.
pub fn auto_black_level(bins: &[u16]) -> u32 {
    if bins.is_empty() {
        return 0;
    }
    let mut sorted = bins.to_vec();
    let k = sorted.len() / 10;
    let (_, level, _) = sorted.select_nth_unstable(k);
    *level as u32
}

/// Delivery thread handle shared by the sources: a stop flag plus the
/// thread to join.
pub(crate) struct Worker {
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(flag))
            .ok();
        if thread.is_none() {
            log::error!("Failed to spawn delivery thread '{}'", name);
        }
        Self { running, thread }
    }

    pub(crate) fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Delivery thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
