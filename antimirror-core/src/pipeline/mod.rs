//! Frame pipeline.
//!
//! Drives the per-tick work while capture is running:
//!
//! 1. [`TickGuard`] skips the tick if the previous one is still in flight.
//! 2. The current [`MirrorSettings`] are read once.
//! 3. [`FrameSource`] yields a frame; [`extract_region`] crops and scales it.
//! 4. [`quantize`] reduces it to black and white.
//! 5. The [`PreviewSurface`], if any, shows the result.
//! 6. [`pack`] builds the bitmap and the [`DeviceSlot`] sends it, or drops
//!    it when no device is attached or the device is busy.
//!
//! [`run`](FramePipeline::run) repeats this at a fixed cadence until
//! [`shutdown`](FramePipeline::shutdown) is called. Per-tick failures are
//! reported as a [`TickOutcome`] and never stop the loop.

pub mod guard;
pub mod phase;

pub use guard::{TickGuard, TickPermit};
pub use phase::PipelinePhase;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::capture::{FrameSource, PreviewSurface, extract_region};
use crate::device::{DeviceChannel, DeviceSlot, DeviceStatus, DeviceVersion, SendResult};
use crate::error::MirrorError;
use crate::frame::{CaptureRegion, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::pack::pack;
use crate::quantize::{QuantizationConfig, quantize};

// ── PipelineConfig ───────────────────────────────────────────────

/// Fixed parameters of a [`FramePipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Time between ticks (default 25 ms, i.e. 40 Hz).
    pub tick_period: Duration,
    /// Width of the frame handed to the quantizer.
    pub output_width: u32,
    /// Height of the frame handed to the quantizer.
    pub output_height: u32,
    /// Window over which device throughput is reported.
    pub throughput_window: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(25),
            output_width: DISPLAY_WIDTH,
            output_height: DISPLAY_HEIGHT,
            throughput_window: Duration::from_secs(1),
        }
    }
}

impl PipelineConfig {
    /// Shortest accepted tick period and throughput window.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Raise a zero tick period or throughput window to [`Self::MIN_PERIOD`].
    pub fn sanitized(mut self) -> Self {
        if self.tick_period < Self::MIN_PERIOD {
            warn!(period = ?self.tick_period, "tick period too short, using {:?}", Self::MIN_PERIOD);
            self.tick_period = Self::MIN_PERIOD;
        }
        if self.throughput_window < Self::MIN_PERIOD {
            warn!(window = ?self.throughput_window, "throughput window too short, using {:?}", Self::MIN_PERIOD);
            self.throughput_window = Self::MIN_PERIOD;
        }
        self
    }

    /// Default config ticking `fps` times per second (clamped to 1..=60).
    pub fn with_fps(fps: u8) -> Self {
        let fps = fps.clamp(1, 60);
        Self {
            tick_period: Duration::from_secs_f64(1.0 / fps as f64),
            ..Self::default()
        }
    }
}

// ── MirrorSettings ───────────────────────────────────────────────

/// Settings that may change between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MirrorSettings {
    pub quantization: QuantizationConfig,
    pub region: CaptureRegion,
}

// ── TickOutcome / PipelineStats ──────────────────────────────────

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was in progress; nothing was done.
    Skipped,
    /// Capture is not running.
    Idle,
    /// The preview surface could not be drawn on; the tick was aborted.
    SurfaceUnavailable,
    /// The source failed to produce a usable frame.
    CaptureFailed,
    /// The source ended; the pipeline is now idle.
    SourceEnded,
    /// The frame was sent to the device.
    Sent,
    /// The device was busy; the frame was dropped.
    DeviceBusy,
    /// No device attached; the frame was dropped.
    NoDevice,
    /// The device rejected the frame; it was dropped.
    SendFailed,
}

impl TickOutcome {
    /// Whether the tick did its work (as opposed to being skipped or idle).
    pub fn is_completed(&self) -> bool {
        !matches!(self, Self::Skipped | Self::Idle)
    }
}

/// Counters over the pipeline's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    /// Ticks that ran (anything but skipped or idle).
    pub ticks_completed: u64,
    /// Ticks skipped because another tick was in progress.
    pub ticks_skipped: u64,
}

// ── FramePipeline ────────────────────────────────────────────────

/// Capture → quantize → preview → send, once per tick.
///
/// All entry points take `&self`; share the pipeline through an `Arc` to
/// drive it from several tasks.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use antimirror_core::pipeline::{FramePipeline, PipelineConfig};
/// # async fn example() {
/// let pipeline = Arc::new(FramePipeline::new(PipelineConfig::default()));
/// let runner = Arc::clone(&pipeline);
/// let task = tokio::spawn(async move { runner.run().await });
/// // … later …
/// pipeline.shutdown();
/// task.await.ok();
/// # }
/// ```
pub struct FramePipeline {
    config: PipelineConfig,
    settings: watch::Sender<MirrorSettings>,
    phase: Mutex<PipelinePhase>,
    source: Mutex<Option<Box<dyn FrameSource>>>,
    preview: Mutex<Option<Box<dyn PreviewSurface>>>,
    device: DeviceSlot,
    guard: TickGuard,
    running: Arc<AtomicBool>,
    wake: Notify,
    ticks_completed: AtomicU64,
    ticks_skipped: AtomicU64,
}

impl FramePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_settings(config, MirrorSettings::default())
    }

    /// Create a pipeline with explicit initial settings.
    pub fn with_settings(config: PipelineConfig, settings: MirrorSettings) -> Self {
        let config = config.sanitized();
        let (settings, _) = watch::channel(settings);
        let device = DeviceSlot::with_window(config.throughput_window);
        Self {
            config,
            settings,
            phase: Mutex::new(PipelinePhase::Idle),
            source: Mutex::new(None),
            preview: Mutex::new(None),
            device,
            guard: TickGuard::new(),
            running: Arc::new(AtomicBool::new(false)),
            wake: Notify::new(),
            ticks_completed: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ── Capture ──────────────────────────────────────────────────

    /// Start capturing from `source`.
    ///
    /// Fails with [`MirrorError::InvalidTransition`] if capture is already
    /// running; stop it first to switch sources.
    pub async fn start_capture(&self, source: Box<dyn FrameSource>) -> Result<(), MirrorError> {
        let mut phase = self.phase.lock().await;
        phase.start()?;
        *self.source.lock().await = Some(source);
        drop(phase);

        info!("capture started");
        self.wake.notify_one();
        Ok(())
    }

    /// Stop capturing and release the source.
    pub async fn stop_capture(&self) -> Result<(), MirrorError> {
        self.phase.lock().await.stop()?;
        let source = self.source.lock().await.take();
        if let Some(mut source) = source {
            source.stop().await;
        }
        self.device.clear_rate().await;
        info!("capture stopped");
        Ok(())
    }

    /// Current phase.
    pub async fn phase(&self) -> PipelinePhase {
        *self.phase.lock().await
    }

    pub async fn is_capturing(&self) -> bool {
        self.phase.lock().await.is_running()
    }

    // ── Settings ─────────────────────────────────────────────────

    /// Select the quantization algorithm used from the next tick on.
    pub fn set_quantization(&self, quantization: QuantizationConfig) {
        self.settings.send_modify(|s| s.quantization = quantization);
        debug!("quantization set to {quantization}");
    }

    /// Move the capture rectangle; applies from the next tick on.
    pub fn set_capture_region(&self, region: CaptureRegion) -> Result<(), MirrorError> {
        region.validate()?;
        self.settings.send_modify(|s| s.region = region);
        debug!(?region, "capture region set");
        Ok(())
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> MirrorSettings {
        *self.settings.borrow()
    }

    /// Receiver that observes every settings change.
    pub fn subscribe_settings(&self) -> watch::Receiver<MirrorSettings> {
        self.settings.subscribe()
    }

    // ── Device ───────────────────────────────────────────────────

    /// Attach `device`, replacing any device already attached.
    pub async fn attach_device(
        &self,
        device: Box<dyn DeviceChannel>,
    ) -> Result<DeviceVersion, MirrorError> {
        self.device.connect(device).await
    }

    pub async fn detach_device(&self) {
        self.device.disconnect().await;
    }

    /// Status of the attached device, or `None` when nothing is attached.
    pub async fn device_status(&self) -> Option<DeviceStatus> {
        self.device.status().await
    }

    // ── Preview ──────────────────────────────────────────────────

    /// Install or remove the local preview surface.
    pub async fn set_preview(&self, preview: Option<Box<dyn PreviewSurface>>) {
        *self.preview.lock().await = preview;
    }

    // ── Ticking ──────────────────────────────────────────────────

    /// Run one tick, or skip it if another tick is still in progress.
    ///
    /// Can be called directly to process a single frame.
    pub async fn tick(&self) -> TickOutcome {
        let Some(_permit) = self.guard.try_acquire() else {
            self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
            debug!("tick skipped: previous tick still in progress");
            return TickOutcome::Skipped;
        };

        let outcome = self.process_frame().await;
        if outcome.is_completed() {
            self.ticks_completed.fetch_add(1, Ordering::Relaxed);
        }
        trace!(?outcome, "tick");
        outcome
    }

    async fn process_frame(&self) -> TickOutcome {
        if !self.is_capturing().await {
            return TickOutcome::Idle;
        }

        let settings = self.settings();

        if let Some(preview) = self.preview.lock().await.as_ref() {
            if !preview.is_available() {
                debug!("preview surface unavailable");
                return TickOutcome::SurfaceUnavailable;
            }
        }

        let captured = {
            let mut source = self.source.lock().await;
            match source.as_mut() {
                Some(source) => source.next_frame().await,
                None => return TickOutcome::Idle,
            }
        };
        let raw = match captured {
            Ok(frame) => frame,
            Err(MirrorError::SourceEnded) => {
                self.end_capture().await;
                return TickOutcome::SourceEnded;
            }
            Err(e) => {
                warn!("frame capture failed: {e}");
                return TickOutcome::CaptureFailed;
            }
        };

        let frame = match extract_region(
            raw,
            settings.region,
            self.config.output_width,
            self.config.output_height,
        ) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("region extraction failed: {e}");
                return TickOutcome::CaptureFailed;
            }
        };

        let quantized = quantize(&frame, &settings.quantization);

        if let Some(preview) = self.preview.lock().await.as_mut() {
            if let Err(e) = preview.present(&quantized.to_rgba()) {
                warn!("preview failed: {e}");
            }
        }

        match self.device.offer(&pack(&quantized)).await {
            SendResult::Sent => TickOutcome::Sent,
            SendResult::Busy => {
                debug!("device busy, frame dropped");
                TickOutcome::DeviceBusy
            }
            SendResult::NoDevice => TickOutcome::NoDevice,
            SendResult::Failed(e) => {
                warn!("sending frame failed: {e}");
                TickOutcome::SendFailed
            }
        }
    }

    /// The source reported end of stream.
    async fn end_capture(&self) {
        let mut phase = self.phase.lock().await;
        if phase.stop().is_ok() {
            self.source.lock().await.take();
            drop(phase);
            self.device.clear_rate().await;
            info!("frame source ended, capture stopped");
        }
    }

    /// Tick at the configured cadence until [`shutdown`](Self::shutdown).
    ///
    /// While idle the loop sleeps until capture starts. Ticks that fall
    /// due while a slow tick is still running are skipped.
    pub async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!(period = ?self.config.tick_period, "pipeline loop started");

        let mut interval = time::interval(self.config.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.running.load(Ordering::SeqCst) {
            if !self.is_capturing().await {
                self.wake.notified().await;
                interval.reset_immediately();
                continue;
            }

            interval.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.tick().await;
        }

        info!("pipeline loop stopped");
    }

    /// Signal [`run`](Self::run) to return.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Whether [`run`](Self::run) is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            ticks_completed: self.ticks_completed.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use async_trait::async_trait;

    struct Solid([u8; 4]);

    #[async_trait]
    impl FrameSource for Solid {
        async fn next_frame(&mut self) -> Result<Frame, MirrorError> {
            Frame::filled(8, 8, self.0)
        }
    }

    fn small() -> PipelineConfig {
        PipelineConfig {
            output_width: 8,
            output_height: 8,
            ..PipelineConfig::default()
        }
    }

    fn whole_source() -> CaptureRegion {
        CaptureRegion::new(0, 0, 8, 8)
    }

    #[test]
    fn default_config_is_40_hz_display_size() {
        let config = PipelineConfig::default();
        assert_eq!(config.tick_period, Duration::from_millis(25));
        assert_eq!((config.output_width, config.output_height), (400, 240));
        assert_eq!(config.throughput_window, Duration::from_secs(1));
    }

    #[test]
    fn with_fps_clamps() {
        assert_eq!(PipelineConfig::with_fps(40).tick_period, Duration::from_millis(25));
        assert_eq!(PipelineConfig::with_fps(0).tick_period, Duration::from_secs(1));
        assert_eq!(
            PipelineConfig::with_fps(200).tick_period,
            PipelineConfig::with_fps(60).tick_period
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_raised_to_minimum() {
        let config = PipelineConfig {
            tick_period: Duration::ZERO,
            throughput_window: Duration::ZERO,
            ..small()
        };
        let pipeline = Arc::new(FramePipeline::new(config));
        assert_eq!(pipeline.config().tick_period, PipelineConfig::MIN_PERIOD);
        assert_eq!(pipeline.config().throughput_window, PipelineConfig::MIN_PERIOD);

        pipeline.set_capture_region(whole_source()).unwrap();
        pipeline.start_capture(Box::new(Solid([255; 4]))).await.unwrap();
        let runner = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.run().await }
        });
        time::sleep(Duration::from_millis(10)).await;
        pipeline.shutdown();
        runner.await.unwrap();
        assert!(pipeline.stats().ticks_completed > 0);
    }

    #[tokio::test]
    async fn idle_tick_does_nothing() {
        let pipeline = FramePipeline::new(small());
        assert_eq!(pipeline.tick().await, TickOutcome::Idle);
        assert_eq!(pipeline.stats(), PipelineStats::default());
    }

    #[tokio::test]
    async fn tick_without_device_drops_frame() {
        let pipeline = FramePipeline::new(small());
        pipeline.set_capture_region(whole_source()).unwrap();
        pipeline.start_capture(Box::new(Solid([255; 4]))).await.unwrap();
        assert_eq!(pipeline.tick().await, TickOutcome::NoDevice);
        assert_eq!(pipeline.stats().ticks_completed, 1);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let pipeline = FramePipeline::new(small());
        pipeline.start_capture(Box::new(Solid([0; 4]))).await.unwrap();
        let err = pipeline.start_capture(Box::new(Solid([0; 4]))).await;
        assert!(matches!(err, Err(MirrorError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn stop_returns_to_idle() {
        let pipeline = FramePipeline::new(small());
        assert!(pipeline.stop_capture().await.is_err());
        pipeline.start_capture(Box::new(Solid([0; 4]))).await.unwrap();
        assert!(pipeline.is_capturing().await);
        pipeline.stop_capture().await.unwrap();
        assert_eq!(pipeline.phase().await, PipelinePhase::Idle);
        assert_eq!(pipeline.tick().await, TickOutcome::Idle);
    }

    #[tokio::test]
    async fn invalid_region_is_rejected() {
        let pipeline = FramePipeline::new(small());
        let before = pipeline.settings();
        assert!(pipeline.set_capture_region(CaptureRegion::new(0, 0, 0, 5)).is_err());
        assert_eq!(pipeline.settings(), before);
    }

    #[tokio::test]
    async fn settings_are_last_write_wins() {
        let pipeline = FramePipeline::new(small());
        let mut rx = pipeline.subscribe_settings();
        pipeline.set_quantization(QuantizationConfig::Atkinson);
        pipeline.set_quantization(QuantizationConfig::Threshold { threshold: 7 });
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().quantization,
            QuantizationConfig::Threshold { threshold: 7 }
        );
    }
}
