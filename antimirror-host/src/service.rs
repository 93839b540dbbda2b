//! Mirror service.
//!
//! Builds the collaborators named in [`HostConfig`], hands them to a
//! [`FramePipeline`] and keeps it ticking until stopped, logging the
//! device status at a fixed interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, info, warn};

use antimirror_core::{FramePipeline, FrameSource, MirrorError};

use crate::config::{HostConfig, SourceKind};
use crate::device::SimulatedDevice;
use crate::preview::PngPreview;
use crate::sources::{ImageFileSource, TestPatternSource};

// ── MirrorService ────────────────────────────────────────────────

/// Top-level service owning the pipeline.
pub struct MirrorService {
    config: HostConfig,
    pipeline: Arc<FramePipeline>,
    running: Arc<AtomicBool>,
}

impl MirrorService {
    pub fn new(config: HostConfig) -> Self {
        let pipeline = FramePipeline::with_settings(config.to_pipeline_config(), config.to_settings());
        Self {
            config,
            pipeline: Arc::new(pipeline),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn pipeline(&self) -> Arc<FramePipeline> {
        Arc::clone(&self.pipeline)
    }

    /// Run until the stop handle is cleared.
    ///
    /// 1. Opens the configured frame source.
    /// 2. Attaches the simulated device and the PNG preview, if enabled.
    /// 3. Starts capture and spawns the pipeline loop.
    /// 4. Logs device status every status interval.
    /// 5. Stops capture, the loop and the device.
    pub async fn run(&self) -> Result<(), MirrorError> {
        let source = self.open_source()?;
        self.running.store(true, Ordering::SeqCst);

        if self.config.device.simulated {
            let transfer = Duration::from_millis(self.config.device.transfer_ms);
            let device = SimulatedDevice::new("SIM-0000001", transfer);
            let version = self.pipeline.attach_device(Box::new(device)).await?;
            info!("device: {version}");
        }

        if !self.config.preview.path.as_os_str().is_empty() {
            let preview = PngPreview::new(&self.config.preview.path);
            info!("preview: {}", preview.path().display());
            self.pipeline.set_preview(Some(Box::new(preview))).await;
        }

        self.pipeline.start_capture(source).await?;

        let pipeline = Arc::clone(&self.pipeline);
        let loop_handle = tokio::spawn(async move { pipeline.run().await });

        let period = Duration::from_secs(self.config.logging.status_interval_secs.max(1));
        let mut status = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = status.tick() => self.log_status().await,
                _ = Self::wait_for_stop(&self.running) => break,
            }
        }

        if let Err(e) = self.pipeline.stop_capture().await {
            warn!("stopping capture: {e}");
        }
        self.pipeline.shutdown();
        if let Err(e) = loop_handle.await {
            error!("pipeline loop panicked: {e}");
        }
        self.pipeline.detach_device().await;

        self.running.store(false, Ordering::SeqCst);
        info!("mirror service stopped");
        Ok(())
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ── Internal ─────────────────────────────────────────────────

    fn open_source(&self) -> Result<Box<dyn FrameSource>, MirrorError> {
        let capture = &self.config.capture;
        Ok(match capture.source {
            SourceKind::TestPattern => Box::new(TestPatternSource::new(
                capture.pattern_width,
                capture.pattern_height,
            )?),
            SourceKind::Image => Box::new(ImageFileSource::open(&capture.image_path)?),
        })
    }

    async fn log_status(&self) {
        let stats = self.pipeline.stats();
        match self.pipeline.device_status().await {
            Some(status) => info!(
                "{}: {} frames sent, {} fps (ticks {}, skipped {})",
                status.version.serial,
                status.total_frames_sent,
                status.frames_last_window,
                stats.ticks_completed,
                stats.ticks_skipped,
            ),
            None => info!(
                "no device (ticks {}, skipped {})",
                stats.ticks_completed, stats.ticks_skipped
            ),
        }
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
