//! Simulated display device.
//!
//! Behaves like the real transport as far as the pipeline can tell: it
//! must be opened before use, reports a version, and stays busy for a
//! fixed transfer time after every frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use antimirror_core::{DeviceChannel, DeviceEvent, DeviceVersion, IndexedBitmap, MirrorError};

pub struct SimulatedDevice {
    serial: String,
    transfer: Duration,
    open: bool,
    busy_until: Option<Instant>,
    received: Arc<AtomicU64>,
    events: broadcast::Sender<DeviceEvent>,
}

impl SimulatedDevice {
    pub const SDK_VERSION: &'static str = "simulated";

    pub fn new(serial: impl Into<String>, transfer: Duration) -> Self {
        let (events, _) = broadcast::channel(8);
        Self {
            serial: serial.into(),
            transfer,
            open: false,
            busy_until: None,
            received: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    /// Shared count of frames received.
    pub fn received(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.received)
    }

    /// Sender for injecting lifecycle events, e.g. an unplug.
    pub fn event_sender(&self) -> broadcast::Sender<DeviceEvent> {
        self.events.clone()
    }

    fn ensure_open(&self) -> Result<(), MirrorError> {
        if self.open {
            Ok(())
        } else {
            Err(MirrorError::DeviceNotOpen)
        }
    }
}

#[async_trait]
impl DeviceChannel for SimulatedDevice {
    async fn open(&mut self) -> Result<(), MirrorError> {
        self.open = true;
        debug!("simulated device {} opened", self.serial);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), MirrorError> {
        self.ensure_open()?;
        self.open = false;
        self.busy_until = None;
        // No subscribers is fine.
        let _ = self.events.send(DeviceEvent::Closed);
        Ok(())
    }

    async fn version(&mut self) -> Result<DeviceVersion, MirrorError> {
        self.ensure_open()?;
        Ok(DeviceVersion {
            sdk: Self::SDK_VERSION.into(),
            serial: self.serial.clone(),
        })
    }

    fn is_busy(&self) -> bool {
        self.busy_until.is_some_and(|until| Instant::now() < until)
    }

    async fn send_bitmap(&mut self, bitmap: &IndexedBitmap) -> Result<(), MirrorError> {
        self.ensure_open()?;
        let expected = bitmap.width as usize * bitmap.height as usize;
        if bitmap.len() != expected {
            return Err(MirrorError::Device(format!(
                "bitmap holds {} bytes, expected {expected}",
                bitmap.len()
            )));
        }
        if bitmap.data.iter().any(|&b| b > 1) {
            return Err(MirrorError::Device("bitmap is not indexed black/white".into()));
        }

        self.busy_until = Some(Instant::now() + self.transfer);
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antimirror_core::{BinaryFrame, FramePipeline, PipelineConfig, pack};

    fn bitmap() -> IndexedBitmap {
        pack(&BinaryFrame::new(2, 2, vec![0, 1, 1, 0]).unwrap())
    }

    #[tokio::test]
    async fn unplug_detaches_from_pipeline() {
        let device = SimulatedDevice::new("SIM-2", Duration::from_millis(10));
        let unplug = device.event_sender();
        let pipeline = FramePipeline::new(PipelineConfig::default());
        pipeline.attach_device(Box::new(device)).await.unwrap();
        assert!(pipeline.device_status().await.is_some());

        unplug.send(DeviceEvent::Disconnected).unwrap();
        for _ in 0..10 {
            if pipeline.device_status().await.is_none() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(pipeline.device_status().await.is_none());
    }

    #[tokio::test]
    async fn must_be_opened_first() {
        let mut dev = SimulatedDevice::new("SIM-1", Duration::from_millis(10));
        assert!(matches!(dev.version().await, Err(MirrorError::DeviceNotOpen)));
        assert!(matches!(dev.send_bitmap(&bitmap()).await, Err(MirrorError::DeviceNotOpen)));

        dev.open().await.unwrap();
        let version = dev.version().await.unwrap();
        assert_eq!(version.serial, "SIM-1");
        assert_eq!(version.sdk, SimulatedDevice::SDK_VERSION);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_for_transfer_time() {
        let mut dev = SimulatedDevice::new("SIM-1", Duration::from_millis(30));
        dev.open().await.unwrap();
        assert!(!dev.is_busy());

        dev.send_bitmap(&bitmap()).await.unwrap();
        assert!(dev.is_busy());
        tokio::time::advance(Duration::from_millis(29)).await;
        assert!(dev.is_busy());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!dev.is_busy());
        assert_eq!(dev.received().load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn rejects_malformed_bitmap() {
        let mut dev = SimulatedDevice::new("SIM-1", Duration::ZERO);
        dev.open().await.unwrap();
        let mut bad = bitmap();
        bad.width = 3;
        assert!(matches!(dev.send_bitmap(&bad).await, Err(MirrorError::Device(_))));
        assert_eq!(dev.received().load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn close_emits_event() {
        let mut dev = SimulatedDevice::new("SIM-1", Duration::ZERO);
        let mut events = dev.subscribe();
        dev.open().await.unwrap();
        dev.close().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), DeviceEvent::Closed);
        assert!(dev.close().await.is_err());
    }
}
