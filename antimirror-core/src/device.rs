//! Device channel boundary and the slot holding the attached device.
//!
//! The physical transport (USB serial, handshake, version query) is an
//! external collaborator implementing [`DeviceChannel`]. The pipeline only
//! ever borrows the device held in a [`DeviceSlot`] for a single send.
//!
//! ```text
//!  connect(new) ──► close(previous)  (failure logged, ignored)
//!                   open(new) ──► version() ──► install + watch events
//!
//!  DeviceEvent::{Disconnected, Closed} ──► slot cleared
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::MirrorError;
use crate::pack::IndexedBitmap;
use crate::throughput::ThroughputCounter;

// ── Types ────────────────────────────────────────────────────────

/// Version information reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceVersion {
    pub sdk: String,
    pub serial: String,
}

impl fmt::Display for DeviceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serial {} (sdk {})", self.serial, self.sdk)
    }
}

/// Lifecycle notifications emitted by a device transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The device was unplugged or the link dropped.
    Disconnected,
    /// The connection was closed.
    Closed,
}

/// Snapshot of the attached device for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub version: DeviceVersion,
    pub total_frames_sent: u64,
    pub frames_last_window: u64,
}

/// What happened to a frame offered to the slot.
#[derive(Debug)]
pub enum SendResult {
    /// The device accepted the frame.
    Sent,
    /// The device was busy; the frame was dropped.
    Busy,
    /// No device attached; the frame was dropped.
    NoDevice,
    /// The device rejected the frame; it is not retried.
    Failed(MirrorError),
}

// ── DeviceChannel ────────────────────────────────────────────────

/// Capability surface of a display device.
#[async_trait]
pub trait DeviceChannel: Send + Sync {
    /// Open the connection.
    async fn open(&mut self) -> Result<(), MirrorError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), MirrorError>;

    /// Query SDK version and serial number.
    async fn version(&mut self) -> Result<DeviceVersion, MirrorError>;

    /// Whether the device is still processing a previous frame.
    fn is_busy(&self) -> bool;

    /// Transmit one bitmap.
    async fn send_bitmap(&mut self, bitmap: &IndexedBitmap) -> Result<(), MirrorError>;

    /// Subscribe to disconnect / close notifications.
    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent>;
}

// ── DeviceSlot ───────────────────────────────────────────────────

struct ConnectedDevice {
    channel: Box<dyn DeviceChannel>,
    version: DeviceVersion,
    throughput: ThroughputCounter,
    /// Identifies this attachment so stale watchers leave newer ones alone.
    generation: u64,
}

/// Holder for at most one attached device.
///
/// Cheap to clone; all clones refer to the same slot.
#[derive(Clone)]
pub struct DeviceSlot {
    inner: Arc<Mutex<Option<ConnectedDevice>>>,
    generation: Arc<AtomicU64>,
    /// Throughput window for each new attachment.
    window: Duration,
}

impl Default for DeviceSlot {
    fn default() -> Self {
        Self::with_window(Duration::from_secs(1))
    }
}

impl DeviceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty slot whose devices report throughput over `window`.
    pub fn with_window(window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            window,
        }
    }

    /// Replace the attached device with `device`.
    ///
    /// A failure while closing the previous device is logged and ignored;
    /// opening the new one always proceeds.
    pub async fn connect(
        &self,
        mut device: Box<dyn DeviceChannel>,
    ) -> Result<DeviceVersion, MirrorError> {
        let previous = self.inner.lock().await.take();
        if let Some(mut previous) = previous {
            if let Err(e) = previous.channel.close().await {
                warn!("closing previous device failed: {e}");
            }
        }

        device.open().await?;
        let version = device.version().await?;
        let events = device.subscribe();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        *self.inner.lock().await = Some(ConnectedDevice {
            channel: device,
            version: version.clone(),
            throughput: ThroughputCounter::starting_at(Instant::now(), self.window),
            generation,
        });
        info!("device attached: {version}");

        tokio::spawn(Self::watch(Arc::clone(&self.inner), events, generation));
        Ok(version)
    }

    /// Detach and close the current device, if any.
    pub async fn disconnect(&self) {
        let previous = self.inner.lock().await.take();
        if let Some(mut previous) = previous {
            if let Err(e) = previous.channel.close().await {
                warn!("closing device failed: {e}");
            }
            info!("device detached: {}", previous.version);
        }
    }

    pub async fn is_attached(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Current device details, or `None` when nothing is attached.
    pub async fn status(&self) -> Option<DeviceStatus> {
        self.inner.lock().await.as_ref().map(|d| DeviceStatus {
            version: d.version.clone(),
            total_frames_sent: d.throughput.total(),
            frames_last_window: d.throughput.last_window(),
        })
    }

    /// Offer a bitmap to the device: sent if a device is attached and not
    /// busy, dropped otherwise. Throughput is updated either way.
    pub async fn offer(&self, bitmap: &IndexedBitmap) -> SendResult {
        let mut guard = self.inner.lock().await;
        let Some(device) = guard.as_mut() else {
            return SendResult::NoDevice;
        };

        if device.channel.is_busy() {
            device.throughput.roll_at(Instant::now());
            return SendResult::Busy;
        }

        match device.channel.send_bitmap(bitmap).await {
            Ok(()) => {
                device.throughput.record_send_at(Instant::now());
                SendResult::Sent
            }
            Err(e) => {
                device.throughput.roll_at(Instant::now());
                SendResult::Failed(e)
            }
        }
    }

    /// Zero the per-window rate of the attached device.
    pub async fn clear_rate(&self) {
        if let Some(device) = self.inner.lock().await.as_mut() {
            device.throughput.clear_rate();
        }
    }

    /// Clear the slot when the device reports it went away.
    async fn watch(
        inner: Arc<Mutex<Option<ConnectedDevice>>>,
        mut events: broadcast::Receiver<DeviceEvent>,
        generation: u64,
    ) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let mut slot = inner.lock().await;
                    if slot.as_ref().is_some_and(|d| d.generation == generation) {
                        if let Some(gone) = slot.take() {
                            info!("device {}: {event:?}", gone.version);
                        }
                    }
                    return;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("device watcher lagged by {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}
