//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (SD card, Wi-Fi, camera, classifier, frame memory, the
//! serial link) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware directly.
//!
//! All port errors are typed: callers must handle every variant explicitly.

use crate::config::NetworkConfig;
use crate::error::{CaptureError, ClassifierError, NetworkError, StorageError};

use super::replies::DeviceReply;

// ───────────────────────────────────────────────────────────────
// Vision data
// ───────────────────────────────────────────────────────────────

/// Bytes per pixel of the RGB888 frames fed to the classifier.
pub const BYTES_PER_PIXEL: usize = 3;

/// Maximum detections kept from one classification pass.
pub const MAX_DETECTIONS: usize = 16;

/// Classification label.  Longer model labels are truncated by the adapter.
pub type Label = heapless::String<32>;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u16,
    pub height: u16,
}

impl FrameSize {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Size in bytes of an RGB888 frame of these dimensions.
    pub const fn byte_len(self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

/// An RGB888 frame owned by exactly one capture attempt.
#[derive(Debug)]
pub struct FrameBuffer {
    size: FrameSize,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    /// Wrap `pixels`; `None` if the length does not match `size`.
    pub fn from_pixels(size: FrameSize, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == size.byte_len()).then_some(Self { size, pixels })
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

/// One labelled result of a classification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: Label,
    pub value: f32,
}

impl Detection {
    /// Only non-zero values count as a detection.
    pub fn is_actionable(&self) -> bool {
        self.value != 0.0
    }
}

/// Detections in the order the classifier produced them.
pub type Detections = heapless::Vec<Detection, MAX_DETECTIONS>;

// ───────────────────────────────────────────────────────────────
// Config store port (driven adapter: domain ↔ SD card)
// ───────────────────────────────────────────────────────────────

/// Persistent home of the Wi-Fi record.
pub trait ConfigStore {
    /// Bring up the medium and make sure a config file exists, creating the
    /// default template when it does not.
    fn initialize(&mut self) -> Result<(), StorageError>;

    /// Read and parse the Wi-Fi record.
    fn read_network_config(&mut self) -> Result<NetworkConfig, crate::error::ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: domain ↔ Wi-Fi + backend)
// ───────────────────────────────────────────────────────────────

pub trait NetworkClient {
    /// Join the network described by `config`.  May block for the whole
    /// join budget.
    fn connect(&mut self, config: &NetworkConfig) -> Result<(), NetworkError>;

    /// Fetch the enrichment value for a detected label.
    fn lookup(&mut self, label: &str) -> Result<f32, NetworkError>;

    /// Check that the backend answers.
    fn ping(&mut self) -> Result<(), NetworkError>;
}

// ───────────────────────────────────────────────────────────────
// Capture port (driven adapter: camera → domain)
// ───────────────────────────────────────────────────────────────

pub trait CaptureSource {
    fn initialize(&mut self) -> Result<(), CaptureError>;

    /// Release the driver.  Safe to call when not initialised.
    fn deinitialize(&mut self);

    /// Capture one frame, scaled to `frame.size()`, into `frame`.
    fn capture_into(&mut self, frame: &mut FrameBuffer) -> Result<(), CaptureError>;
}

// ───────────────────────────────────────────────────────────────
// Classifier port
// ───────────────────────────────────────────────────────────────

pub trait Classifier {
    /// Frame dimensions the model expects.
    fn input_size(&self) -> FrameSize;

    fn classify(&mut self, frame: &FrameBuffer) -> Result<Detections, ClassifierError>;
}

// ───────────────────────────────────────────────────────────────
// Frame memory port
// ───────────────────────────────────────────────────────────────

/// Fallible frame allocation.  Every allocated frame must be handed back
/// through [`release`](FrameAllocator::release).
pub trait FrameAllocator {
    fn allocate(&mut self, size: FrameSize) -> Option<FrameBuffer>;

    fn release(&mut self, frame: FrameBuffer);
}

// ───────────────────────────────────────────────────────────────
// Reply sink port (driven adapter: domain → host)
// ───────────────────────────────────────────────────────────────

/// Where protocol replies go.  Sending is fire-and-forget.
pub trait ReplySink {
    fn send(&mut self, reply: &DeviceReply);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait Clock {
    /// Monotonic milliseconds since boot.
    fn uptime_ms(&self) -> u64;
}
