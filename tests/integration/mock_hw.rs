//! Mock adapters for integration tests.
//!
//! Every mock records how it was called so tests can assert on the full
//! interaction history without touching real hardware.  Behaviour is
//! scripted per call; an exhausted script falls back to success.

#![allow(dead_code)]

use std::collections::VecDeque;

use aquabotica::app::ports::{
    CaptureSource, Classifier, ConfigStore, Detection, Detections, FrameAllocator, FrameBuffer,
    FrameSize, Label, NetworkClient, ReplySink,
};
use aquabotica::app::replies::DeviceReply;
use aquabotica::app::service::{AppService, Peripherals};
use aquabotica::config::{NetworkConfig, SystemConfig};
use aquabotica::error::{CaptureError, ClassifierError, ConfigError, NetworkError, StorageError};

// ── Config store ──────────────────────────────────────────────

pub struct MockStore {
    pub init_result: Result<(), StorageError>,
    pub config_result: Result<NetworkConfig, ConfigError>,
    pub init_calls: u32,
    pub read_calls: u32,
}

impl Default for MockStore {
    fn default() -> Self {
        Self {
            init_result: Ok(()),
            config_result: NetworkConfig::parse("SSID=tank\nPassword=fishfood\n"),
            init_calls: 0,
            read_calls: 0,
        }
    }
}

impl ConfigStore for MockStore {
    fn initialize(&mut self) -> Result<(), StorageError> {
        self.init_calls += 1;
        self.init_result
    }

    fn read_network_config(&mut self) -> Result<NetworkConfig, ConfigError> {
        self.read_calls += 1;
        self.config_result.clone()
    }
}

// ── Network ───────────────────────────────────────────────────

pub struct MockNetwork {
    pub connect_result: Result<(), NetworkError>,
    pub ping_result: Result<(), NetworkError>,
    /// Results for successive lookups; empty → `Ok(default_value)`.
    pub lookup_script: VecDeque<Result<f32, NetworkError>>,
    pub default_value: f32,
    pub connects: Vec<NetworkConfig>,
    pub lookups: Vec<String>,
    pub pings: u32,
}

impl Default for MockNetwork {
    fn default() -> Self {
        Self {
            connect_result: Ok(()),
            ping_result: Ok(()),
            lookup_script: VecDeque::new(),
            default_value: 1.0,
            connects: Vec::new(),
            lookups: Vec::new(),
            pings: 0,
        }
    }
}

impl MockNetwork {
    pub fn touched(&self) -> bool {
        !self.connects.is_empty() || !self.lookups.is_empty() || self.pings > 0
    }
}

impl NetworkClient for MockNetwork {
    fn connect(&mut self, config: &NetworkConfig) -> Result<(), NetworkError> {
        self.connects.push(config.clone());
        self.connect_result
    }

    fn lookup(&mut self, label: &str) -> Result<f32, NetworkError> {
        self.lookups.push(label.to_owned());
        self.lookup_script
            .pop_front()
            .unwrap_or(Ok(self.default_value))
    }

    fn ping(&mut self) -> Result<(), NetworkError> {
        self.pings += 1;
        self.ping_result
    }
}

// ── Camera ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockCamera {
    pub init_result: Option<CaptureError>,
    /// Results for successive captures; empty → success.
    pub capture_script: VecDeque<Result<(), CaptureError>>,
    pub init_calls: u32,
    pub deinit_calls: u32,
    pub captures: u32,
}

impl MockCamera {
    pub fn fail_next_captures(&mut self, n: usize) {
        self.capture_script
            .extend(std::iter::repeat_n(Err(CaptureError::FrameUnavailable), n));
    }

    pub fn touched(&self) -> bool {
        self.init_calls > 0 || self.deinit_calls > 0 || self.captures > 0
    }
}

impl CaptureSource for MockCamera {
    fn initialize(&mut self) -> Result<(), CaptureError> {
        self.init_calls += 1;
        self.init_result.map_or(Ok(()), Err)
    }

    fn deinitialize(&mut self) {
        self.deinit_calls += 1;
    }

    fn capture_into(&mut self, frame: &mut FrameBuffer) -> Result<(), CaptureError> {
        self.captures += 1;
        let result = self.capture_script.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            frame.pixels_mut().fill(0x7f);
        }
        result
    }
}

// ── Classifier ────────────────────────────────────────────────

pub type Pass = Result<Vec<(&'static str, f32)>, ClassifierError>;

pub struct MockClassifier {
    pub input: FrameSize,
    /// Results for successive passes; empty → no detections.
    pub script: VecDeque<Pass>,
    pub calls: u32,
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self {
            input: FrameSize::new(96, 96),
            script: VecDeque::new(),
            calls: 0,
        }
    }
}

impl MockClassifier {
    pub fn push_empty(&mut self, n: usize) {
        self.script.extend(std::iter::repeat_n(Ok(Vec::new()), n));
    }

    pub fn push(&mut self, pass: Pass) {
        self.script.push_back(pass);
    }
}

impl Classifier for MockClassifier {
    fn input_size(&self) -> FrameSize {
        self.input
    }

    fn classify(&mut self, frame: &FrameBuffer) -> Result<Detections, ClassifierError> {
        self.calls += 1;
        assert_eq!(frame.size(), self.input, "frame must match model input");
        let pass = self.script.pop_front().unwrap_or(Ok(Vec::new()))?;
        Ok(pass
            .into_iter()
            .map(|(label, value)| Detection {
                label: Label::try_from(label).unwrap(),
                value,
            })
            .collect())
    }
}

// ── Frame memory ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockFrames {
    /// Refuse every allocation.
    pub exhausted: bool,
    pub allocations: u32,
    pub releases: u32,
    pub max_outstanding: u32,
    outstanding: u32,
}

impl MockFrames {
    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }
}

impl FrameAllocator for MockFrames {
    fn allocate(&mut self, size: FrameSize) -> Option<FrameBuffer> {
        if self.exhausted {
            return None;
        }
        self.allocations += 1;
        self.outstanding += 1;
        self.max_outstanding = self.max_outstanding.max(self.outstanding);
        FrameBuffer::from_pixels(size, vec![0; size.byte_len()])
    }

    fn release(&mut self, _frame: FrameBuffer) {
        self.releases += 1;
        self.outstanding -= 1;
    }
}

// ── Reply sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub replies: Vec<DeviceReply>,
}

impl RecordingSink {
    /// Replies rendered as wire lines (without the newline).
    pub fn lines(&self) -> Vec<String> {
        self.replies.iter().map(ToString::to_string).collect()
    }

    pub fn clear(&mut self) {
        self.replies.clear();
    }

    pub fn count(&self, reply: &DeviceReply) -> usize {
        self.replies.iter().filter(|r| *r == reply).count()
    }
}

impl ReplySink for RecordingSink {
    fn send(&mut self, reply: &DeviceReply) {
        self.replies.push(reply.clone());
    }
}

// ── Assembly ──────────────────────────────────────────────────

pub type MockApp = AppService<MockStore, MockNetwork, MockCamera, MockClassifier, MockFrames>;

pub fn mock_peripherals() -> Peripherals<MockStore, MockNetwork, MockCamera, MockClassifier, MockFrames> {
    Peripherals {
        store: MockStore::default(),
        network: MockNetwork::default(),
        camera: MockCamera::default(),
        classifier: MockClassifier::default(),
        frames: MockFrames::default(),
    }
}

/// A service in `Boot` with all-succeeding collaborators.
pub fn make_app() -> MockApp {
    AppService::new(SystemConfig::default(), mock_peripherals())
}
