//! Unified error types for the Aquabotica firmware.
//!
//! Each collaborator behind a port trait has its own small `Copy` error
//! enum.  The init sequence funnels them into [`Error`] so a single
//! mapping decides which reply and failure state the host sees.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every collaborator failure converts into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The SD card (config store) could not be prepared.
    Storage(StorageError),
    /// The persisted network configuration is unusable.
    Config(ConfigError),
    /// Wi-Fi join or backend request failed.
    Network(NetworkError),
    /// Camera initialisation or frame capture failed.
    Capture(CaptureError),
    /// Inference over a captured frame failed.
    Classifier(ClassifierError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Capture(e) => write!(f, "capture: {e}"),
            Self::Classifier(e) => write!(f, "classifier: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// No card detected, or the mount point is not a directory.
    NoMedium,
    /// The default config file was missing and could not be created.
    ConfigFileUnwritable,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMedium => write!(f, "no storage medium"),
            Self::ConfigFileUnwritable => write!(f, "config file could not be created"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file was empty or unreadable.
    Empty,
    /// A value exceeds the capacity of its field.  Carries the key.
    FieldTooLong(&'static str),
    /// A [`SystemConfig`](crate::config::SystemConfig) field is out of range.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "config file empty or unreadable"),
            Self::FieldTooLong(key) => write!(f, "value for '{key}' too long"),
            Self::Invalid(msg) => write!(f, "invalid: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Network errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// SSID or password is empty.
    MissingCredentials,
    /// Static addressing requested but one of IP/Gateway/MASK is malformed.
    InvalidAddress,
    /// The driver refused the station or static-IP configuration.
    DriverRejected,
    /// The link never came up within the poll budget.
    JoinTimeout,
    /// A request was attempted without an established link.
    NotConnected,
    /// The HTTP request could not be performed at all.
    RequestFailed,
    /// The backend answered with a non-2xx status.
    HttpStatus(u16),
    /// The response body was not the expected JSON.
    MalformedResponse,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "SSID or password missing"),
            Self::InvalidAddress => write!(f, "invalid IP, gateway or mask"),
            Self::DriverRejected => write!(f, "Wi-Fi driver rejected configuration"),
            Self::JoinTimeout => write!(f, "Wi-Fi join timed out"),
            Self::NotConnected => write!(f, "not connected"),
            Self::RequestFailed => write!(f, "HTTP request failed"),
            Self::HttpStatus(code) => write!(f, "HTTP status {code}"),
            Self::MalformedResponse => write!(f, "malformed response body"),
        }
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

// ---------------------------------------------------------------------------
// Capture errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    /// Driver initialisation failed (carries the ESP-IDF error code, 0 in sim).
    InitFailed(i32),
    /// A frame was requested before the camera was initialised.
    NotInitialised,
    /// The driver returned no frame.
    FrameUnavailable,
    /// JPEG → RGB888 conversion or resize failed.
    ConversionFailed,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed(code) => write!(f, "camera init failed (0x{code:x})"),
            Self::NotInitialised => write!(f, "camera not initialised"),
            Self::FrameUnavailable => write!(f, "no frame available"),
            Self::ConversionFailed => write!(f, "frame conversion failed"),
        }
    }
}

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        Self::Capture(e)
    }
}

// ---------------------------------------------------------------------------
// Classifier errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierError {
    /// The inference engine returned a non-OK code.
    Inference(i32),
    /// The frame does not match the model's input dimensions.
    InputMismatch,
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inference(code) => write!(f, "inference failed ({code})"),
            Self::InputMismatch => write!(f, "frame size does not match model input"),
        }
    }
}

impl From<ClassifierError> for Error {
    fn from(e: ClassifierError) -> Self {
        Self::Classifier(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
