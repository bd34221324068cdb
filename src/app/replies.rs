//! Outbound messages from the device to the host.

use core::fmt::{self, Write};

use crate::fsm::DeviceState;

use super::ports::Label;

/// Room for the longest argument string (`<label> <value>`).
pub const REPLY_ARGS_CAPACITY: usize = 96;

pub type ReplyArgs = heapless::String<REPLY_ARGS_CAPACITY>;

/// Every message the device can put on the serial link.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceReply {
    Hello,
    Ready,
    InitSuccess,
    Status(DeviceState),
    NoSdCard,
    ConfigFileNotCreated,
    BadWifiConf,
    NoWifiConn,
    CamInitFail,
    NoInternet,
    CaptureFail,
    AiFail,
    FishNotRecognised,
    FishInfo { label: Label, value: f32 },
}

impl DeviceReply {
    /// Wire name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hello => "HELLO",
            Self::Ready => "READY",
            Self::InitSuccess => "INIT_SUCCESS",
            Self::Status(_) => "STATUS",
            Self::NoSdCard => "NO_SDC",
            Self::ConfigFileNotCreated => "CONFIG_FILE_NOT_CREATED",
            Self::BadWifiConf => "BAD_WIFI_CONF",
            Self::NoWifiConn => "NO_WIFI_CONN",
            Self::CamInitFail => "CAM_INIT_FAIL",
            Self::NoInternet => "NO_INTERNET",
            Self::CaptureFail => "CAPTURE_FAIL",
            Self::AiFail => "AI_FAIL",
            Self::FishNotRecognised => "FISH_NOT_RECOG",
            Self::FishInfo { .. } => "FISH_INFO",
        }
    }

    /// Argument string; empty for bare replies.
    pub fn args(&self) -> ReplyArgs {
        let mut out = ReplyArgs::new();
        // Capacity covers the widest label and any finite f32.
        let _ = match self {
            Self::Status(state) => write!(out, "{}", state.code()),
            Self::FishInfo { label, value } => write!(out, "{label} {value:.2}"),
            _ => Ok(()),
        };
        out
    }
}

impl fmt::Display for DeviceReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self.args();
        if args.is_empty() {
            f.write_str(self.name())
        } else {
            write!(f, "{} {}", self.name(), args)
        }
    }
}
