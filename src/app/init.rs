//! Init sequence: storage → Wi-Fi record → network → camera → backend.
//!
//! Stages run strictly in order and the first failure ends the run.  Each
//! failure maps to exactly one reply and one failure state.

use core::fmt;

use log::{info, warn};

use crate::error::{Error, StorageError};
use crate::fsm::DeviceState;

use super::ports::{CaptureSource, ConfigStore, NetworkClient};
use super::replies::DeviceReply;

/// Which step of the sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    Storage,
    NetworkConfig,
    Network,
    Camera,
    Backend,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Storage => "storage",
            Self::NetworkConfig => "network config",
            Self::Network => "network",
            Self::Camera => "camera",
            Self::Backend => "backend",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitFailure {
    pub stage: InitStage,
    pub cause: Error,
}

impl InitFailure {
    fn new(stage: InitStage, cause: impl Into<Error>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    /// State the device settles in.
    pub fn state(&self) -> DeviceState {
        match self.stage {
            InitStage::Storage => match self.cause {
                Error::Storage(StorageError::ConfigFileUnwritable) => DeviceState::ConfigFileMissing,
                _ => DeviceState::NoSdCard,
            },
            InitStage::NetworkConfig => DeviceState::BadWifiConfig,
            InitStage::Network => DeviceState::NoWifiConn,
            InitStage::Camera => DeviceState::CamInitFail,
            InitStage::Backend => DeviceState::NoInternet,
        }
    }

    /// Reply reported to the host.
    pub fn reply(&self) -> DeviceReply {
        match self.state() {
            DeviceState::ConfigFileMissing => DeviceReply::ConfigFileNotCreated,
            DeviceState::BadWifiConfig => DeviceReply::BadWifiConf,
            DeviceState::NoWifiConn => DeviceReply::NoWifiConn,
            DeviceState::CamInitFail => DeviceReply::CamInitFail,
            DeviceState::NoInternet => DeviceReply::NoInternet,
            _ => DeviceReply::NoSdCard,
        }
    }
}

impl fmt::Display for InitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.cause)
    }
}

/// Bring up every collaborator.
///
/// A camera that fails to initialise is torn down again before returning.
pub fn run_init<S, N, K>(
    store: &mut S,
    network: &mut N,
    camera: &mut K,
    verify_backend: bool,
) -> Result<(), InitFailure>
where
    S: ConfigStore,
    N: NetworkClient,
    K: CaptureSource,
{
    store
        .initialize()
        .map_err(|e| InitFailure::new(InitStage::Storage, e))?;
    info!("init: storage ready");

    let net_cfg = store
        .read_network_config()
        .map_err(|e| InitFailure::new(InitStage::NetworkConfig, e))?;
    info!("init: network config loaded (ssid '{}')", net_cfg.ssid);

    network
        .connect(&net_cfg)
        .map_err(|e| InitFailure::new(InitStage::Network, e))?;
    info!("init: network up");

    if let Err(e) = camera.initialize() {
        camera.deinitialize();
        return Err(InitFailure::new(InitStage::Camera, e));
    }
    info!("init: camera ready");

    if verify_backend {
        network
            .ping()
            .map_err(|e| InitFailure::new(InitStage::Backend, e))?;
        info!("init: backend reachable");
    }

    Ok(())
}

/// Log helper used by the service when a run fails.
pub(crate) fn log_failure(failure: &InitFailure) {
    warn!("init: {failure} -> {}", failure.reply());
}
