//! SD card config store.
//!
//! Implements [`ConfigStore`] on top of the card's FAT filesystem.  On the
//! device the card is mounted through the ESP-IDF VFS (see `main.rs`), so
//! both targets use plain `std::fs` paths below the mount point.
//!
//! `config.txt` holds the Wi-Fi record:
//!
//! ```text
//! SSID=<network>
//! Password=<passphrase>
//! IP=<optional static address>
//! Gateway=<optional gateway>
//! MASK=<optional netmask>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::ConfigStore;
use crate::config::{DEFAULT_NETWORK_CONFIG, NetworkConfig, SystemConfig};
use crate::error::{ConfigError, StorageError};

pub struct SdCardStore {
    root: PathBuf,
    config_path: PathBuf,
}

impl SdCardStore {
    pub fn new(mount_point: impl Into<PathBuf>, file_name: &str) -> Self {
        let root = mount_point.into();
        let config_path = root.join(file_name);
        Self { root, config_path }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(&config.sd_mount_point, &config.config_file_name)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

impl ConfigStore for SdCardStore {
    fn initialize(&mut self) -> Result<(), StorageError> {
        if !self.root.is_dir() {
            warn!("SD: no card at {}", self.root.display());
            return Err(StorageError::NoMedium);
        }

        if !self.config_path.exists() {
            info!("SD: creating {}", self.config_path.display());
            fs::write(&self.config_path, DEFAULT_NETWORK_CONFIG).map_err(|e| {
                warn!("SD: cannot create config file: {e}");
                StorageError::ConfigFileUnwritable
            })?;
        }
        Ok(())
    }

    fn read_network_config(&mut self) -> Result<NetworkConfig, ConfigError> {
        let text = fs::read_to_string(&self.config_path).map_err(|e| {
            warn!("SD: cannot read {}: {e}", self.config_path.display());
            ConfigError::Empty
        })?;
        NetworkConfig::parse(&text)
    }
}
