//! System configuration parameters
//!
//! [`SystemConfig`] holds every tunable of the device.  [`NetworkConfig`]
//! is the Wi-Fi record read from `config.txt` on the SD card, together
//! with the addressing rules applied when the station joins.

use core::fmt;
use core::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, NetworkError};

/// Template written to the SD card when no config file exists yet.
pub const DEFAULT_NETWORK_CONFIG: &str = "SSID=\nPassword=\nIP=\nGateway=\nMASK=\n";

const SUPPORTED_BAUD_RATES: [u32; 8] = [
    9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 921_600,
];

/// Core system configuration
///
/// Missing fields take their defaults when deserialising, so an override
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Serial link ---
    /// UART baud rate of the host link
    pub uart_baud: u32,
    /// Interval between unsolicited HELLO broadcasts while in Boot (ms)
    pub hello_interval_ms: u32,

    // --- Backend ---
    /// Base URL of the lookup service, without trailing slash
    pub api_base_url: String,
    /// Ping the backend during INIT and report NO_INTERNET on failure
    pub verify_backend_on_init: bool,

    // --- Wi-Fi ---
    /// Number of link-status polls before giving up on a join
    pub wifi_connect_attempts: u8,
    /// Delay between link-status polls (ms)
    pub wifi_retry_delay_ms: u32,

    // --- Storage ---
    /// VFS mount point of the SD card
    pub sd_mount_point: String,
    /// Name of the Wi-Fi config file at the card root
    pub config_file_name: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            uart_baud: 115_200,
            hello_interval_ms: 1000,

            api_base_url: String::from("http://192.168.209.117:8000"),
            verify_backend_on_init: false,

            wifi_connect_attempts: 20,
            wifi_retry_delay_ms: 500, // 20 × 500 ms = 10 s join budget

            sd_mount_point: String::from("/sdcard"),
            config_file_name: String::from("config.txt"),
        }
    }
}

impl SystemConfig {
    /// Parse a JSON override document and validate the result.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_slice(bytes).map_err(|_| ConfigError::Invalid("malformed JSON"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_BAUD_RATES.contains(&self.uart_baud) {
            return Err(ConfigError::Invalid("uart_baud must be a standard rate"));
        }
        if !(100..=60_000).contains(&self.hello_interval_ms) {
            return Err(ConfigError::Invalid("hello_interval_ms must be 100–60000"));
        }
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid("api_base_url must be an http(s) URL"));
        }
        if self.api_base_url.ends_with('/') {
            return Err(ConfigError::Invalid("api_base_url must not end with '/'"));
        }
        if self.wifi_connect_attempts == 0 || self.wifi_connect_attempts > 100 {
            return Err(ConfigError::Invalid("wifi_connect_attempts must be 1–100"));
        }
        if !(10..=10_000).contains(&self.wifi_retry_delay_ms) {
            return Err(ConfigError::Invalid("wifi_retry_delay_ms must be 10–10000"));
        }
        if !self.sd_mount_point.starts_with('/') {
            return Err(ConfigError::Invalid("sd_mount_point must be absolute"));
        }
        if self.config_file_name.is_empty() || self.config_file_name.contains('/') {
            return Err(ConfigError::Invalid("config_file_name must be a bare file name"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wi-Fi record
// ---------------------------------------------------------------------------

/// Network identity, credentials and optional static addressing.
///
/// Credentials are length-capped at the Wi-Fi driver limits.  The static
/// addressing fields are kept verbatim and uncapped; interpretation is
/// deferred to [`NetworkConfig::addressing`], so any malformed address,
/// however long, fails the join rather than the file read.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
    pub ip: String,
    pub gateway: String,
    pub mask: String,
}

/// How the station obtains its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    Dhcp,
    Static {
        ip: Ipv4Addr,
        gateway: Ipv4Addr,
        prefix_len: u8,
    },
}

impl NetworkConfig {
    /// Parse the `Key=Value` file format.
    ///
    /// Keys are matched case-sensitively on trimmed lines; unknown lines are
    /// skipped and a repeated key overwrites the earlier value.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        if text.is_empty() {
            return Err(ConfigError::Empty);
        }

        let mut cfg = Self::default();
        for line in text.lines().map(str::trim) {
            if let Some(v) = line.strip_prefix("SSID=") {
                assign(&mut cfg.ssid, v, "SSID")?;
            } else if let Some(v) = line.strip_prefix("Password=") {
                assign(&mut cfg.password, v, "Password")?;
            } else if let Some(v) = line.strip_prefix("IP=") {
                v.clone_into(&mut cfg.ip);
            } else if let Some(v) = line.strip_prefix("Gateway=") {
                v.clone_into(&mut cfg.gateway);
            } else if let Some(v) = line.strip_prefix("MASK=") {
                v.clone_into(&mut cfg.mask);
            }
        }
        Ok(cfg)
    }

    /// Both SSID and password are present.
    pub fn has_credentials(&self) -> bool {
        !self.ssid.is_empty() && !self.password.is_empty()
    }

    /// Resolve the addressing mode.
    ///
    /// Static addressing applies only when IP, gateway and mask are all
    /// non-empty.  In that case every one of them must parse, and the mask
    /// must be contiguous; there is no fallback to DHCP.
    pub fn addressing(&self) -> Result<Addressing, NetworkError> {
        if self.ip.is_empty() || self.gateway.is_empty() || self.mask.is_empty() {
            return Ok(Addressing::Dhcp);
        }

        let ip: Ipv4Addr = self.ip.parse().map_err(|_| NetworkError::InvalidAddress)?;
        let gateway: Ipv4Addr = self
            .gateway
            .parse()
            .map_err(|_| NetworkError::InvalidAddress)?;
        let mask: Ipv4Addr = self.mask.parse().map_err(|_| NetworkError::InvalidAddress)?;

        let bits = u32::from(mask);
        let prefix_len = bits.leading_ones();
        if bits.checked_shl(prefix_len).unwrap_or(0) != 0 {
            return Err(NetworkError::InvalidAddress);
        }

        Ok(Addressing::Static {
            ip,
            gateway,
            prefix_len: prefix_len as u8,
        })
    }
}

fn assign<const N: usize>(
    field: &mut heapless::String<N>,
    value: &str,
    key: &'static str,
) -> Result<(), ConfigError> {
    field.clear();
    field
        .push_str(value)
        .map_err(|()| ConfigError::FieldTooLong(key))
}

// The password never reaches the log.
impl fmt::Debug for NetworkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkConfig")
            .field("ssid", &self.ssid)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("ip", &self.ip)
            .field("gateway", &self.gateway)
            .field("mask", &self.mask)
            .finish()
    }
}
