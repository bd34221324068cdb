//! WiFi station + backend HTTP adapter.
//!
//! Implements [`NetworkClient`]: joins the network from the SD card record
//! and talks to the lookup service.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi` for the station
//!   and `esp_idf_svc::http::client::EspHttpConnection` for requests.
//! - **all other targets**: a scripted simulation for host-side tests.
//!
//! ## Join policy
//!
//! After the station is configured and started, the link is polled up to
//! `wifi_connect_attempts` times with `wifi_retry_delay_ms` between polls.
//! There is no background reconnect.
//!
//! ## Backend API
//!
//! | Request               | Success                                  |
//! |-----------------------|------------------------------------------|
//! | `GET <base>/`         | any 2xx                                  |
//! | `GET <base>/search/L` | 2xx, JSON `{"calories": <number>, ...}`  |
//!
//! The reported value is `calories / 100`.

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use log::{info, warn};
use serde::Deserialize;

use crate::app::ports::NetworkClient;
use crate::config::{Addressing, NetworkConfig, SystemConfig};
use crate::error::NetworkError;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

/// Divisor applied to the `calories` field.
const CALORIES_SCALE: f32 = 100.0;

#[derive(Debug, Deserialize)]
struct LookupResponse {
    calories: f32,
}

/// Extract the enrichment value from a lookup body.
pub fn parse_lookup_body(body: &[u8]) -> Result<f32, NetworkError> {
    let resp: LookupResponse =
        serde_json::from_slice(body).map_err(|_| NetworkError::MalformedResponse)?;
    if !resp.calories.is_finite() {
        return Err(NetworkError::MalformedResponse);
    }
    Ok(resp.calories / CALORIES_SCALE)
}

/// `<base>/search/<label>`, with the label percent-encoded as one path segment.
fn lookup_url(base: &str, label: &str) -> String {
    let mut url = String::with_capacity(base.len() + 8 + label.len());
    url.push_str(base);
    url.push_str("/search/");
    for b in label.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            url.push(b as char);
        } else {
            let _ = write!(url, "%{b:02X}");
        }
    }
    url
}

fn check_status(status: u16) -> Result<(), NetworkError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(NetworkError::HttpStatus(status))
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi client
// ───────────────────────────────────────────────────────────────

pub struct WifiClient<D: DelayNs> {
    api_base_url: String,
    join_attempts: u8,
    retry_delay_ms: u32,
    delay: D,
    connected: bool,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimBackend,
}

impl<D: DelayNs> WifiClient<D> {
    #[cfg(target_os = "espidf")]
    pub fn new(config: &SystemConfig, delay: D, wifi: esp_idf_svc::wifi::EspWifi<'static>) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            join_attempts: config.wifi_connect_attempts,
            retry_delay_ms: config.wifi_retry_delay_ms,
            delay,
            connected: false,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(config: &SystemConfig, delay: D) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            join_attempts: config.wifi_connect_attempts,
            retry_delay_ms: config.wifi_retry_delay_ms,
            delay,
            connected: false,
            sim: SimBackend::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn get(&mut self, url: &str) -> Result<Vec<u8>, NetworkError> {
        if !self.connected {
            return Err(NetworkError::NotConnected);
        }
        let (status, body) = self.platform_get(url)?;
        info!("HTTP GET {url} -> {status}");
        check_status(status)?;
        Ok(body)
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_configure(
        &mut self,
        config: &NetworkConfig,
        addressing: Addressing,
    ) -> Result<(), NetworkError> {
        use esp_idf_svc::ipv4;
        use esp_idf_svc::netif::{EspNetif, NetifConfiguration};
        use esp_idf_svc::wifi::{ClientConfiguration, Configuration};

        let rejected = |e| {
            warn!("WiFi: driver rejected configuration: {e:?}");
            NetworkError::DriverRejected
        };

        if self.wifi.is_started().unwrap_or(false) {
            self.wifi.stop().map_err(rejected)?;
        }

        if let Addressing::Static {
            ip,
            gateway,
            prefix_len,
        } = addressing
        {
            let netif = EspNetif::new_with_conf(&NetifConfiguration {
                ip_configuration: Some(ipv4::Configuration::Client(
                    ipv4::ClientConfiguration::Fixed(ipv4::ClientSettings {
                        ip,
                        subnet: ipv4::Subnet {
                            gateway,
                            mask: ipv4::Mask(prefix_len),
                        },
                        dns: None,
                        secondary_dns: None,
                    }),
                )),
                ..NetifConfiguration::wifi_default_client()
            })
            .map_err(rejected)?;
            self.wifi.swap_netif_sta(netif).map_err(rejected)?;
        }

        let client = ClientConfiguration {
            ssid: config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| NetworkError::DriverRejected)?,
            password: config
                .password
                .as_str()
                .try_into()
                .map_err(|_| NetworkError::DriverRejected)?,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(rejected)?;
        self.wifi.start().map_err(rejected)?;
        self.wifi.connect().map_err(rejected)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_configure(
        &mut self,
        config: &NetworkConfig,
        addressing: Addressing,
    ) -> Result<(), NetworkError> {
        if self.sim.reject_config {
            return Err(NetworkError::DriverRejected);
        }
        info!("WiFi(sim): joining '{}' ({addressing:?})", config.ssid);
        self.sim.addressing = Some(addressing);
        self.sim.polls = 0;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_link_up(&mut self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_link_up(&mut self) -> bool {
        self.sim.polls = self.sim.polls.saturating_add(1);
        self.sim
            .link_up_after
            .is_some_and(|needed| self.sim.polls >= needed)
    }

    #[cfg(target_os = "espidf")]
    fn platform_get(&mut self, url: &str) -> Result<(u16, Vec<u8>), NetworkError> {
        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
        use esp_idf_svc::io::Read;

        let failed = |e| {
            warn!("HTTP: request to {url} failed: {e:?}");
            NetworkError::RequestFailed
        };

        let mut conn = EspHttpConnection::new(&HttpConfiguration::default()).map_err(failed)?;
        conn.initiate_request(Method::Get, url, &[]).map_err(failed)?;
        conn.initiate_response().map_err(failed)?;
        let status = conn.status();

        let mut body = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = conn.read(&mut chunk).map_err(|e| {
                warn!("HTTP: reading {url} failed: {e:?}");
                NetworkError::RequestFailed
            })?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        Ok((status, body))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_get(&mut self, url: &str) -> Result<(u16, Vec<u8>), NetworkError> {
        self.sim.requests.push(url.to_owned());
        let path = url.strip_prefix(self.api_base_url.as_str()).unwrap_or(url);
        match self.sim.routes.get(path) {
            Some(SimResponse::Reply(status, body)) => Ok((*status, body.clone().into_bytes())),
            Some(SimResponse::Unreachable) => Err(NetworkError::RequestFailed),
            None => Ok((404, Vec::new())),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// NetworkClient
// ───────────────────────────────────────────────────────────────

impl<D: DelayNs> NetworkClient for WifiClient<D> {
    fn connect(&mut self, config: &NetworkConfig) -> Result<(), NetworkError> {
        if !config.has_credentials() {
            warn!("WiFi: SSID or password missing");
            return Err(NetworkError::MissingCredentials);
        }
        let addressing = config.addressing()?;

        self.connected = false;
        info!("WiFi: connecting to '{}'", config.ssid);
        self.platform_configure(config, addressing)?;

        for poll in 1..=self.join_attempts {
            if self.platform_link_up() {
                self.connected = true;
                info!("WiFi: connected after {poll} poll(s)");
                return Ok(());
            }
            self.delay.delay_ms(self.retry_delay_ms);
        }

        warn!("WiFi: no link after {} polls", self.join_attempts);
        Err(NetworkError::JoinTimeout)
    }

    fn lookup(&mut self, label: &str) -> Result<f32, NetworkError> {
        let url = lookup_url(&self.api_base_url, label);
        let body = self.get(&url)?;
        parse_lookup_body(&body)
    }

    fn ping(&mut self) -> Result<(), NetworkError> {
        let url = format!("{}/", self.api_base_url);
        self.get(&url).map(|_| ())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
enum SimResponse {
    Reply(u16, String),
    Unreachable,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimBackend {
    /// Polls needed before the link reports up; `None` never comes up.
    link_up_after: Option<u8>,
    polls: u8,
    reject_config: bool,
    addressing: Option<Addressing>,
    /// Keyed by path below the base URL.
    routes: HashMap<String, SimResponse>,
    requests: Vec<String>,
}

#[cfg(not(target_os = "espidf"))]
impl<D: DelayNs> WifiClient<D> {
    /// Link comes up on the `polls`-th status check; `None` never.
    pub fn sim_link_up_after(&mut self, polls: Option<u8>) {
        self.sim.link_up_after = polls;
    }

    pub fn sim_reject_config(&mut self, reject: bool) {
        self.sim.reject_config = reject;
    }

    /// Answer `GET <base><path>` with `status` and `body`.
    pub fn sim_respond(&mut self, path: &str, status: u16, body: &str) {
        self.sim
            .routes
            .insert(path.to_owned(), SimResponse::Reply(status, body.to_owned()));
    }

    /// Make `GET <base><path>` fail at the transport level.
    pub fn sim_unreachable(&mut self, path: &str) {
        self.sim.routes.insert(path.to_owned(), SimResponse::Unreachable);
    }

    pub fn sim_requests(&self) -> &[String] {
        &self.sim.requests
    }

    pub fn sim_addressing(&self) -> Option<Addressing> {
        self.sim.addressing
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
