//! Aquabotica Firmware - Main Entry Point
//!
//! Hexagonal architecture driven by a single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SdCardStore   WifiClient     CameraAdapter  EdgeImpulse       │
//! │  (ConfigStore) (NetworkClient)(CaptureSource)(Classifier)      │
//! │  HeapFrameAllocator  UartTransport  UptimeClock                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · init sequence · capture loop                    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  CommandRouter (UART line protocol)                            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::fs::fatfs::Fatfs;
use esp_idf_svc::io::vfs::MountedFatfs;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sd::mmc::{SdMmcHostConfiguration, SdMmcHostDriver};
use esp_idf_svc::sd::{SdCardConfiguration, SdCardDriver};
use esp_idf_svc::wifi::EspWifi;

use aquabotica::adapters::camera::CameraAdapter;
use aquabotica::adapters::classifier::EdgeImpulseClassifier;
use aquabotica::adapters::frame_pool::HeapFrameAllocator;
use aquabotica::adapters::sd_card::SdCardStore;
use aquabotica::adapters::serial::UartTransport;
use aquabotica::adapters::time::UptimeClock;
use aquabotica::adapters::wifi::WifiClient;
use aquabotica::app::ports::Clock;
use aquabotica::app::service::{AppService, Peripherals as AppPeripherals};
use aquabotica::config::SystemConfig;
use aquabotica::serial::{CommandRouter, SerialLink};

/// Optional JSON overrides for [`SystemConfig`], at the card root.
const SYSTEM_CONFIG_FILE: &str = "system.json";

/// Idle time between loop passes.
const LOOP_DELAY_MS: u32 = 10;

type App = AppService<
    SdCardStore,
    WifiClient<FreeRtos>,
    CameraAdapter,
    EdgeImpulseClassifier,
    HeapFrameAllocator,
>;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Aquabotica v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. SD card (1-bit SDMMC, as wired on the WROVER kit) ──
    let defaults = SystemConfig::default();
    let sd_mount = SdMmcHostDriver::new_1bit(
        peripherals.sdmmc1,
        pins.gpio15,
        pins.gpio14,
        pins.gpio2,
        None::<AnyIOPin>,
        None::<AnyIOPin>,
        &SdMmcHostConfiguration::new(),
    )
    .and_then(|host| SdCardDriver::new_mmc(host, &SdCardConfiguration::new()))
    .and_then(|card| Fatfs::new_sdcard(0, card))
    .and_then(|fatfs| MountedFatfs::mount(fatfs, defaults.sd_mount_point.as_str(), 4));
    let _sd_mount = match sd_mount {
        Ok(m) => {
            info!("SD card mounted at {}", defaults.sd_mount_point);
            Some(m)
        }
        Err(e) => {
            // INIT reports NO_SDC; nothing else depends on the card.
            warn!("SD card mount failed: {e}");
            None
        }
    };

    // ── 3. Configuration ──────────────────────────────────────
    let overrides = Path::new(&defaults.sd_mount_point).join(SYSTEM_CONFIG_FILE);
    let config = match fs::read(&overrides) {
        Ok(bytes) => SystemConfig::from_json(&bytes).unwrap_or_else(|e| {
            warn!("{} ignored: {e}", overrides.display());
            defaults.clone()
        }),
        Err(_) => defaults,
    };
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {e}"))?;
    info!("Config: {config:?}");

    // ── 4. Host link on UART0 ─────────────────────────────────
    let uart = UartDriver::new(
        peripherals.uart0,
        pins.gpio1,
        pins.gpio3,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(config.uart_baud)),
    )?;
    let mut link = SerialLink::new(UartTransport::new(uart));

    // ── 5. Adapters ───────────────────────────────────────────
    let wifi = EspWifi::new(peripherals.modem, sysloop, Some(nvs))?;
    let hw = AppPeripherals {
        store: SdCardStore::from_config(&config),
        network: WifiClient::new(&config, FreeRtos, wifi),
        camera: CameraAdapter::new(),
        classifier: EdgeImpulseClassifier::new(),
        frames: HeapFrameAllocator::new(),
    };
    let clock = UptimeClock::new();

    // ── 6. Application core + routes ──────────────────────────
    let mut app = App::new(config, hw);
    let mut router = CommandRouter::<App>::new();
    if !App::register_routes(&mut router) {
        warn!("Not every command route could be registered");
    }

    app.start(clock.uptime_ms(), &mut link);
    info!("System ready. Entering command loop.");

    // ── 7. Command loop ───────────────────────────────────────
    loop {
        router.handle_incoming(&mut link, &mut app);
        app.tick(clock.uptime_ms(), &mut link);
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
