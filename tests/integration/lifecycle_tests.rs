//! Handshake, init sequence and status reporting through the AppService.

use aquabotica::app::commands::HostCommand;
use aquabotica::app::init::InitStage;
use aquabotica::app::replies::DeviceReply;
use aquabotica::app::service::AppService;
use aquabotica::config::{NetworkConfig, SystemConfig};
use aquabotica::error::{CaptureError, ConfigError, Error, NetworkError, StorageError};
use aquabotica::fsm::DeviceState;

use crate::mock_hw::{MockApp, RecordingSink, make_app, mock_peripherals};

fn send(app: &mut MockApp, cmd: HostCommand, sink: &mut RecordingSink) {
    app.handle_command(cmd, "", sink);
}

fn synced() -> (MockApp, RecordingSink) {
    let mut app = make_app();
    let mut sink = RecordingSink::default();
    send(&mut app, HostCommand::Hello, &mut sink);
    sink.clear();
    (app, sink)
}

// ── Boot broadcast ────────────────────────────────────────────

#[test]
fn start_announces_hello() {
    let mut app = make_app();
    let mut sink = RecordingSink::default();
    app.start(0, &mut sink);
    assert_eq!(sink.lines(), vec!["HELLO"]);
    assert_eq!(app.state(), DeviceState::Boot);
}

#[test]
fn hello_rebroadcast_every_interval_while_booting() {
    let mut app = make_app();
    let mut sink = RecordingSink::default();
    app.start(0, &mut sink);
    app.tick(999, &mut sink);
    assert_eq!(sink.replies.len(), 1);
    app.tick(1_000, &mut sink);
    app.tick(1_500, &mut sink);
    app.tick(2_000, &mut sink);
    assert_eq!(sink.count(&DeviceReply::Hello), 3);
}

#[test]
fn broadcast_stops_once_synced() {
    let mut app = make_app();
    let mut sink = RecordingSink::default();
    app.start(0, &mut sink);
    send(&mut app, HostCommand::Hello, &mut sink);
    sink.clear();
    app.tick(10_000, &mut sink);
    assert!(sink.replies.is_empty());
}

// ── Handshake ─────────────────────────────────────────────────

#[test]
fn hello_from_boot_replies_ready_and_syncs() {
    let mut app = make_app();
    let mut sink = RecordingSink::default();
    send(&mut app, HostCommand::Hello, &mut sink);
    assert_eq!(sink.lines(), vec!["READY"]);
    assert_eq!(app.state(), DeviceState::Synced);
}

#[test]
fn ready_from_boot_replies_ready_and_syncs() {
    let mut app = make_app();
    let mut sink = RecordingSink::default();
    send(&mut app, HostCommand::Ready, &mut sink);
    assert_eq!(sink.lines(), vec!["READY"]);
    assert_eq!(app.state(), DeviceState::Synced);
}

#[test]
fn ready_after_boot_is_ignored() {
    let (mut app, mut sink) = synced();
    send(&mut app, HostCommand::Ready, &mut sink);
    assert!(sink.replies.is_empty());
    assert_eq!(app.state(), DeviceState::Synced);
}

#[test]
fn hello_always_answers_without_leaving_ready() {
    let (mut app, mut sink) = synced();
    send(&mut app, HostCommand::Init, &mut sink);
    sink.clear();
    send(&mut app, HostCommand::Hello, &mut sink);
    assert_eq!(sink.lines(), vec!["READY"]);
    assert_eq!(app.state(), DeviceState::Ready);
}

// ── Init sequence ─────────────────────────────────────────────

#[test]
fn full_init_emits_exactly_init_success() {
    let (mut app, mut sink) = synced();
    send(&mut app, HostCommand::Init, &mut sink);

    assert_eq!(sink.lines(), vec!["INIT_SUCCESS"]);
    assert_eq!(app.state(), DeviceState::Ready);

    let hw = app.peripherals();
    assert_eq!(hw.store.init_calls, 1);
    assert_eq!(hw.store.read_calls, 1);
    assert_eq!(hw.network.connects.len(), 1);
    assert_eq!(hw.network.connects[0].ssid.as_str(), "tank");
    assert_eq!(hw.camera.init_calls, 1);
    assert_eq!(hw.camera.deinit_calls, 0);
    assert_eq!(hw.network.pings, 0, "backend check is off by default");
    assert!(app.last_init_failure().is_none());
}

#[test]
fn storage_failure_reports_no_sdc_and_touches_nothing_else() {
    let (mut app, mut sink) = synced();
    app.peripherals_mut().store.init_result = Err(StorageError::NoMedium);

    send(&mut app, HostCommand::Init, &mut sink);

    assert_eq!(sink.lines(), vec!["NO_SDC"]);
    assert_eq!(app.state(), DeviceState::NoSdCard);
    let hw = app.peripherals();
    assert_eq!(hw.store.read_calls, 0);
    assert!(!hw.network.touched());
    assert!(!hw.camera.touched());
}

#[test]
fn unwritable_config_file_is_reported() {
    let (mut app, mut sink) = synced();
    app.peripherals_mut().store.init_result = Err(StorageError::ConfigFileUnwritable);

    send(&mut app, HostCommand::Init, &mut sink);

    assert_eq!(sink.lines(), vec!["CONFIG_FILE_NOT_CREATED"]);
    assert_eq!(app.state(), DeviceState::ConfigFileMissing);
}

#[test]
fn unreadable_config_is_bad_wifi_conf() {
    let (mut app, mut sink) = synced();
    app.peripherals_mut().store.config_result = Err(ConfigError::Empty);

    send(&mut app, HostCommand::Init, &mut sink);

    assert_eq!(sink.lines(), vec!["BAD_WIFI_CONF"]);
    assert_eq!(app.state(), DeviceState::BadWifiConfig);
    assert!(!app.peripherals().network.touched());
}

#[test]
fn join_failure_is_no_wifi_conn() {
    let (mut app, mut sink) = synced();
    app.peripherals_mut().network.connect_result = Err(NetworkError::JoinTimeout);

    send(&mut app, HostCommand::Init, &mut sink);

    assert_eq!(sink.lines(), vec!["NO_WIFI_CONN"]);
    assert_eq!(app.state(), DeviceState::NoWifiConn);
    assert!(!app.peripherals().camera.touched());
    let failure = app.last_init_failure().unwrap();
    assert_eq!(failure.stage, InitStage::Network);
    assert_eq!(failure.cause, Error::Network(NetworkError::JoinTimeout));
}

#[test]
fn camera_failure_tears_camera_down() {
    let (mut app, mut sink) = synced();
    app.peripherals_mut().camera.init_result = Some(CaptureError::InitFailed(0x105));

    send(&mut app, HostCommand::Init, &mut sink);

    assert_eq!(sink.lines(), vec!["CAM_INIT_FAIL"]);
    assert_eq!(app.state(), DeviceState::CamInitFail);
    assert_eq!(app.peripherals().camera.deinit_calls, 1);
}

#[test]
fn backend_check_reports_no_internet_when_enabled() {
    let config = SystemConfig {
        verify_backend_on_init: true,
        ..SystemConfig::default()
    };
    let mut app = AppService::new(config, mock_peripherals());
    let mut sink = RecordingSink::default();
    send(&mut app, HostCommand::Hello, &mut sink);
    app.peripherals_mut().network.ping_result = Err(NetworkError::HttpStatus(502));
    sink.clear();

    send(&mut app, HostCommand::Init, &mut sink);

    assert_eq!(sink.lines(), vec!["NO_INTERNET"]);
    assert_eq!(app.state(), DeviceState::NoInternet);
    assert_eq!(app.peripherals().network.pings, 1);
}

#[test]
fn init_outside_synced_is_a_no_op() {
    // Boot
    let mut app = make_app();
    let mut sink = RecordingSink::default();
    send(&mut app, HostCommand::Init, &mut sink);
    assert!(sink.replies.is_empty());
    assert_eq!(app.state(), DeviceState::Boot);
    assert!(!app.peripherals().camera.touched());

    // Ready
    let (mut app, mut sink) = synced();
    send(&mut app, HostCommand::Init, &mut sink);
    sink.clear();
    send(&mut app, HostCommand::Init, &mut sink);
    assert!(sink.replies.is_empty());
    assert_eq!(app.state(), DeviceState::Ready);
    assert_eq!(app.peripherals().store.init_calls, 1);

    // Failure state
    let (mut app, mut sink) = synced();
    app.peripherals_mut().store.init_result = Err(StorageError::NoMedium);
    send(&mut app, HostCommand::Init, &mut sink);
    sink.clear();
    send(&mut app, HostCommand::Init, &mut sink);
    assert!(sink.replies.is_empty());
    assert_eq!(app.state(), DeviceState::NoSdCard);
    assert_eq!(app.peripherals().store.init_calls, 1);
}

#[test]
fn hello_recovers_from_failure_state() {
    let (mut app, mut sink) = synced();
    app.peripherals_mut().store.init_result = Err(StorageError::NoMedium);
    send(&mut app, HostCommand::Init, &mut sink);
    assert_eq!(app.state(), DeviceState::NoSdCard);

    // Card inserted; host re-handshakes and retries.
    app.peripherals_mut().store.init_result = Ok(());
    sink.clear();
    send(&mut app, HostCommand::Hello, &mut sink);
    assert_eq!(app.state(), DeviceState::Synced);
    send(&mut app, HostCommand::Init, &mut sink);

    assert_eq!(sink.lines(), vec!["READY", "INIT_SUCCESS"]);
    assert_eq!(app.state(), DeviceState::Ready);
}

#[test]
fn missing_credentials_fail_the_join() {
    let (mut app, mut sink) = synced();
    app.peripherals_mut().store.config_result = NetworkConfig::parse("SSID=\nPassword=\n");
    app.peripherals_mut().network.connect_result = Err(NetworkError::MissingCredentials);

    send(&mut app, HostCommand::Init, &mut sink);

    assert_eq!(sink.lines(), vec!["NO_WIFI_CONN"]);
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_reports_current_code_in_every_state() {
    let mut app = make_app();
    let mut sink = RecordingSink::default();

    send(&mut app, HostCommand::Status, &mut sink);
    send(&mut app, HostCommand::Hello, &mut sink);
    send(&mut app, HostCommand::Status, &mut sink);
    send(&mut app, HostCommand::Init, &mut sink);
    send(&mut app, HostCommand::Status, &mut sink);

    assert_eq!(
        sink.lines(),
        vec!["STATUS 0", "READY", "STATUS 1", "INIT_SUCCESS", "STATUS 3"]
    );
}

#[test]
fn status_reports_failure_codes() {
    let (mut app, mut sink) = synced();
    app.peripherals_mut().camera.init_result = Some(CaptureError::InitFailed(1));
    send(&mut app, HostCommand::Init, &mut sink);
    sink.clear();

    send(&mut app, HostCommand::Status, &mut sink);
    assert_eq!(sink.lines(), vec!["STATUS 4"]);
}
