//! CAPTURE retry loop driven through the AppService.

use aquabotica::app::capture::{CaptureOutcome, MAX_CAPTURE_ATTEMPTS};
use aquabotica::app::commands::HostCommand;
use aquabotica::app::replies::DeviceReply;
use aquabotica::error::{ClassifierError, NetworkError};
use aquabotica::fsm::DeviceState;

use crate::mock_hw::{MockApp, RecordingSink, make_app};

/// A service that has completed the handshake and INIT.
fn ready_app() -> (MockApp, RecordingSink) {
    let mut app = make_app();
    let mut sink = RecordingSink::default();
    app.handle_command(HostCommand::Hello, "", &mut sink);
    app.handle_command(HostCommand::Init, "", &mut sink);
    assert_eq!(app.state(), DeviceState::Ready);
    sink.clear();
    (app, sink)
}

fn capture(app: &mut MockApp, sink: &mut RecordingSink) {
    app.handle_command(HostCommand::Capture, "", sink);
}

#[test]
fn every_capture_failing_exhausts_budget() {
    let (mut app, mut sink) = ready_app();
    app.peripherals_mut()
        .camera
        .fail_next_captures(usize::from(MAX_CAPTURE_ATTEMPTS));

    capture(&mut app, &mut sink);

    assert_eq!(
        sink.lines(),
        vec![
            "CAPTURE_FAIL",
            "CAPTURE_FAIL",
            "CAPTURE_FAIL",
            "CAPTURE_FAIL",
            "CAPTURE_FAIL",
            "FISH_NOT_RECOG"
        ]
    );
    let hw = app.peripherals();
    assert_eq!(hw.classifier.calls, 0);
    assert!(hw.network.lookups.is_empty());
    assert_eq!(hw.frames.allocations, 5);
    assert_eq!(hw.frames.releases, 5);

    let report = app.last_capture().unwrap();
    assert_eq!(report.outcome, CaptureOutcome::NotRecognised);
    assert_eq!(report.attempts, MAX_CAPTURE_ATTEMPTS);
}

#[test]
fn empty_passes_end_in_not_recognised_only() {
    let (mut app, mut sink) = ready_app();

    capture(&mut app, &mut sink);

    assert_eq!(sink.lines(), vec!["FISH_NOT_RECOG"]);
    assert_eq!(app.peripherals().classifier.calls, 5);
}

#[test]
fn detection_on_third_attempt_reports_once() {
    let (mut app, mut sink) = ready_app();
    {
        let hw = app.peripherals_mut();
        hw.classifier.push_empty(2);
        hw.classifier.push(Ok(vec![("goldfish", 0.93)]));
        hw.network.lookup_script.push_back(Ok(1.25));
    }

    capture(&mut app, &mut sink);

    assert_eq!(sink.lines(), vec!["FISH_INFO goldfish 1.25"]);
    let hw = app.peripherals();
    assert_eq!(hw.network.lookups, vec!["goldfish"]);
    assert_eq!(hw.camera.captures, 3);
    assert_eq!(hw.frames.allocations, 3);
    assert_eq!(hw.frames.releases, 3);
    assert_eq!(hw.frames.max_outstanding, 1);
    assert_eq!(hw.frames.outstanding(), 0);

    let report = app.last_capture().unwrap();
    assert_eq!(report.attempts, 3);
    assert!(report.outcome.detected());
}

#[test]
fn zero_valued_detections_are_skipped() {
    let (mut app, mut sink) = ready_app();
    app.peripherals_mut()
        .classifier
        .push(Ok(vec![("background", 0.0), ("angelfish", 0.7)]));

    capture(&mut app, &mut sink);

    assert_eq!(sink.lines(), vec!["FISH_INFO angelfish 1.00"]);
    assert_eq!(app.peripherals().network.lookups, vec!["angelfish"]);
}

#[test]
fn inference_errors_are_reported_and_retried() {
    let (mut app, mut sink) = ready_app();
    {
        let hw = app.peripherals_mut();
        hw.classifier.push(Err(ClassifierError::Inference(-3)));
        hw.classifier.push(Ok(vec![("guppy", 0.8)]));
    }

    capture(&mut app, &mut sink);

    assert_eq!(sink.lines(), vec!["AI_FAIL", "FISH_INFO guppy 1.00"]);
    assert_eq!(app.last_capture().unwrap().attempts, 2);
}

#[test]
fn mixed_failures_share_one_budget() {
    let (mut app, mut sink) = ready_app();
    {
        let hw = app.peripherals_mut();
        hw.camera.fail_next_captures(2);
        hw.classifier.push(Err(ClassifierError::Inference(1)));
        hw.classifier.push_empty(2);
    }

    capture(&mut app, &mut sink);

    assert_eq!(
        sink.lines(),
        vec!["CAPTURE_FAIL", "CAPTURE_FAIL", "AI_FAIL", "FISH_NOT_RECOG"]
    );
    assert_eq!(app.peripherals().camera.captures, 5);
}

#[test]
fn failed_lookup_reports_capture_fail_and_stops() {
    let (mut app, mut sink) = ready_app();
    {
        let hw = app.peripherals_mut();
        hw.classifier.push(Ok(vec![("tetra", 0.9)]));
        hw.network
            .lookup_script
            .push_back(Err(NetworkError::HttpStatus(404)));
    }

    capture(&mut app, &mut sink);

    assert_eq!(sink.lines(), vec!["CAPTURE_FAIL"]);
    let hw = app.peripherals();
    assert_eq!(hw.network.lookups.len(), 1);
    assert_eq!(hw.camera.captures, 1);
    assert!(matches!(
        app.last_capture().unwrap().outcome,
        CaptureOutcome::EnrichmentFailed { .. }
    ));
}

#[test]
fn no_frame_memory_sends_single_capture_fail() {
    let (mut app, mut sink) = ready_app();
    app.peripherals_mut().frames.exhausted = true;

    capture(&mut app, &mut sink);

    assert_eq!(sink.replies, vec![DeviceReply::CaptureFail]);
    let hw = app.peripherals();
    assert_eq!(hw.camera.captures, 0);
    assert_eq!(hw.classifier.calls, 0);
    assert_eq!(app.last_capture().unwrap().outcome, CaptureOutcome::OutOfMemory);
}

#[test]
fn capture_before_ready_is_refused() {
    let mut app = make_app();
    let mut sink = RecordingSink::default();

    capture(&mut app, &mut sink);
    app.handle_command(HostCommand::Hello, "", &mut sink);
    capture(&mut app, &mut sink);

    assert_eq!(sink.lines(), vec!["CAPTURE_FAIL", "READY", "CAPTURE_FAIL"]);
    assert!(!app.peripherals().camera.touched());
    assert!(app.last_capture().is_none());
    assert_eq!(app.state(), DeviceState::Synced);
}

#[test]
fn capture_can_repeat() {
    let (mut app, mut sink) = ready_app();
    {
        let hw = app.peripherals_mut();
        hw.classifier.push(Ok(vec![("koi", 0.5)]));
        hw.classifier.push(Ok(vec![("koi", 0.5)]));
        hw.network.lookup_script.push_back(Ok(0.5));
        hw.network.lookup_script.push_back(Ok(2.0));
    }

    capture(&mut app, &mut sink);
    capture(&mut app, &mut sink);

    assert_eq!(sink.lines(), vec!["FISH_INFO koi 0.50", "FISH_INFO koi 2.00"]);
    assert_eq!(app.state(), DeviceState::Ready);
}
