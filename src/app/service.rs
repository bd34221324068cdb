//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the state machine, the configuration and every
//! collaborator.  It exposes one entry point per host command plus a
//! periodic [`tick`](AppService::tick).  All I/O flows through port traits,
//! making the entire service testable with mock adapters.
//!
//! ```text
//!  ConfigStore ──▶ ┌────────────────────────┐
//! NetworkClient ◀─▶│      AppService         │ ──▶ ReplySink
//! CaptureSource ──▶│  FSM · init · capture   │
//!    Classifier ──▶└────────────────────────┘
//! ```

use log::{debug, info};

use crate::config::SystemConfig;
use crate::fsm::{DeviceState, StateMachine};
use crate::serial::CommandRouter;

use super::capture::{CaptureReport, run_capture};
use super::commands::HostCommand;
use super::init::{InitFailure, log_failure, run_init};
use super::ports::{CaptureSource, Classifier, ConfigStore, FrameAllocator, NetworkClient, ReplySink};
use super::replies::DeviceReply;

// ───────────────────────────────────────────────────────────────
// Peripherals
// ───────────────────────────────────────────────────────────────

/// Every collaborator the service drives.
pub struct Peripherals<S, N, K, C, M> {
    pub store: S,
    pub network: N,
    pub camera: K,
    pub classifier: C,
    pub frames: M,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<S, N, K, C, M> {
    fsm: StateMachine,
    config: SystemConfig,
    hw: Peripherals<S, N, K, C, M>,
    last_hello_ms: u64,
    last_init_failure: Option<InitFailure>,
    last_capture: Option<CaptureReport>,
}

impl<S, N, K, C, M> AppService<S, N, K, C, M>
where
    S: ConfigStore,
    N: NetworkClient,
    K: CaptureSource,
    C: Classifier,
    M: FrameAllocator,
{
    /// Construct the service in `Boot`.
    ///
    /// Does **not** announce itself: call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, hw: Peripherals<S, N, K, C, M>) -> Self {
        Self {
            fsm: StateMachine::new(),
            config,
            hw,
            last_hello_ms: 0,
            last_init_failure: None,
            last_capture: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Send the first `HELLO`.
    pub fn start(&mut self, now_ms: u64, out: &mut dyn ReplySink) {
        info!("AppService started in {}", self.fsm.current());
        out.send(&DeviceReply::Hello);
        self.last_hello_ms = now_ms;
    }

    /// Periodic work: re-broadcast `HELLO` while nobody has answered.
    pub fn tick(&mut self, now_ms: u64, out: &mut dyn ReplySink) {
        if !self.fsm.is(DeviceState::Boot) {
            return;
        }
        if now_ms.saturating_sub(self.last_hello_ms) >= u64::from(self.config.hello_interval_ms) {
            out.send(&DeviceReply::Hello);
            self.last_hello_ms = now_ms;
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one host command.
    pub fn handle_command(&mut self, cmd: HostCommand, args: &str, out: &mut dyn ReplySink) {
        debug!("command {cmd} in {} (args '{args}')", self.fsm.current());
        match cmd {
            HostCommand::Hello => self.on_hello(out),
            HostCommand::Ready => self.on_ready(out),
            HostCommand::Init => self.on_init(out),
            HostCommand::Status => self.on_status(out),
            HostCommand::Capture => self.on_capture(out),
        }
    }

    fn on_hello(&mut self, out: &mut dyn ReplySink) {
        out.send(&DeviceReply::Ready);
        let current = self.fsm.current();
        if current == DeviceState::Boot || current.is_failure() {
            self.enter(DeviceState::Synced);
        }
    }

    fn on_ready(&mut self, out: &mut dyn ReplySink) {
        if self.fsm.is(DeviceState::Boot) {
            out.send(&DeviceReply::Ready);
            self.enter(DeviceState::Synced);
        }
    }

    fn on_init(&mut self, out: &mut dyn ReplySink) {
        if !self.fsm.is(DeviceState::Synced) {
            debug!("INIT ignored in {}", self.fsm.current());
            return;
        }

        self.enter(DeviceState::Init);
        let hw = &mut self.hw;
        match run_init(
            &mut hw.store,
            &mut hw.network,
            &mut hw.camera,
            self.config.verify_backend_on_init,
        ) {
            Ok(()) => {
                self.last_init_failure = None;
                self.enter(DeviceState::Ready);
                out.send(&DeviceReply::InitSuccess);
            }
            Err(failure) => {
                log_failure(&failure);
                self.last_init_failure = Some(failure);
                self.enter(failure.state());
                out.send(&failure.reply());
            }
        }
    }

    fn on_status(&mut self, out: &mut dyn ReplySink) {
        out.send(&DeviceReply::Status(self.fsm.current()));
    }

    fn on_capture(&mut self, out: &mut dyn ReplySink) {
        if !self.fsm.is(DeviceState::Ready) {
            info!("CAPTURE refused in {}", self.fsm.current());
            out.send(&DeviceReply::CaptureFail);
            return;
        }

        let hw = &mut self.hw;
        let report = run_capture(
            &mut hw.camera,
            &mut hw.classifier,
            &mut hw.network,
            &mut hw.frames,
            out,
        );
        info!(
            "capture finished after {} attempt(s): {:?}",
            report.attempts, report.outcome
        );
        self.last_capture = Some(report);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current device state.
    pub fn state(&self) -> DeviceState {
        self.fsm.current()
    }

    /// Why the most recent INIT failed, if it did.
    pub fn last_init_failure(&self) -> Option<&InitFailure> {
        self.last_init_failure.as_ref()
    }

    /// Report of the most recent capture run.
    pub fn last_capture(&self) -> Option<&CaptureReport> {
        self.last_capture.as_ref()
    }

    pub fn peripherals(&self) -> &Peripherals<S, N, K, C, M> {
        &self.hw
    }

    pub fn peripherals_mut(&mut self) -> &mut Peripherals<S, N, K, C, M> {
        &mut self.hw
    }

    // ── Internal ──────────────────────────────────────────────

    fn enter(&mut self, next: DeviceState) {
        // A rejected request is logged and forces Error inside the machine.
        let _ = self.fsm.transition(next);
    }
}

impl<S, N, K, C, M> AppService<S, N, K, C, M>
where
    S: ConfigStore + 'static,
    N: NetworkClient + 'static,
    K: CaptureSource + 'static,
    C: Classifier + 'static,
    M: FrameAllocator + 'static,
{
    /// Bind every [`HostCommand`] to a route on `router`.
    ///
    /// Returns `false` if any registration was refused.
    pub fn register_routes(router: &mut CommandRouter<Self>) -> bool {
        HostCommand::ALL.into_iter().fold(true, |ok, cmd| {
            let registered = router.register_route(
                cmd.name(),
                move |app: &mut Self, args: &str, out: &mut dyn ReplySink| {
                    app.handle_command(cmd, args, out);
                },
            );
            registered && ok
        })
    }
}
