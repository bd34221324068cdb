//! Device lifecycle state machine.
//!
//! ```text
//!   BOOT ──[HELLO|READY]──▶ SYNCED ──[INIT]──▶ INIT ──[all ok]──▶ READY
//!                             ▲                  │
//!                             │           [stage failed]
//!                             │                  ▼
//!                             └──[HELLO]── failure state
//!                                          (NO_SDC, BAD_WIFI_CONF, ...)
//!
//!   any ──[illegal request]──▶ ERROR ──[HELLO]──▶ SYNCED
//! ```
//!
//! The machine holds exactly one current state and only moves along the
//! edges of the fixed table in [`is_allowed`].  It is driven by the command
//! handlers in [`AppService`](crate::app::service::AppService); nothing else
//! mutates it.

use core::fmt;

use log::{error, info};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all device states.
///
/// The discriminant is the numeric code reported by `STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum DeviceState {
    Boot = 0,
    Synced = 1,
    Init = 2,
    Ready = 3,
    CamInitFail = 4,
    NoWifiConn = 5,
    NoSdCard = 6,
    ConfigFileMissing = 7,
    BadWifiConfig = 8,
    NoInternet = 9,
    Error = -1,
}

impl DeviceState {
    /// Total number of states.
    pub const COUNT: usize = 11;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Boot,
        Self::Synced,
        Self::Init,
        Self::Ready,
        Self::CamInitFail,
        Self::NoWifiConn,
        Self::NoSdCard,
        Self::ConfigFileMissing,
        Self::BadWifiConfig,
        Self::NoInternet,
        Self::Error,
    ];

    /// Numeric code reported over the serial link.
    pub const fn code(self) -> i8 {
        self as i8
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Boot => "Boot",
            Self::Synced => "Synced",
            Self::Init => "Init",
            Self::Ready => "Ready",
            Self::CamInitFail => "CamInitFail",
            Self::NoWifiConn => "NoWifiConn",
            Self::NoSdCard => "NoSdCard",
            Self::ConfigFileMissing => "ConfigFileMissing",
            Self::BadWifiConfig => "BadWifiConfig",
            Self::NoInternet => "NoInternet",
            Self::Error => "Error",
        }
    }

    /// States an init run can end in other than `Ready`, plus `Error`.
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::CamInitFail
                | Self::NoWifiConn
                | Self::NoSdCard
                | Self::ConfigFileMissing
                | Self::BadWifiConfig
                | Self::NoInternet
                | Self::Error
        )
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// The fixed transition table.
pub const fn is_allowed(from: DeviceState, to: DeviceState) -> bool {
    use DeviceState as S;
    match (from, to) {
        (_, S::Error)
        | (S::Boot, S::Synced)
        | (S::Synced, S::Init)
        | (
            S::Init,
            S::Ready
            | S::NoSdCard
            | S::ConfigFileMissing
            | S::BadWifiConfig
            | S::NoWifiConn
            | S::CamInitFail
            | S::NoInternet,
        ) => true,
        (f, S::Synced) => f.is_failure(),
        _ => false,
    }
}

/// A transition request that is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: DeviceState,
    pub to: DeviceState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal transition {} -> {}", self.from, self.to)
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Single owner of the current [`DeviceState`].
#[derive(Debug)]
pub struct StateMachine {
    current: DeviceState,
    /// Number of accepted transitions since boot.
    transitions: u32,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// A machine in `Boot`.
    pub fn new() -> Self {
        Self {
            current: DeviceState::Boot,
            transitions: 0,
        }
    }

    pub fn current(&self) -> DeviceState {
        self.current
    }

    pub fn is(&self, state: DeviceState) -> bool {
        self.current == state
    }

    pub fn transition_count(&self) -> u32 {
        self.transitions
    }

    /// Move to `next` if the table allows it.
    ///
    /// An illegal request is a firmware bug: it is logged and the machine
    /// is forced into `Error` so the host can see it through `STATUS`.
    pub fn transition(&mut self, next: DeviceState) -> Result<(), IllegalTransition> {
        let from = self.current;
        if !is_allowed(from, next) {
            let err = IllegalTransition { from, to: next };
            error!("FSM: {err}, forcing Error");
            self.current = DeviceState::Error;
            self.transitions = self.transitions.wrapping_add(1);
            return Err(err);
        }

        info!("FSM transition: {from} -> {next}");
        self.current = next;
        self.transitions = self.transitions.wrapping_add(1);
        Ok(())
    }
}
