//! Inbound commands from the host.
//!
//! These are the requests the [`AppService`](super::service::AppService)
//! interprets and acts upon.  Each one is bound to a serial route by
//! [`AppService::register_routes`](super::service::AppService::register_routes).

use core::fmt;

/// Commands the host can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Handshake.  Always answered with `READY`.
    Hello,
    /// Alternative handshake, honoured only during boot.
    Ready,
    /// Run the init sequence.
    Init,
    /// Report the numeric device state.
    Status,
    /// Run the capture/classify/retry loop.
    Capture,
}

impl HostCommand {
    pub const ALL: [Self; 5] = [
        Self::Hello,
        Self::Init,
        Self::Ready,
        Self::Status,
        Self::Capture,
    ];

    /// Wire name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hello => "HELLO",
            Self::Ready => "READY",
            Self::Init => "INIT",
            Self::Status => "STATUS",
            Self::Capture => "CAPTURE",
        }
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
