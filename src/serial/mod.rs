//! Serial command link to the host.
//!
//! ```text
//!  Transport ──bytes──▶ CommandRouter ──(ctx, args)──▶ route handler
//!      ▲                                                    │
//!      └────────────── SerialLink::send_command ◀── DeviceReply
//! ```

pub mod codec;
pub mod router;
pub mod transport;

pub use codec::{COMMAND_BUFFER_SIZE, LineBuffer, Push, parse_line};
pub use router::{CommandRouter, MAX_ROUTES, RouteHandler, RouterStats};
pub use transport::{NullTransport, SerialLink, Transport};
