//! Byte channel to the host and the [`SerialLink`] that writes reply
//! lines over it.
//!
//! The device side is [`UartTransport`](crate::adapters::serial::UartTransport)
//! on UART0 (USB-serial bridge on the WROVER kit).  [`NullTransport`]
//! swallows output and never has input.

use log::warn;

use crate::app::ports::ReplySink;
use crate::app::replies::DeviceReply;

/// Non-blocking byte channel.
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Copy pending bytes into `buf`; `Ok(0)` when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Queue as much of `data` as the channel accepts and return that count.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error>;

    /// At least one byte can be read without blocking.
    fn available(&self) -> bool;
}

/// Discards writes, never has input.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn available(&self) -> bool {
        false
    }
}

// ───────────────────────────────────────────────────────────────
// SerialLink
// ───────────────────────────────────────────────────────────────

/// Owns the transport and frames outgoing commands as lines.
///
/// Output is fire-and-forget: transport failures are logged and counted,
/// never reported to the caller.
pub struct SerialLink<T: Transport> {
    transport: T,
    write_errors: u32,
}

impl<T: Transport> SerialLink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            write_errors: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Number of lines that could not be written completely.
    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }

    /// Read whatever is pending without blocking.  Returns 0 when idle or
    /// when the transport reports an error.
    pub fn read_available(&mut self, buf: &mut [u8]) -> usize {
        if !self.transport.available() {
            return 0;
        }
        match self.transport.read(buf) {
            Ok(n) => n,
            Err(e) => {
                warn!("serial: read failed: {e:?}");
                0
            }
        }
    }

    /// Write `name`, then `" " + args` when `args` is non-empty, as one line.
    pub fn send_command(&mut self, name: &str, args: &str) {
        let ok = self.write_all(name.as_bytes())
            && (args.is_empty() || (self.write_all(b" ") && self.write_all(args.as_bytes())))
            && self.write_all(b"\n");

        if ok {
            if let Err(e) = self.transport.flush() {
                warn!("serial: flush failed: {e:?}");
            }
        } else {
            self.write_errors = self.write_errors.wrapping_add(1);
            warn!("serial: dropped reply '{name}'");
        }
    }

    fn write_all(&mut self, mut data: &[u8]) -> bool {
        while !data.is_empty() {
            match self.transport.write(data) {
                Ok(0) => return false,
                Ok(n) => data = &data[n..],
                Err(e) => {
                    warn!("serial: write failed: {e:?}");
                    return false;
                }
            }
        }
        true
    }
}

impl<T: Transport> ReplySink for SerialLink<T> {
    fn send(&mut self, reply: &DeviceReply) {
        let args = reply.args();
        self.send_command(reply.name(), &args);
    }
}
