//! UART0 transport: the host link.
//!
//! Implements [`Transport`] over the USB-serial bridge of the WROVER kit.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_hal::uart::UartDriver`, reads are
//!   non-blocking and sized by the driver's RX ring.
//! - **all other targets**: an injectable RX queue and a captured TX buffer
//!   for host-side tests.

use crate::serial::Transport;

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

// ── Error type ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    /// The driver returned an ESP-IDF error code.
    Driver(i32),
    /// Simulation: TX was closed by the test.
    Closed,
}

impl core::fmt::Display for UartError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Driver(code) => write!(f, "UART driver error {code}"),
            Self::Closed => write!(f, "UART closed"),
        }
    }
}

// ── Transport ────────────────────────────────────────────────

pub struct UartTransport {
    #[cfg(target_os = "espidf")]
    uart: esp_idf_hal::uart::UartDriver<'static>,
    #[cfg(not(target_os = "espidf"))]
    rx: VecDeque<u8>,
    #[cfg(not(target_os = "espidf"))]
    tx: Vec<u8>,
    #[cfg(not(target_os = "espidf"))]
    closed: bool,
}

#[cfg(target_os = "espidf")]
impl UartTransport {
    pub fn new(uart: esp_idf_hal::uart::UartDriver<'static>) -> Self {
        log::info!("UART: host link ready");
        Self { uart }
    }
}

#[cfg(target_os = "espidf")]
impl Transport for UartTransport {
    type Error = UartError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, UartError> {
        self.uart
            .read(buf, esp_idf_hal::delay::NON_BLOCK)
            .map_err(|e| UartError::Driver(e.code()))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, UartError> {
        self.uart
            .write(data)
            .map_err(|e| UartError::Driver(e.code()))
    }

    fn flush(&mut self) -> Result<(), UartError> {
        // Writes land in the driver's TX ring.
        Ok(())
    }

    fn available(&self) -> bool {
        self.uart.remaining_read().is_ok_and(|n| n > 0)
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for UartTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl UartTransport {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            tx: Vec::new(),
            closed: false,
        }
    }

    /// Queue bytes as if the host had sent them.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Everything written so far, cleared on return.
    pub fn take_output(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }

    /// Written output split into lines, cleared on return.
    pub fn take_lines(&mut self) -> Vec<String> {
        String::from_utf8_lossy(&self.take_output())
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Make every further write fail.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Transport for UartTransport {
    type Error = UartError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, UartError> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, UartError> {
        if self.closed {
            return Err(UartError::Closed);
        }
        self.tx.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), UartError> {
        Ok(())
    }

    fn available(&self) -> bool {
        !self.rx.is_empty()
    }
}
