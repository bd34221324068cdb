//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules of the device: the handshake,
//! the init sequence and the capture/classify/retry loop.  All interaction
//! with hardware happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod capture;
pub mod commands;
pub mod init;
pub mod ports;
pub mod replies;
pub mod service;
