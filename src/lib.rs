#![cfg_attr(docsrs, feature(doc_cfg))]
//! # jkbms_lib
//!
//! This crate provides a library for reading telemetry from JK BMS (Battery Management System)
//! devices over their RS485 port. The BMS answers a Modbus-style trigger write with a
//! `0x55 0xAA 0xEB 0x90` framed register block which is decoded through a static register
//! catalog.
//!
//! ## Features
//!
//! - `default`: Enables `bin-dependencies`, which is intended for compiling the `jkbms` command-line tool and pulls in `serialport` and `serde`.
//!
//! ### Client Features
//! - `serialport`: Enables the **synchronous** client using the `serialport` crate.
//! - `tokio-serial-async`: Enables the **asynchronous** client using `tokio` and `tokio-serial`.
//!
//! ### Utility Features
//! - `serde`: Enables `serde` serialization of decoded values and catalog entries.
//! - `bin-dependencies`: Enables all features required by the `jkbms` binary executable.
//!
//! ## Example
//!
//! ```
//! use jkbms_lib::protocol::{build_request, RegisterGroup};
//!
//! let frame = build_request(1, RegisterGroup::Settings).unwrap();
//! assert_eq!(
//!     frame.as_bytes(),
//!     &[0x01, 0x10, 0x16, 0x1E, 0x00, 0x01, 0x02, 0x00, 0x00, 0xD2, 0x2F]
//! );
//! ```

/// CRC-16 (Modbus) checksum.
pub mod crc;
/// Contains error types for the library.
mod error;
/// Transport independent request/response cycle.
pub mod exchange;
/// Defines the communication protocol for JK BMS.
pub mod protocol;
/// Static register catalog.
pub mod registers;

pub use error::Error;

/// Synchronous client for JK BMS communication.
#[cfg_attr(docsrs, doc(cfg(feature = "serialport")))]
#[cfg(feature = "serialport")]
pub mod serialport;

/// Asynchronous client for JK BMS communication.
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-serial-async")))]
#[cfg(feature = "tokio-serial-async")]
pub mod tokio_serial_async;
