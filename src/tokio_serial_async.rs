//! Provides an asynchronous client for reading a JK BMS (Battery Management System)
//! using Tokio and the `tokio-serial` crate for serial communication.
//!
//! This module is suitable for applications built on the Tokio runtime.
//!
//! # Example
//!
//! ```no_run
//! use jkbms_lib::protocol::RegisterGroup;
//! use jkbms_lib::tokio_serial_async::JkBms;
//! use jkbms_lib::Error;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Error> {
//!     let mut bms = JkBms::new("/dev/ttyUSB0", 115_200, 1)?;
//!
//!     let cells = bms.read_group(RegisterGroup::CellInfo).await?;
//!     for field in &cells.fields {
//!         println!("{field}");
//!     }
//!     cells.check_complete()
//! }
//! ```

use crate::protocol::*;
use crate::Error;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt};

/// A specialized `Result` type for operations within the `tokio_serial_async` module.
type Result<T> = std::result::Result<T, Error>;

/// Per read timeout; the response is complete once the line stays quiet this long.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// The main struct for reading a JK BMS asynchronously using Tokio.
#[derive(Debug)]
pub struct JkBms {
    serial: tokio_serial::SerialStream,
    address: DeviceAddress,
    last_execution: Instant,
    io_timeout: Duration, // quiet time which ends a response
    delay: Duration,      // delay between request cycles
}

/// Reads from `reader` until it reports end of data, stays quiet for
/// `io_timeout` or the receive buffer is full.
pub async fn capture_response<R: AsyncRead + Unpin>(
    reader: &mut R,
    io_timeout: Duration,
) -> Result<Vec<u8>> {
    let mut rx_buffer = vec![0; RX_BUFFER_CAPACITY];
    let mut received = 0;

    while received < rx_buffer.len() {
        match tokio::time::timeout(io_timeout, reader.read(&mut rx_buffer[received..])).await {
            Ok(Ok(0)) | Err(_) => break,
            Ok(Ok(n)) => {
                log::trace!("read {n} bytes");
                received += n;
            }
            Ok(Err(err)) => return Err(err.into()),
        }
    }
    rx_buffer.truncate(received);

    log::trace!("receive_bytes: {rx_buffer:02X?}");
    validate_len(&rx_buffer)?;
    Ok(rx_buffer)
}

impl JkBms {
    /// Creates a new `JkBms` instance for asynchronous communication.
    ///
    /// # Arguments
    ///
    /// * `port`: The path to the serial port device (e.g., `/dev/ttyUSB0` on Linux, `COM3` on Windows).
    /// * `baud_rate`: Line speed, the BMS ships with 115200.
    /// * `address`: RS485 address of the BMS, 1 to 15.
    ///
    /// The address is checked before the port is opened.
    pub fn new(port: &str, baud_rate: u32, address: u8) -> Result<Self> {
        let address = DeviceAddress::try_from(address)?;
        let serial = tokio_serial::new(port, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|err| Error::TransportUnavailable {
                port: port.to_string(),
                source: err.into(),
            })?;
        Ok(Self {
            serial,
            address,
            last_execution: Instant::now(),
            io_timeout: DEFAULT_TIMEOUT,
            delay: MINIMUM_DELAY,
        })
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    async fn serial_await_delay(&self) {
        let last_exec_diff = Instant::now().duration_since(self.last_execution);
        if let Some(time_until_delay_reached) = self.delay.checked_sub(last_exec_diff) {
            tokio::time::sleep(time_until_delay_reached).await;
        }
    }

    async fn send_bytes(&mut self, tx_buffer: &[u8]) -> Result<()> {
        // drop bytes of an earlier answer still waiting in the driver
        let pending = self
            .serial
            .bytes_to_read()
            .map_err(|err| Error::Io(err.into()))?;
        if pending > 0 {
            log::trace!("Discarding {pending} pending bytes");
            self.serial
                .clear(tokio_serial::ClearBuffer::Input)
                .map_err(|err| Error::Io(err.into()))?;
        }
        self.serial_await_delay().await;

        log::trace!("send_bytes: {tx_buffer:02X?}");
        self.serial.write_all(tx_buffer).await?;
        Ok(())
    }

    /// Sets how long the line has to stay quiet before a response is considered complete.
    pub fn set_timeout(&mut self, timeout: Duration) {
        log::trace!("set timeout to {timeout:?}");
        self.io_timeout = timeout;
    }

    /// Sets the minimum gap between the end of one answer and the next request.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = Duration::max(delay, MINIMUM_DELAY);
    }

    pub async fn read_group(&mut self, group: RegisterGroup) -> Result<DecodedGroup> {
        let request = build_request(*self.address, group)?;
        self.send_bytes(request.as_ref()).await?;
        let rx_buffer = capture_response(&mut self.serial, self.io_timeout).await;
        self.last_execution = Instant::now();
        decode_response(&rx_buffer?, group)
    }

    /// Reads settings, cell info and device info one after another.
    pub async fn read_all(&mut self) -> Vec<(RegisterGroup, Result<DecodedGroup>)> {
        let mut outcomes = Vec::with_capacity(RegisterGroup::ALL.len());
        for group in RegisterGroup::ALL {
            outcomes.push((group, self.read_group(group).await));
        }
        outcomes
    }
}
