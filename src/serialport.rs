use crate::exchange;
use crate::protocol::*;
use crate::Error;
use std::time::{Duration, Instant};

/// Factory default baud rate of the RS485 port.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Per read timeout; the response is complete once the line stays quiet this long.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct JkBms {
    serial: Box<dyn serialport::SerialPort>,
    address: DeviceAddress,
    last_execution: Instant,
    delay: Duration,
}

impl JkBms {
    /// Opens `port` for the BMS with the given RS485 `address`.
    ///
    /// The address is checked before the port is touched.
    pub fn new(port: &str, baud_rate: u32, address: u8) -> Result<Self> {
        let address = DeviceAddress::try_from(address)?;
        let serial = serialport::new(port, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(DEFAULT_TIMEOUT)
            .open()
            .map_err(|err| Error::TransportUnavailable {
                port: port.to_string(),
                source: err.into(),
            })?;
        log::debug!("Opened {port} with {baud_rate} baud for BMS address {address}");
        Ok(Self {
            serial,
            address,
            last_execution: Instant::now(),
            delay: MINIMUM_DELAY,
        })
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    fn serial_await_delay(&self) {
        let last_exec_diff = Instant::now().duration_since(self.last_execution);
        if let Some(time_until_delay_reached) = self.delay.checked_sub(last_exec_diff) {
            std::thread::sleep(time_until_delay_reached);
        }
    }

    // drop bytes of an earlier answer still waiting in the driver
    fn clear_pending_input(&mut self) -> Result<()> {
        let pending = self
            .serial
            .bytes_to_read()
            .map_err(|err| Error::Io(err.into()))?;
        if pending > 0 {
            log::trace!("Discarding {} pending bytes", pending);
            self.serial
                .clear(serialport::ClearBuffer::Input)
                .map_err(|err| Error::Io(err.into()))?;
        }
        Ok(())
    }

    /// Sets the per read timeout which terminates the response capture.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        log::trace!("set timeout to {timeout:?}");
        self.serial
            .set_timeout(timeout)
            .map_err(|err| Error::Io(err.into()))
    }

    /// Sets the minimum gap between the end of one answer and the next request.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = Duration::max(delay, MINIMUM_DELAY);
    }

    pub fn read_group(&mut self, group: RegisterGroup) -> Result<DecodedGroup> {
        self.clear_pending_input()?;
        self.serial_await_delay();
        let result = exchange::read_group(&mut self.serial, *self.address, group);
        self.last_execution = Instant::now();
        result
    }

    /// Reads settings, cell info and device info. A failing group does not
    /// prevent the following ones from being read.
    pub fn read_all(&mut self) -> Vec<(RegisterGroup, Result<DecodedGroup>)> {
        RegisterGroup::ALL
            .into_iter()
            .map(|group| (group, self.read_group(group)))
            .collect()
    }
}
