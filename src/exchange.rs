//! One request/response cycle over any blocking byte stream.
//!
//! The BMS does not announce the length of its answer in a way that can be
//! trusted, so a response is read until the stream stays quiet for one read
//! timeout. The timeout itself belongs to the transport (e.g. the serial port
//! read timeout).

use crate::protocol::{
    build_request, decode_response, validate_len, DecodedGroup, DeviceAddress, RegisterGroup,
    RX_BUFFER_CAPACITY,
};
use crate::Error;
use std::io::{ErrorKind, Read, Write};

type Result<T> = std::result::Result<T, Error>;

/// Reads from `reader` until a read returns no data, times out or the
/// receive buffer is full.
///
/// Fails with [`Error::ShortResponse`] if less than signature and group
/// identifier arrived.
pub fn capture_response<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>> {
    let mut rx_buffer = vec![0; RX_BUFFER_CAPACITY];
    let mut received = 0;

    while received < rx_buffer.len() {
        match reader.read(&mut rx_buffer[received..]) {
            Ok(0) => break,
            Ok(n) => {
                log::trace!("read {n} bytes");
                received += n;
            }
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    rx_buffer.truncate(received);

    log::trace!("receive_bytes: {rx_buffer:02X?}");
    validate_len(&rx_buffer)?;
    Ok(rx_buffer)
}

/// Sends the request for `group` and decodes the answer.
///
/// The address is validated before anything is written to `transport`.
pub fn read_group<T: Read + Write + ?Sized>(
    transport: &mut T,
    address: u8,
    group: RegisterGroup,
) -> Result<DecodedGroup> {
    let request = build_request(address, group)?;
    log::trace!("send_bytes: {request:?}");
    transport.write_all(request.as_ref())?;
    transport.flush()?;

    let rx_buffer = capture_response(transport)?;
    decode_response(&rx_buffer, group)
}

/// Reads all three groups one after another.
///
/// A failing group does not stop the others; each outcome is returned next to
/// its group. Only an invalid address fails the whole call.
pub fn read_all_groups<T: Read + Write + ?Sized>(
    transport: &mut T,
    address: u8,
) -> Result<Vec<(RegisterGroup, Result<DecodedGroup>)>> {
    let address = DeviceAddress::try_from(address)?;
    let mut outcomes = Vec::with_capacity(RegisterGroup::ALL.len());
    for group in RegisterGroup::ALL {
        let outcome = read_group(transport, *address, group);
        if let Err(err) = &outcome {
            log::warn!("Reading group {group} failed: {err}");
        }
        outcomes.push((group, outcome));
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Hands out one scripted chunk per read.
    struct Chunks(VecDeque<std::io::Result<Vec<u8>>>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                Some(Err(err)) => Err(err),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn capture_until_quiet_test() {
        let mut reader = Chunks(VecDeque::from([
            Ok(vec![1, 2, 3]),
            Ok(vec![4, 5]),
            Ok(vec![6, 7, 8]),
            Ok(vec![]),
            Ok(vec![9]),
        ]));
        assert_eq!(
            capture_response(&mut reader).unwrap(),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn capture_stops_on_timeout_test() {
        let mut reader = Chunks(VecDeque::from([
            Ok(vec![0xAA; 10]),
            Err(std::io::Error::new(ErrorKind::Interrupted, "signal")),
            Ok(vec![0xBB; 2]),
            Err(std::io::Error::new(ErrorKind::TimedOut, "quiet")),
            Ok(vec![0xCC; 4]),
        ]));
        let rx_buffer = capture_response(&mut reader).unwrap();
        assert_eq!(rx_buffer.len(), 12);
        assert_eq!(rx_buffer[11], 0xBB);
    }

    #[test]
    fn capture_io_error_test() {
        let mut reader = Chunks(VecDeque::from([
            Ok(vec![0; 8]),
            Err(std::io::Error::new(ErrorKind::BrokenPipe, "gone")),
        ]));
        assert!(matches!(
            capture_response(&mut reader),
            Err(Error::Io(err)) if err.kind() == ErrorKind::BrokenPipe
        ));
    }

    #[test]
    fn capture_short_response_test() {
        let mut reader = Chunks(VecDeque::from([Ok(vec![0x55, 0xAA, 0xEB])]));
        assert!(matches!(
            capture_response(&mut reader),
            Err(Error::ShortResponse { received: 3 })
        ));
        let mut reader = Chunks(VecDeque::new());
        assert!(matches!(
            capture_response(&mut reader),
            Err(Error::ShortResponse { received: 0 })
        ));
    }

    #[test]
    fn capture_is_bounded_test() {
        let mut reader = Chunks((0..100).map(|_| Ok(vec![0x11; 64])).collect());
        let rx_buffer = capture_response(&mut reader).unwrap();
        assert_eq!(rx_buffer.len(), RX_BUFFER_CAPACITY);
        // the rest stays in the stream
        assert!(!reader.0.is_empty());
    }
}
