//! SLCAN serial CAN adapter.
//!
//! The RP2350 has no CAN controller. A USB/UART CAN adapter running the SLCAN
//! (Lawicel) firmware sits on UART1 and streams received frames as ASCII
//! records. [`SlcanPort`] wraps any blocking `embedded-io` serial port with a
//! non-blocking read check, which is what `BufferedUart` provides.

use canbridge_common::can::slcan::{SlcanBitrate, SlcanCommand, SlcanDecoder, open_sequence};
use canbridge_common::can::{CanFilter, CanFrame, CanPeripheral};
use canbridge_common::error::SlcanError;
use embedded_io::{Read, ReadReady, Write};

/// Serial speed of the adapter link.
pub const SLCAN_BAUD: u32 = 115_200;

/// Upper bound on bytes consumed by one `receive`, so a flooded link cannot
/// hold up the main loop.
const MAX_BYTES_PER_RECEIVE: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum PortError<E> {
    /// The serial port failed.
    #[error("serial I/O failed")]
    Io(E),

    /// The adapter sent something that is not a valid record.
    #[error(transparent)]
    Protocol(#[from] SlcanError),

    /// SLCAN only has setup codes for the standard bus speeds.
    #[error("no SLCAN setup code for {0} bit/s")]
    UnsupportedBitrate(u32),
}

/// SLCAN adapter on a serial port.
pub struct SlcanPort<T> {
    io: T,
    bitrate: SlcanBitrate,
    decoder: SlcanDecoder,
}

impl<T: Read + Write + ReadReady> SlcanPort<T> {
    /// Put the adapter on the bus at `bitrate_bps`, unfiltered.
    pub fn open(
        io: T,
        bitrate_bps: u32,
    ) -> Result<Self, PortError<T::Error>> {
        let bitrate = SlcanBitrate::from_bps(bitrate_bps).ok_or(PortError::UnsupportedBitrate(bitrate_bps))?;
        let mut port = Self {
            io,
            bitrate,
            decoder: SlcanDecoder::new(),
        };
        port.send(&[SlcanCommand::Close, SlcanCommand::Bitrate(bitrate), SlcanCommand::Open])?;
        Ok(port)
    }

    fn send(
        &mut self,
        commands: &[SlcanCommand],
    ) -> Result<(), PortError<T::Error>> {
        for command in commands {
            self.io.write_all(command.encode().as_bytes()).map_err(PortError::Io)?;
        }
        self.io.flush().map_err(PortError::Io)
    }

    #[inline]
    pub const fn bitrate(&self) -> SlcanBitrate { self.bitrate }

    pub fn into_inner(self) -> T { self.io }
}

impl<T: Read + Write + ReadReady> CanPeripheral for SlcanPort<T> {
    type Error = PortError<T::Error>;

    /// Decode buffered bytes until one frame is complete.
    ///
    /// Only bytes already received are consumed; `timeout_ms` is not waited
    /// on, the main loop period does the waiting.
    fn receive(
        &mut self,
        _timeout_ms: u32,
    ) -> Result<Option<CanFrame>, Self::Error> {
        let mut byte = [0u8; 1];
        for _ in 0..MAX_BYTES_PER_RECEIVE {
            if !self.io.read_ready().map_err(PortError::Io)? {
                break;
            }
            if self.io.read(&mut byte).map_err(PortError::Io)? == 0 {
                break;
            }
            match self.decoder.push(byte[0]) {
                Some(Ok(frame)) => return Ok(Some(frame)),
                Some(Err(e)) => return Err(e.into()),
                None => {}
            }
        }
        Ok(None)
    }

    /// Reopen the channel with the acceptance code and mask for `filter`.
    fn set_filter(
        &mut self,
        filter: &CanFilter,
    ) -> Result<(), Self::Error> {
        let commands = open_sequence(self.bitrate, filter);
        self.send(&commands)?;
        self.decoder.reset();
        Ok(())
    }

    fn deinit(&mut self) {
        // Best effort, the bridge is going down anyway
        let _ = self.send(&[SlcanCommand::Close]);
        self.decoder.reset();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::vec::Vec;

    use embedded_io::ErrorType;

    use super::*;

    /// Loopback serial port: bytes queued in `rx` are read, writes land in
    /// `tx`.
    #[derive(Default)]
    struct FakeSerial {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
    }

    impl ErrorType for FakeSerial {
        type Error = Infallible;
    }

    impl Read for FakeSerial {
        fn read(
            &mut self,
            buf: &mut [u8],
        ) -> Result<usize, Self::Error> {
            let mut n = 0;
            while n < buf.len() {
                let Some(b) = self.rx.pop_front() else { break };
                buf[n] = b;
                n += 1;
            }
            Ok(n)
        }
    }

    impl ReadReady for FakeSerial {
        fn read_ready(&mut self) -> Result<bool, Self::Error> { Ok(!self.rx.is_empty()) }
    }

    impl Write for FakeSerial {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> Result<usize, Self::Error> {
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
    }

    fn opened() -> SlcanPort<FakeSerial> { SlcanPort::open(FakeSerial::default(), 1_000_000).unwrap() }

    #[test]
    fn test_open_sends_setup() {
        let port = opened();
        assert_eq!(port.bitrate(), SlcanBitrate::Mbps1);
        assert_eq!(port.into_inner().tx, b"C\rS8\rO\r");
    }

    #[test]
    fn test_open_rejects_odd_bitrate() {
        let result = SlcanPort::open(FakeSerial::default(), 33_333);
        assert!(matches!(result, Err(PortError::UnsupportedBitrate(33_333))));
    }

    #[test]
    fn test_set_filter_sends_acceptance() {
        let mut port = opened();
        port.set_filter(&CanFilter::new(0x90, 0x7FE)).unwrap();
        let tx = port.into_inner().tx;
        assert_eq!(&tx[7..], b"C\rS8\rM12000000\rm003FFFFF\rO\r");
    }

    #[test]
    fn test_receive_decodes_records() {
        let mut port = opened();
        port.io.rx.extend(b"t090800640BB800FA0000\rt0912AABB\r");

        let first = port.receive(0).unwrap().unwrap();
        assert_eq!(first.identifier(), 0x90);
        assert_eq!(first.payload(), &[0x00, 0x64, 0x0B, 0xB8, 0x00, 0xFA, 0x00, 0x00]);

        let second = port.receive(0).unwrap().unwrap();
        assert_eq!(second.identifier(), 0x91);
        assert_eq!(second.payload(), &[0xAA, 0xBB, 0, 0, 0, 0, 0, 0]);

        assert_eq!(port.receive(0).unwrap(), None);
    }

    #[test]
    fn test_partial_record_waits_for_rest() {
        let mut port = opened();
        port.io.rx.extend(b"t0902AA");
        assert_eq!(port.receive(0).unwrap(), None);
        port.io.rx.extend(b"BB\r");
        assert!(port.receive(0).unwrap().is_some());
    }

    #[test]
    fn test_acks_are_skipped() {
        let mut port = opened();
        port.io.rx.extend(b"\r\rz\rt0901FF\r");
        assert_eq!(port.receive(0).unwrap().unwrap().payload()[0], 0xFF);
    }

    #[test]
    fn test_nack_is_protocol_error() {
        let mut port = opened();
        port.io.rx.push_back(0x07);
        assert!(matches!(port.receive(0), Err(PortError::Protocol(SlcanError::AdapterNack))));
    }

    #[test]
    fn test_deinit_closes_channel() {
        let mut port = opened();
        port.deinit();
        assert!(port.into_inner().tx.ends_with(b"O\rC\r"));
    }
}
