//! Byte transport under the SAM-BA monitor protocol

use crate::error::Result;
use std::time::Duration;

/// Transport trait for reading and writing bytes
pub trait Transport {
    /// Write all of `data`
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `buf.len()` bytes
    ///
    /// Fails with [`SambaError::Timeout`](crate::SambaError::Timeout) if the
    /// bytes do not arrive in time.
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Read whatever arrives within `timeout`
    ///
    /// Returns the number of bytes read, or 0 on timeout.
    fn read_some(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<()>;
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{ErrorKind, Read, Write};

    /// Default read timeout for monitor replies
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open a serial port with the specified baud rate
        ///
        /// USB CDC ports ignore the rate; 115200 is used when none is given.
        pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
            let baud_rate = baud.unwrap_or(115200);

            let port = serialport::new(device, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(DEFAULT_TIMEOUT)
                .open()?;

            log::debug!("Opened serial port {} at {} baud", device, baud_rate);

            Ok(Self { port })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.port.read_exact(buf)?;
            Ok(())
        }

        fn read_some(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
            let old_timeout = self.port.timeout();
            self.port.set_timeout(timeout)?;

            let result = match self.port.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
                Err(e) => Err(e.into()),
            };

            self.port.set_timeout(old_timeout)?;
            result
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }
    }
}
