//! rbossa-samba - SAM-BA boot monitor support
//!
//! This crate talks to the SAM-BA monitor in the ROM of Atmel SAM chips over
//! a USB CDC serial port. Only the binary (`N#`) mode is supported.
//!
//! # Example
//!
//! ```no_run
//! use rbossa_samba::{Samba, SerialTransport};
//! use rbossa_core::Device;
//!
//! let transport = SerialTransport::open("/dev/ttyACM0", None)?;
//! let mut samba = Samba::new(transport)?;
//! println!("Chip ID: {:08x}", samba.chip_id()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod error;
pub mod transport;

pub use device::Samba;
pub use error::{Result, SambaError};
pub use transport::serial::SerialTransport;
pub use transport::Transport;

use rbossa_core::{Connector, Device, PortSource};

/// Opens SAM-BA monitors on serial ports
#[derive(Debug, Clone, Default)]
pub struct SambaConnector {
    baud: Option<u32>,
}

impl SambaConnector {
    /// Create a connector using `baud` (hardware default if `None`)
    pub fn new(baud: Option<u32>) -> Self {
        Self { baud }
    }
}

impl Connector for SambaConnector {
    fn connect(&mut self, port: &str) -> rbossa_core::Result<Option<Box<dyn Device>>> {
        let transport = SerialTransport::open(port, self.baud)?;
        match Samba::new(transport) {
            Ok(samba) => Ok(Some(Box::new(samba))),
            Err(e) if e.is_no_device() => {
                log::debug!("samba: No monitor on {}: {}", port, e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Lists serial ports known to the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPorts;

impl PortSource for SerialPorts {
    fn ports(&self) -> Box<dyn Iterator<Item = String> + '_> {
        match serialport::available_ports() {
            Ok(ports) => Box::new(ports.into_iter().map(|p| p.port_name)),
            Err(e) => {
                log::warn!("Unable to enumerate serial ports: {}", e);
                Box::new(std::iter::empty())
            }
        }
    }
}
