//! Collaborator traits implemented by backends
//!
//! The shell never talks to a serial port or a flash controller directly.
//! Backends provide:
//!
//! - a [`Connector`] that turns a port name into a [`Device`]
//! - a [`PortSource`] listing candidate ports for `scan`
//! - a [`FlashFactory`] that hands out a [`FlashCapability`] for chips it
//!   knows how to program
//!
//! All calls are blocking. A long device access cannot be interrupted from
//! the shell.

use crate::error::Result;
use crate::transfer::{Progress, TransferReport};
use std::path::Path;

/// A connected target reachable through a boot monitor
///
/// Addresses are 32-bit target addresses. Word accesses are little-endian.
pub trait Device {
    /// Read `buf.len()` bytes starting at `addr`
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `addr`
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Read a single byte
    fn read_byte(&mut self, addr: u32) -> Result<u8>;

    /// Write a single byte
    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()>;

    /// Read a 32-bit word
    fn read_word(&mut self, addr: u32) -> Result<u32>;

    /// Write a 32-bit word
    fn write_word(&mut self, addr: u32, value: u32) -> Result<()>;

    /// Query the 32-bit chip identifier
    fn chip_id(&mut self) -> Result<u32>;

    /// Jump to code at `addr`
    fn go(&mut self, addr: u32) -> Result<()>;

    /// Enable or disable transport tracing
    fn set_debug(&mut self, enabled: bool);
}

/// Opens devices by port name
pub trait Connector {
    /// Try to reach a boot monitor on `port`
    ///
    /// Returns `Ok(None)` when nothing answered on the port.
    fn connect(&mut self, port: &str) -> Result<Option<Box<dyn Device>>>;
}

/// Lists candidate ports for an automatic scan
pub trait PortSource {
    /// Iterate over every candidate port name
    fn ports(&self) -> Box<dyn Iterator<Item = String> + '_>;
}

/// Creates flash drivers keyed by chip identifier
pub trait FlashFactory {
    /// Return a flash driver for `chip_id`, or `None` if the chip is unsupported
    fn create(&self, device: &mut dyn Device, chip_id: u32) -> Option<Box<dyn FlashCapability>>;
}

/// Description of the flash attached to a chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashInfo {
    /// Driver name
    pub name: String,
    /// Chip identifier the driver was created for
    pub chip_id: u32,
    /// Address of the first flash byte in the target memory map
    pub base: u32,
    /// Program page size in bytes
    pub page_size: u32,
    /// Number of pages
    pub pages: u32,
    /// Lock state of each lock region (`true` = locked)
    pub lock_regions: Vec<bool>,
    /// Whether the security bit is set
    pub security: bool,
}

impl FlashInfo {
    /// Total flash size in bytes
    pub fn size(&self) -> u32 {
        self.page_size * self.pages
    }
}

/// Result of comparing a host file against flash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Bytes compared
    pub bytes: u32,
    /// Bytes that differed
    pub mismatches: u32,
    /// Address of the first differing byte
    pub first_mismatch: Option<u32>,
}

impl VerifyReport {
    /// Whether the file matched the flash exactly
    pub fn is_match(&self) -> bool {
        self.mismatches == 0
    }
}

/// Chip-specific flash programming driver
///
/// Every operation receives the device the driver was created for, so the
/// driver itself owns no transport.
pub trait FlashCapability {
    /// Driver name
    fn name(&self) -> &str;

    /// Erase the whole flash
    fn erase(&mut self, device: &mut dyn Device) -> Result<()>;

    /// Read `count` bytes of flash into `path` (0 = whole flash)
    fn read(
        &mut self,
        device: &mut dyn Device,
        path: &Path,
        count: u32,
        progress: &mut dyn Progress,
    ) -> Result<TransferReport>;

    /// Program `path` into flash
    fn write(
        &mut self,
        device: &mut dyn Device,
        path: &Path,
        progress: &mut dyn Progress,
    ) -> Result<TransferReport>;

    /// Compare `path` with the flash contents
    fn verify(
        &mut self,
        device: &mut dyn Device,
        path: &Path,
        progress: &mut dyn Progress,
    ) -> Result<VerifyReport>;

    /// Describe the flash
    fn info(&mut self, device: &mut dyn Device) -> Result<FlashInfo>;

    /// Set (`lock == true`) or clear lock bits
    ///
    /// `bits` is a comma separated list of lock region numbers; an empty
    /// string selects every region.
    fn lock(&mut self, device: &mut dyn Device, bits: &str, lock: bool) -> Result<()>;
}

/// A registered flash driver
pub struct FlashDriver {
    /// Driver name, for logging
    pub name: &'static str,
    /// Whether this driver handles the chip identifier
    pub matches: fn(u32) -> bool,
    /// Construct the driver for a matched chip
    pub create: fn(&mut dyn Device, u32) -> Option<Box<dyn FlashCapability>>,
}

/// Flash factory backed by a list of drivers
///
/// The first driver whose predicate accepts the chip identifier wins.
#[derive(Default)]
pub struct FlashRegistry {
    drivers: Vec<FlashDriver>,
}

impl FlashRegistry {
    /// Create an empty registry (every chip unsupported)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a driver
    pub fn register(&mut self, driver: FlashDriver) {
        log::debug!("Registered flash driver {}", driver.name);
        self.drivers.push(driver);
    }

    /// Number of registered drivers
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Whether no drivers are registered
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl FlashFactory for FlashRegistry {
    fn create(&self, device: &mut dyn Device, chip_id: u32) -> Option<Box<dyn FlashCapability>> {
        let driver = self.drivers.iter().find(|d| (d.matches)(chip_id))?;
        log::debug!("Chip ID {:08x} matched flash driver {}", chip_id, driver.name);
        (driver.create)(device, chip_id)
    }
}
