//! Connection state shared by every shell command
//!
//! A [`Session`] owns the backend collaborators plus the currently attached
//! device and its flash driver. A flash driver is only ever held while a
//! device is held; every mutator keeps that pairing intact.

use crate::device::{Connector, Device, FlashCapability, FlashFactory, PortSource};
use crate::error::{Error, Result};

/// What was learned about a freshly attached device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attached {
    /// Chip identifier, if the query succeeded
    pub chip_id: Option<u32>,
    /// Name of the flash driver, if the chip is supported
    pub flash: Option<String>,
}

/// Device presence and flash capability for one shell lifetime
pub struct Session {
    connector: Box<dyn Connector>,
    ports: Box<dyn PortSource>,
    flash_factory: Box<dyn FlashFactory>,
    device: Option<Box<dyn Device>>,
    flash: Option<Box<dyn FlashCapability>>,
    debug: bool,
}

impl Session {
    /// Create a disconnected session over the given collaborators
    pub fn new(
        connector: Box<dyn Connector>,
        ports: Box<dyn PortSource>,
        flash_factory: Box<dyn FlashFactory>,
    ) -> Self {
        Self {
            connector,
            ports,
            flash_factory,
            device: None,
            flash: None,
            debug: false,
        }
    }

    /// Whether a device is attached
    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    /// Whether a device with a supported flash is attached
    pub fn is_flashable(&self) -> bool {
        self.is_connected() && self.flash.is_some()
    }

    /// The attached device
    pub fn device(&mut self) -> Result<&mut dyn Device> {
        match self.device.as_deref_mut() {
            Some(device) => Ok(device),
            None => Err(Error::NotConnected),
        }
    }

    /// The flash driver together with the device it drives
    pub fn flash(&mut self) -> Result<(&mut dyn FlashCapability, &mut dyn Device)> {
        let device: &mut dyn Device = match self.device.as_deref_mut() {
            Some(device) => device,
            None => return Err(Error::NotConnected),
        };
        let flash: &mut dyn FlashCapability = match self.flash.as_deref_mut() {
            Some(flash) => flash,
            None => return Err(Error::FlashUnsupported),
        };
        Ok((flash, device))
    }

    /// Current transport tracing state
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Set transport tracing for the attached device and future connections
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
        if let Some(device) = self.device.as_deref_mut() {
            device.set_debug(enabled);
        }
    }

    /// Connect to the device on `port`
    ///
    /// Any previous device is released first. Returns `Ok(None)` when nothing
    /// answered; the session is left disconnected in that case and on error.
    pub fn connect(&mut self, port: &str) -> Result<Option<Attached>> {
        self.disconnect();
        log::debug!("Connecting on {}", port);
        match self.connector.connect(port)? {
            Some(device) => Ok(Some(self.attach(device))),
            None => Ok(None),
        }
    }

    /// Try every candidate port until a device answers
    ///
    /// Ports that fail with an error are logged and skipped.
    pub fn scan(&mut self) -> Result<Option<(String, Attached)>> {
        self.disconnect();
        let candidates: Vec<String> = self.ports.ports().collect();
        log::debug!("Scanning {} candidate ports", candidates.len());

        for port in candidates {
            match self.connector.connect(&port) {
                Ok(Some(device)) => {
                    let attached = self.attach(device);
                    return Ok(Some((port, attached)));
                }
                Ok(None) => log::debug!("No device on {}", port),
                Err(e) => log::debug!("Skipping {}: {}", port, e),
            }
        }

        Ok(None)
    }

    /// Adopt an already opened device and look up its flash driver
    pub fn attach(&mut self, mut device: Box<dyn Device>) -> Attached {
        self.disconnect();
        device.set_debug(self.debug);
        self.device = Some(device);
        self.establish_flash()
    }

    /// Query the chip identifier and install the matching flash driver
    ///
    /// An unsupported chip or a failed query leaves the device attached
    /// without flash support.
    pub fn establish_flash(&mut self) -> Attached {
        self.flash = None;
        let Some(device) = self.device.as_deref_mut() else {
            return Attached::default();
        };

        let chip_id = match device.chip_id() {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Unable to read chip ID: {}", e);
                return Attached::default();
            }
        };
        log::debug!("Chip ID {:08x}", chip_id);

        self.flash = self.flash_factory.create(device, chip_id);
        let flash = self.flash.as_ref().map(|f| f.name().to_string());
        match &flash {
            Some(name) => log::info!("Using flash driver {}", name),
            None => log::debug!("No flash driver for chip ID {:08x}", chip_id),
        }

        Attached {
            chip_id: Some(chip_id),
            flash,
        }
    }

    /// Release the device and its flash driver
    pub fn disconnect(&mut self) {
        self.flash = None;
        if self.device.take().is_some() {
            log::debug!("Device released");
        }
    }
}
