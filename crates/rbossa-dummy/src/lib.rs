//! rbossa-dummy - In-memory SAM-BA target emulator
//!
//! This crate provides a dummy target that emulates a chip's memory map, its
//! PIO controllers and a simple flash driver. It's useful for testing and
//! development without real hardware.

use rbossa_core::args::parse_u32;
use rbossa_core::pio::{
    Port, RegisterLayout, PIO_ABSR, PIO_CODR, PIO_ODR, PIO_ODSR, PIO_OER, PIO_OSR, PIO_PDSR,
    PIO_PER, PIO_PSR, PIO_SODR,
};
use rbossa_core::transfer::{self, Progress, TransferReport, CHUNK_SIZE};
use rbossa_core::{
    Connector, Device, Error, FlashCapability, FlashDriver, FlashInfo, PortSource, Result,
    VerifyReport,
};
use std::collections::HashMap;
use std::path::Path;

/// Port name the dummy connector answers on by default
pub const DEFAULT_PORT: &str = "dummy0";

/// PIO disable register, only the emulator needs it
const PIO_PDR: u32 = 0x04;

/// Granularity of the sparse memory map
const PAGE_SIZE: u32 = 4096;

/// Geometry of an emulated chip
#[derive(Debug)]
pub struct ChipModel {
    /// Part name
    pub name: &'static str,
    /// Chip identifier reported by the monitor
    pub chip_id: u32,
    /// First flash address
    pub flash_base: u32,
    /// Program page size
    pub page_size: u32,
    /// Number of pages
    pub pages: u32,
    /// Number of lock regions
    pub lock_regions: u32,
}

impl ChipModel {
    /// Flash size in bytes
    pub fn flash_size(&self) -> u32 {
        self.page_size * self.pages
    }

    fn contains(&self, addr: u32) -> bool {
        addr >= self.flash_base && addr - self.flash_base < self.flash_size()
    }

    fn region_size(&self) -> u32 {
        self.flash_size() / self.lock_regions
    }
}

/// Chips the emulator knows the flash geometry of
pub const MODELS: &[ChipModel] = &[
    ChipModel {
        name: "at91sam7s256",
        chip_id: 0x270b_0940,
        flash_base: 0x0010_0000,
        page_size: 256,
        pages: 1024,
        lock_regions: 16,
    },
    ChipModel {
        name: "atsam3u4",
        chip_id: 0x2810_0960,
        flash_base: 0x0008_0000,
        page_size: 256,
        pages: 512,
        lock_regions: 16,
    },
    ChipModel {
        name: "atsam3x8",
        chip_id: 0x285e_0a60,
        flash_base: 0x0008_0000,
        page_size: 256,
        pages: 2048,
        lock_regions: 32,
    },
];

/// Look up the emulated model for a chip identifier
pub fn model_for(chip_id: u32) -> Option<&'static ChipModel> {
    MODELS.iter().find(|m| m.chip_id == chip_id)
}

/// Configuration for the dummy target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Chip identifier the target reports
    pub chip_id: u32,
    /// Ports the connector answers on
    pub ports: Vec<String>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            chip_id: MODELS[0].chip_id,
            ports: vec![DEFAULT_PORT.to_string()],
        }
    }
}

/// State of one emulated PIO controller
#[derive(Debug, Default, Clone, Copy)]
struct PioController {
    enabled: u32,
    output: u32,
    driven: u32,
    inputs: u32,
    select: u32,
}

impl PioController {
    fn pin_data(&self) -> u32 {
        (self.driven & self.output) | (self.inputs & !self.output)
    }

    fn read(&self, offset: u32) -> Option<u32> {
        match offset {
            PIO_PSR => Some(self.enabled),
            PIO_OSR => Some(self.output),
            PIO_ODSR => Some(self.driven),
            PIO_PDSR => Some(self.pin_data()),
            PIO_ABSR => Some(self.select),
            _ => None,
        }
    }

    fn write(&mut self, offset: u32, value: u32) -> bool {
        match offset {
            PIO_PER => self.enabled |= value,
            PIO_PDR => self.enabled &= !value,
            PIO_OER => self.output |= value,
            PIO_ODR => self.output &= !value,
            PIO_SODR => self.driven |= value,
            PIO_CODR => self.driven &= !value,
            PIO_ABSR => self.select = value,
            _ => return false,
        }
        true
    }
}

/// Emulated target
///
/// Memory is sparse: untouched flash reads as `0xff`, everything else as
/// zero. Word accesses that hit a PIO register block go to the emulated
/// controller instead of memory.
pub struct DummyDevice {
    chip_id: u32,
    model: Option<&'static ChipModel>,
    pages: HashMap<u32, Vec<u8>>,
    pio: [(u32, PioController); 3],
    last_go: Option<u32>,
    debug: bool,
}

impl DummyDevice {
    /// Create a target reporting `chip_id`
    pub fn new(chip_id: u32) -> Self {
        let layout = RegisterLayout::for_chip(chip_id);
        Self {
            chip_id,
            model: model_for(chip_id),
            pages: HashMap::new(),
            pio: [
                (layout.base(Port::A), PioController::default()),
                (layout.base(Port::B), PioController::default()),
                (layout.base(Port::C), PioController::default()),
            ],
            last_go: None,
            debug: false,
        }
    }

    /// Address of the last `go`, if any
    pub fn last_go(&self) -> Option<u32> {
        self.last_go
    }

    /// Drive the external level of a pin configured as input
    pub fn set_input(&mut self, port: Port, bit: u32, high: bool) {
        let index = port as usize;
        let controller = &mut self.pio[index].1;
        if high {
            controller.inputs |= 1 << bit;
        } else {
            controller.inputs &= !(1 << bit);
        }
    }

    fn blank(&self, page: u32) -> u8 {
        match self.model {
            Some(model) if model.contains(page) => 0xff,
            _ => 0x00,
        }
    }

    fn pio_register(&mut self, addr: u32) -> Option<(&mut PioController, u32)> {
        self.pio.iter_mut().find_map(|(base, controller)| {
            let offset = addr.wrapping_sub(*base);
            (offset <= PIO_ABSR).then_some((controller, offset))
        })
    }

    fn trace(&self, what: &str, addr: u32, len: usize) {
        if self.debug {
            log::info!("dummy: {} 0x{:08x} ({} bytes)", what, addr, len);
        } else {
            log::trace!("dummy: {} 0x{:08x} ({} bytes)", what, addr, len);
        }
    }

    fn load(&self, addr: u32, buf: &mut [u8]) {
        let mut offset = 0;
        while offset < buf.len() {
            let at = addr.wrapping_add(offset as u32);
            let page = at & !(PAGE_SIZE - 1);
            let start = (at - page) as usize;
            let len = (PAGE_SIZE as usize - start).min(buf.len() - offset);
            let dst = &mut buf[offset..offset + len];
            match self.pages.get(&page) {
                Some(data) => dst.copy_from_slice(&data[start..start + len]),
                None => dst.fill(self.blank(page)),
            }
            offset += len;
        }
    }

    fn store(&mut self, addr: u32, data: &[u8]) {
        let mut offset = 0;
        while offset < data.len() {
            let at = addr.wrapping_add(offset as u32);
            let page = at & !(PAGE_SIZE - 1);
            let start = (at - page) as usize;
            let len = (PAGE_SIZE as usize - start).min(data.len() - offset);
            let fill = self.blank(page);
            let dst = self
                .pages
                .entry(page)
                .or_insert_with(|| vec![fill; PAGE_SIZE as usize]);
            dst[start..start + len].copy_from_slice(&data[offset..offset + len]);
            offset += len;
        }
    }
}

impl Device for DummyDevice {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.trace("read", addr, buf.len());
        self.load(addr, buf);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.trace("write", addr, data.len());
        self.store(addr, data);
        Ok(())
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8> {
        let mut buf = [0u8];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        self.write(addr, &[value])
    }

    fn read_word(&mut self, addr: u32) -> Result<u32> {
        if let Some(value) = self
            .pio_register(addr)
            .and_then(|(controller, offset)| controller.read(offset))
        {
            self.trace("pio read", addr, 4);
            return Ok(value);
        }
        let mut buf = [0u8; 4];
        self.read(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn write_word(&mut self, addr: u32, value: u32) -> Result<()> {
        let handled = self
            .pio_register(addr)
            .is_some_and(|(controller, offset)| controller.write(offset, value));
        if handled {
            self.trace("pio write", addr, 4);
            return Ok(());
        }
        self.write(addr, &value.to_le_bytes())
    }

    fn chip_id(&mut self) -> Result<u32> {
        Ok(self.chip_id)
    }

    fn go(&mut self, addr: u32) -> Result<()> {
        log::info!("dummy: go 0x{:08x}", addr);
        self.last_go = Some(addr);
        Ok(())
    }

    fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }
}

/// Hands out dummy targets on the configured ports
#[derive(Debug, Clone, Default)]
pub struct DummyConnector {
    config: DummyConfig,
}

impl DummyConnector {
    /// Create a connector with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self { config }
    }
}

impl Connector for DummyConnector {
    fn connect(&mut self, port: &str) -> Result<Option<Box<dyn Device>>> {
        if !self.config.ports.iter().any(|p| p == port) {
            return Ok(None);
        }
        log::debug!("dummy: target with chip ID {:08x} on {}", self.config.chip_id, port);
        Ok(Some(Box::new(DummyDevice::new(self.config.chip_id))))
    }
}

impl PortSource for DummyConnector {
    fn ports(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(self.config.ports.iter().cloned())
    }
}

/// Flash driver for emulated chips
///
/// Programs through plain memory writes. Lock bits live in the driver and
/// guard erase and write.
pub struct DummyFlash {
    model: &'static ChipModel,
    locks: Vec<bool>,
}

impl DummyFlash {
    /// Create a driver for `model`
    pub fn new(model: &'static ChipModel) -> Self {
        Self {
            model,
            locks: vec![false; model.lock_regions as usize],
        }
    }

    fn check_unlocked(&self, offset: u32, len: u32) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let region = self.model.region_size();
        let first = offset / region;
        let last = (offset + len - 1) / region;
        match (first..=last).find(|&r| self.locks[r as usize]) {
            Some(r) => Err(Error::Flash(format!("Lock region {} is locked", r))),
            None => Ok(()),
        }
    }

    fn check_fits(&self, len: u64) -> Result<u32> {
        let size = self.model.flash_size();
        if len > size as u64 {
            return Err(Error::Flash(format!(
                "{} bytes do not fit in {} bytes of flash",
                len, size
            )));
        }
        Ok(len as u32)
    }
}

impl FlashCapability for DummyFlash {
    fn name(&self) -> &str {
        self.model.name
    }

    fn erase(&mut self, device: &mut dyn Device) -> Result<()> {
        self.check_unlocked(0, self.model.flash_size())?;
        let blank = vec![0xffu8; CHUNK_SIZE];
        let mut offset = 0;
        while offset < self.model.flash_size() {
            let len = (self.model.flash_size() - offset).min(CHUNK_SIZE as u32);
            device.write(self.model.flash_base + offset, &blank[..len as usize])?;
            offset += len;
        }
        log::info!("Erased {} bytes of flash", self.model.flash_size());
        Ok(())
    }

    fn read(
        &mut self,
        device: &mut dyn Device,
        path: &Path,
        count: u32,
        progress: &mut dyn Progress,
    ) -> Result<TransferReport> {
        let count = if count == 0 {
            self.model.flash_size()
        } else {
            self.check_fits(count as u64)?
        };
        transfer::read_to_file(device, self.model.flash_base, count, path, progress)
    }

    fn write(
        &mut self,
        device: &mut dyn Device,
        path: &Path,
        progress: &mut dyn Progress,
    ) -> Result<TransferReport> {
        let len = std::fs::metadata(path)
            .map_err(|source| Error::FileOpen {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let len = self.check_fits(len)?;
        self.check_unlocked(0, len)?;
        transfer::write_from_file(device, self.model.flash_base, path, progress)
    }

    fn verify(
        &mut self,
        device: &mut dyn Device,
        path: &Path,
        progress: &mut dyn Progress,
    ) -> Result<VerifyReport> {
        transfer::verify_against_file(device, self.model.flash_base, path, progress)
    }

    fn info(&mut self, _device: &mut dyn Device) -> Result<FlashInfo> {
        Ok(FlashInfo {
            name: self.model.name.to_string(),
            chip_id: self.model.chip_id,
            base: self.model.flash_base,
            page_size: self.model.page_size,
            pages: self.model.pages,
            lock_regions: self.locks.clone(),
            security: false,
        })
    }

    fn lock(&mut self, _device: &mut dyn Device, bits: &str, lock: bool) -> Result<()> {
        let regions: Vec<usize> = if bits.trim().is_empty() {
            (0..self.locks.len()).collect()
        } else {
            bits.split(',')
                .map(|token| {
                    let region = parse_u32(token.trim())?;
                    if region as usize >= self.locks.len() {
                        return Err(Error::OutOfRange(format!("Lock region {}", region)));
                    }
                    Ok(region as usize)
                })
                .collect::<Result<_>>()?
        };

        for region in regions {
            self.locks[region] = lock;
        }
        log::debug!("Lock bits now {:?}", self.locks);
        Ok(())
    }
}

/// Registry entry for the dummy flash driver
pub fn flash_driver() -> FlashDriver {
    FlashDriver {
        name: "dummy",
        matches: |chip_id| model_for(chip_id).is_some(),
        create: |_, chip_id| {
            model_for(chip_id).map(|model| Box::new(DummyFlash::new(model)) as Box<dyn FlashCapability>)
        },
    }
}
