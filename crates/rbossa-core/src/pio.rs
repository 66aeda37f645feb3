//! Parallel I/O controller access
//!
//! Resolves a pin name such as `pa28` to the register block of the PIO
//! controller on the attached chip and performs fixed register sequences on
//! it. Three register layouts exist, selected from the chip identifier.

use crate::device::Device;
use crate::error::{Error, Result};
use std::fmt;

/// PIO enable register
pub const PIO_PER: u32 = 0x00;
/// PIO status register
pub const PIO_PSR: u32 = 0x08;
/// Output enable register
pub const PIO_OER: u32 = 0x10;
/// Output disable register
pub const PIO_ODR: u32 = 0x14;
/// Output status register
pub const PIO_OSR: u32 = 0x18;
/// Set output data register
pub const PIO_SODR: u32 = 0x30;
/// Clear output data register
pub const PIO_CODR: u32 = 0x34;
/// Output data status register
pub const PIO_ODSR: u32 = 0x38;
/// Pin data status register
pub const PIO_PDSR: u32 = 0x3c;
/// Peripheral A/B select register
pub const PIO_ABSR: u32 = 0x70;

/// PIO controller port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    /// Port A
    A,
    /// Port B
    B,
    /// Port C
    C,
}

impl Port {
    fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'a' => Some(Port::A),
            'b' => Some(Port::B),
            'c' => Some(Port::C),
            _ => None,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Port::A => 'a',
            Port::B => 'b',
            Port::C => 'c',
        };
        write!(f, "p{}", letter)
    }
}

/// PIO register block layout of a chip family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterLayout {
    /// SAM3U (Cortex-M3 with the PIO block shifted down)
    Sam3u,
    /// Other Cortex-M parts
    CortexM,
    /// ARM7/ARM9 parts
    Legacy,
}

impl RegisterLayout {
    /// Pick the layout from a chip identifier
    pub fn for_chip(chip_id: u32) -> Self {
        let eproc = (chip_id >> 5) & 0x7;
        let arch = (chip_id >> 20) & 0xff;
        match (eproc, arch) {
            (3, 0x80..=0x81) => RegisterLayout::Sam3u,
            (3, _) => RegisterLayout::CortexM,
            _ => RegisterLayout::Legacy,
        }
    }

    /// Base address of the register block for `port`
    pub fn base(&self, port: Port) -> u32 {
        match (self, port) {
            (RegisterLayout::Sam3u, Port::A) => 0x400e_0c00,
            (RegisterLayout::Sam3u, Port::B) => 0x400e_0e00,
            (RegisterLayout::Sam3u, Port::C) => 0x400e_1000,
            (RegisterLayout::CortexM, Port::A) => 0x400e_0e00,
            (RegisterLayout::CortexM, Port::B) => 0x400e_1000,
            (RegisterLayout::CortexM, Port::C) => 0x400e_1200,
            (RegisterLayout::Legacy, Port::A) => 0xffff_f400,
            (RegisterLayout::Legacy, Port::B) => 0xffff_f600,
            (RegisterLayout::Legacy, Port::C) => 0xffff_f800,
        }
    }
}

/// A pin name parsed from the command line, not yet bound to a chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinName {
    /// Controller port
    pub port: Port,
    /// Bit index within the port
    pub bit: u32,
}

/// A pin bound to the register block of the attached chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PioLine {
    /// Controller port
    pub port: Port,
    /// Bit index within the port
    pub bit: u32,
    /// `1 << bit`
    pub mask: u32,
    /// Address of the port's register block
    pub base: u32,
}

impl PioLine {
    /// Bind `pin` to the register block of `layout`
    pub fn resolve(pin: PinName, layout: RegisterLayout) -> Self {
        Self {
            port: pin.port,
            bit: pin.bit,
            mask: 1 << pin.bit,
            base: layout.base(pin.port),
        }
    }

    fn register(&self, offset: u32) -> u32 {
        self.base + offset
    }
}

/// Parse a pin name: `p`, a port letter, then a bit number below 32
pub fn parse_line(token: &str) -> Result<PinName> {
    let invalid = || Error::HardwareDecode("Invalid PIO line name".into());

    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.eq_ignore_ascii_case(&'p') => {}
        _ => return Err(invalid()),
    }
    let port = chars.next().and_then(Port::from_letter).ok_or_else(invalid)?;

    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let bit: u32 = digits
        .parse()
        .map_err(|_| Error::HardwareDecode("Invalid PIO line number".into()))?;
    if bit >= 32 {
        return Err(Error::HardwareDecode("Invalid PIO line number".into()));
    }

    Ok(PinName { port, bit })
}

/// Operation performed on a PIO line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PioOp {
    /// Report configuration and state of the line
    Detail,
    /// Drive the output high
    High,
    /// Drive the output low
    Low,
    /// Read the pin level
    Status,
    /// Make the line an input
    Input,
}

impl PioOp {
    const NAMES: [(&'static str, PioOp); 5] = [
        ("detail", PioOp::Detail),
        ("high", PioOp::High),
        ("low", PioOp::Low),
        ("status", PioOp::Status),
        ("input", PioOp::Input),
    ];

    /// Parse an operation from any non-empty prefix of its name
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.to_ascii_lowercase();
        if !token.is_empty() {
            for (name, op) in Self::NAMES {
                if name.starts_with(&token) {
                    return Ok(op);
                }
            }
        }
        Err(Error::HardwareDecode("Invalid PIO operation".into()))
    }
}

/// Observed state of a line, as reported by [`PioOp::Detail`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDetail {
    /// The PIO controller drives the line
    Pio {
        /// Output driver enabled; `Some(level)` with the driven level
        output: Option<bool>,
        /// Level sensed on the pin
        pin_high: bool,
    },
    /// A peripheral drives the line
    Peripheral {
        /// Peripheral A selected (B otherwise)
        select_a: bool,
    },
}

impl fmt::Display for LineDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = |high: bool| if high { "high" } else { "low" };
        match *self {
            LineDetail::Pio { output, pin_high } => {
                writeln!(f, "PIO Status    : PIO")?;
                match output {
                    Some(driven) => {
                        writeln!(f, "Output Status : output")?;
                        writeln!(f, "Output Data   : {}", level(driven))?;
                    }
                    None => writeln!(f, "Output Status : input")?,
                }
                writeln!(f, "Pin Data      : {}", level(pin_high))
            }
            LineDetail::Peripheral { select_a } => {
                writeln!(f, "PIO Status    : periph")?;
                writeln!(f, "Periph Select : {}", if select_a { "A" } else { "B" })
            }
        }
    }
}

/// Outcome of a PIO operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PioReport {
    /// Line configuration
    Detail(LineDetail),
    /// Pin level (`true` = high)
    Status(bool),
    /// Write-only operation finished
    Done,
}

/// Run `op` against `line`
pub fn execute(device: &mut dyn Device, line: &PioLine, op: PioOp) -> Result<PioReport> {
    let mask = line.mask;
    log::debug!("{:?} on {}{} at 0x{:08x}", op, line.port, line.bit, line.base);

    match op {
        PioOp::Detail => {
            let controlled = device.read_word(line.register(PIO_PSR))? & mask != 0;
            let detail = if controlled {
                let output = if device.read_word(line.register(PIO_OSR))? & mask != 0 {
                    Some(device.read_word(line.register(PIO_ODSR))? & mask != 0)
                } else {
                    None
                };
                let pin_high = device.read_word(line.register(PIO_PDSR))? & mask != 0;
                LineDetail::Pio { output, pin_high }
            } else {
                let select_a = device.read_word(line.register(PIO_ABSR))? & mask != 0;
                LineDetail::Peripheral { select_a }
            };
            Ok(PioReport::Detail(detail))
        }
        PioOp::High | PioOp::Low => {
            let set = if op == PioOp::High { PIO_SODR } else { PIO_CODR };
            device.write_word(line.register(set), mask)?;
            device.write_word(line.register(PIO_OER), mask)?;
            device.write_word(line.register(PIO_PER), mask)?;
            Ok(PioReport::Done)
        }
        PioOp::Status => {
            let high = device.read_word(line.register(PIO_PDSR))? & mask != 0;
            Ok(PioReport::Status(high))
        }
        PioOp::Input => {
            device.write_word(line.register(PIO_ODR), mask)?;
            device.write_word(line.register(PIO_PER), mask)?;
            Ok(PioReport::Done)
        }
    }
}
