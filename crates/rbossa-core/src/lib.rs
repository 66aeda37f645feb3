//! rbossa-core - Core library for programming SAM-BA monitor targets
//!
//! This crate holds everything the `rbossa` shell needs that does not depend
//! on a particular transport:
//!
//! - [`device`] - the collaborator traits (`Device`, `Connector`, `PortSource`,
//!   `FlashFactory`, `FlashCapability`) that backends implement
//! - [`session`] - connection state and command gating
//! - [`args`] - number parsing and arity contracts for shell arguments
//! - [`transfer`] - chunked streaming between device memory and host files
//! - [`format`] - hex dumps and binary strings for diagnostic output
//! - [`pio`] - PIO line decoding and register-level pin operations
//! - [`disasm`] - the disassembler seam used by the `disass` command
//!
//! # Example
//!
//! ```ignore
//! use rbossa_core::{format, transfer, Device};
//!
//! fn show_vectors(device: &mut dyn Device) -> rbossa_core::Result<()> {
//!     let mut buf = [0u8; 64];
//!     device.read(0, &mut buf)?;
//!     print!("{}", format::hex_dump(0, &buf));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod args;
pub mod device;
pub mod disasm;
pub mod error;
pub mod format;
pub mod pio;
pub mod session;
pub mod transfer;

pub use device::{
    Connector, Device, FlashCapability, FlashDriver, FlashFactory, FlashInfo, FlashRegistry,
    PortSource, VerifyReport,
};
pub use error::{Error, Result};
pub use session::{Attached, Session};
