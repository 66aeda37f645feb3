//! SAM-BA monitor device implementation
//!
//! Commands are ASCII strings terminated by `#`. After the `N#` mode switch
//! the monitor answers reads with raw little-endian binary.

use crate::error::{Result, SambaError};
use crate::transport::Transport;
use rbossa_core::{Device, Result as CoreResult};
use std::time::Duration;

/// Largest block moved by one `R`/`S` command
pub const MAX_BLOCK: usize = 4096;

/// Reply to the `N#` mode switch
const MODE_ACK: &[u8] = b"\n\r";

const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(200);

/// Chip identification register on ARM7/ARM9 parts
const CHIPID_LEGACY: u32 = 0xffff_f240;
/// Chip identification register on most Cortex-M parts
const CHIPID_CORTEX: u32 = 0x400e_0740;
/// Chip identification register on later Cortex-M parts
const CHIPID_CORTEX_ALT: u32 = 0x400e_0940;

/// Connection to a SAM-BA boot monitor
pub struct Samba<T: Transport> {
    transport: T,
    version: String,
    debug: bool,
}

impl<T: Transport> Samba<T> {
    /// Switch the monitor to binary mode and read its version
    pub fn new(transport: T) -> Result<Self> {
        let mut samba = Self {
            transport,
            version: String::new(),
            debug: false,
        };

        samba.send("N#")?;
        let mut ack = [0u8; 2];
        let len = samba.read_reply(&mut ack)?;
        if len == 0 {
            return Err(SambaError::NoResponse);
        }
        if &ack[..len] != MODE_ACK {
            return Err(SambaError::InvalidResponse {
                command: "N#".into(),
                response: ack[..len].to_vec(),
            });
        }
        log::debug!("samba: Binary mode enabled");

        samba.send("V#")?;
        let mut version = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            let n = samba.read_reply(&mut buf)?;
            if n == 0 {
                break;
            }
            version.extend_from_slice(&buf[..n]);
        }
        samba.version = String::from_utf8_lossy(&version)
            .trim_end_matches(['\n', '\r', '>'])
            .trim()
            .to_string();
        log::info!("samba: Monitor version \"{}\"", samba.version);

        Ok(samba)
    }

    /// Version string reported by the monitor
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Release the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn read_reply(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            let n = self
                .transport
                .read_some(&mut buf[total..], HANDSHAKE_TIMEOUT)?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    fn send(&mut self, cmd: &str) -> Result<()> {
        if self.debug {
            log::info!("samba: >> {}", cmd);
        } else {
            log::trace!("samba: >> {}", cmd);
        }
        self.transport.write(cmd.as_bytes())?;
        self.transport.flush()
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<()> {
        self.transport.read(buf)?;
        if self.debug {
            log::info!("samba: << {} bytes", buf.len());
        }
        Ok(())
    }
}

impl<T: Transport> Device for Samba<T> {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> CoreResult<()> {
        let mut at = addr;
        for chunk in buf.chunks_mut(MAX_BLOCK) {
            self.send(&format!("R{:08X},{:08X}#", at, chunk.len()))?;
            self.receive(chunk)?;
            at = at.wrapping_add(chunk.len() as u32);
        }
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> CoreResult<()> {
        let mut at = addr;
        for chunk in data.chunks(MAX_BLOCK) {
            self.send(&format!("S{:08X},{:08X}#", at, chunk.len()))?;
            self.transport.write(chunk)?;
            self.transport.flush()?;
            at = at.wrapping_add(chunk.len() as u32);
        }
        Ok(())
    }

    fn read_byte(&mut self, addr: u32) -> CoreResult<u8> {
        self.send(&format!("o{:08X},4#", addr))?;
        let mut buf = [0u8; 1];
        self.receive(&mut buf)?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> CoreResult<()> {
        self.send(&format!("O{:08X},{:02X}#", addr, value))?;
        Ok(())
    }

    fn read_word(&mut self, addr: u32) -> CoreResult<u32> {
        self.send(&format!("w{:08X},4#", addr))?;
        let mut buf = [0u8; 4];
        self.receive(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn write_word(&mut self, addr: u32, value: u32) -> CoreResult<()> {
        self.send(&format!("W{:08X},{:08X}#", addr, value))?;
        Ok(())
    }

    fn chip_id(&mut self) -> CoreResult<u32> {
        // ARM7/9 parts start with a branch instruction in the vector table
        let vector = self.read_word(0)?;
        let cid = if vector & 0xff00_0000 == 0xea00_0000 {
            self.read_word(CHIPID_LEGACY)?
        } else {
            match self.read_word(CHIPID_CORTEX)? {
                0 => self.read_word(CHIPID_CORTEX_ALT)?,
                cid => cid,
            }
        };
        log::debug!("samba: Chip ID {:08x}", cid);
        Ok(cid)
    }

    fn go(&mut self, addr: u32) -> CoreResult<()> {
        self.send(&format!("G{:08X}#", addr))?;
        Ok(())
    }

    fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }
}
