//! Instruction listing for the `disass` command

use std::fmt;

/// One decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Address of the first byte
    pub address: u32,
    /// Raw encoding
    pub bytes: Vec<u8>,
    /// Assembly text
    pub text: String,
}

impl Instruction {
    /// Create a new instruction
    pub fn new(address: u32, bytes: Vec<u8>, text: String) -> Self {
        Self {
            address,
            bytes,
            text,
        }
    }

    /// Raw encoding as space separated hex bytes
    pub fn hex_bytes(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:  {:<12} {}", self.address, self.hex_bytes(), self.text)
    }
}

/// Turns target memory into an instruction listing
pub trait Disassembler {
    /// Decode `data`, located at `address`, as ARM or Thumb code
    fn disassemble(&self, data: &[u8], address: u32, thumb: bool) -> Vec<Instruction>;
}

/// Listing of raw little-endian units
///
/// Emits one `.word` per 4 bytes in ARM state and one `.short` per 2 bytes in
/// Thumb state. A trailing partial unit is listed as `.byte`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawDisassembler;

impl Disassembler for RawDisassembler {
    fn disassemble(&self, data: &[u8], address: u32, thumb: bool) -> Vec<Instruction> {
        let unit = if thumb { 2 } else { 4 };
        let mut listing = Vec::with_capacity(data.len() / unit + 1);

        let mut chunks = data.chunks_exact(unit);
        let mut addr = address;
        for chunk in &mut chunks {
            let text = if thumb {
                format!(".short 0x{:04x}", u16::from_le_bytes([chunk[0], chunk[1]]))
            } else {
                format!(
                    ".word 0x{:08x}",
                    u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
                )
            };
            listing.push(Instruction::new(addr, chunk.to_vec(), text));
            addr = addr.wrapping_add(unit as u32);
        }

        for &byte in chunks.remainder() {
            listing.push(Instruction::new(addr, vec![byte], format!(".byte 0x{:02x}", byte)));
            addr = addr.wrapping_add(1);
        }

        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_words() {
        let data = [0x1e, 0xff, 0x2f, 0xe1, 0x00, 0x00, 0xa0, 0xe1];
        let listing = RawDisassembler.disassemble(&data, 0x2000_0000, false);
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].text, ".word 0xe12fff1e");
        assert_eq!(listing[1].address, 0x2000_0004);
        assert_eq!(
            listing[0].to_string(),
            "20000000:  1e ff 2f e1  .word 0xe12fff1e"
        );
    }

    #[test]
    fn test_thumb_halfwords_with_tail() {
        let data = [0x70, 0x47, 0x00, 0xbf, 0xaa];
        let listing = RawDisassembler.disassemble(&data, 0x100, true);
        let texts: Vec<&str> = listing.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec![".short 0x4770", ".short 0xbf00", ".byte 0xaa"]);
        assert_eq!(listing[2].address, 0x104);
    }

    #[test]
    fn test_empty() {
        assert!(RawDisassembler.disassemble(&[], 0, false).is_empty());
    }
}
