//! Diagnostic formatting for memory contents

use std::fmt::Write;

const ROW_SIZE: u32 = 16;
const ROW_MASK: u32 = !(ROW_SIZE - 1);

/// Column header printed above [`hex_rows`] output
pub const HEX_HEADER: &str = "            0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f\n";

/// Render `data`, located at `address`, as a hex and ASCII dump
///
/// Rows always start on a 16-byte boundary. Cells outside the dumped range
/// are left blank, so an unaligned start pads the first row on the left and
/// a short tail pads the last row on the right.
///
/// ```text
///             0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f
/// 00001000 |          48 65 6c 6c 6f                         |    Hello
/// ```
pub fn hex_dump(address: u32, data: &[u8]) -> String {
    let mut out = String::from(HEX_HEADER);
    out.push_str(&hex_rows(address, data));
    out
}

/// Render the rows of a hex dump without the header
///
/// Large ranges can be rendered piecewise: as long as every piece after the
/// first starts on a 16-byte boundary, concatenating the pieces gives the
/// same rows as rendering the whole range at once.
pub fn hex_rows(address: u32, data: &[u8]) -> String {
    let mut out = String::new();
    let mut addr = address;
    let mut rest = data;
    while !rest.is_empty() {
        let lpad = (addr % ROW_SIZE) as usize;
        let size = rest.len().min(ROW_SIZE as usize - lpad);
        let rpad = ROW_SIZE as usize - lpad - size;
        let (row, tail) = rest.split_at(size);

        let _ = write!(out, "{:08x} | ", addr & ROW_MASK);
        out.push_str(&" ".repeat(3 * lpad));
        for byte in row {
            let _ = write!(out, "{:02x} ", byte);
        }
        out.push_str(&" ".repeat(3 * rpad));

        out.push_str("| ");
        out.push_str(&" ".repeat(lpad));
        out.extend(row.iter().map(|&b| printable(b)));
        out.push_str(&" ".repeat(rpad));
        out.push('\n');

        addr = addr.wrapping_add(size as u32);
        rest = tail;
    }

    out
}

fn printable(byte: u8) -> char {
    if (0x20..=0x7e).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

/// Render the low `bits` bits of `value` as a binary string, MSB first
///
/// Digits are grouped in nibbles counted from the least significant bit:
/// `bin_str(0xAA, 8)` is `"1010 1010"`.
///
/// # Panics
///
/// Panics if `bits` is not in `1..=32`.
pub fn bin_str(value: u32, bits: u32) -> String {
    assert!((1..=32).contains(&bits), "bit count {} out of range", bits);

    let mut out = String::with_capacity(bits as usize + bits as usize / 4);
    for bit in (0..bits).rev() {
        out.push(if value & (1 << bit) != 0 { '1' } else { '0' });
        if bit % 4 == 0 && bit != 0 {
            out.push(' ');
        }
    }
    out
}
