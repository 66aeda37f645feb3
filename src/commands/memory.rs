//! Raw memory access commands

use super::{Command, Context, Registry};
use rbossa_core::args::{check_span, parse_u32, Arity};
use rbossa_core::disasm::{Disassembler, RawDisassembler};
use rbossa_core::format::{bin_str, hex_rows, HEX_HEADER};
use rbossa_core::transfer::CHUNK_SIZE;
use rbossa_core::{Device, Error, Result};
use std::io::Write;

/// Register the memory commands
pub fn register(registry: &mut Registry) {
    registry.register(Box::new(Dump));
    registry.register(Box::new(Disass::new(Box::new(RawDisassembler))));
    registry.register(Box::new(Go));
    registry.register(Box::new(Mrb));
    registry.register(Box::new(Mrw));
    registry.register(Box::new(Mwb));
    registry.register(Box::new(Mww));
}

/// Read `count` bytes at `addr` a chunk at a time, handing each to `each`
///
/// The first chunk is shortened by `align_to` so that every later chunk
/// starts on a multiple of it.
fn for_each_chunk(
    device: &mut dyn Device,
    addr: u32,
    count: u32,
    align_to: u32,
    mut each: impl FnMut(u32, &[u8]) -> Result<()>,
) -> Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut at = addr;
    let mut remaining = count;
    let mut piece = CHUNK_SIZE as u32 - addr % align_to;
    while remaining > 0 {
        let len = remaining.min(piece);
        let chunk = &mut buf[..len as usize];
        device.read(at, chunk)?;
        each(at, chunk)?;
        at = at.wrapping_add(len);
        remaining -= len;
        piece = CHUNK_SIZE as u32;
    }
    Ok(())
}

/// Parse an optional count argument, defaulting to 1
fn count_arg(args: &[&str], index: usize) -> Result<u32> {
    args.get(index).map_or(Ok(1), |token| parse_u32(token))
}

/// Values to write: the one given, or whatever the user types at `? `
///
/// Prompting stops at an empty line or end of input.
fn next_value(ctx: &mut Context<'_>, given: Option<u32>, first: bool) -> Result<Option<u32>> {
    if given.is_some() {
        return Ok(if first { given } else { None });
    }
    match ctx.console.read_line("? ")? {
        Some(line) if !line.trim().is_empty() => parse_u32(line.trim()).map(Some),
        _ => Ok(None),
    }
}

struct Dump;

impl Command for Dump {
    fn name(&self) -> &'static str {
        "dump"
    }

    fn help(&self) -> &'static str {
        "Dump memory in hexadecimal and ascii."
    }

    fn usage(&self) -> &'static str {
        "dump [ADDRESS] [COUNT]\n  ADDRESS -- starting memory address\n  COUNT -- count of bytes to display"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let addr = parse_u32(args[0])?;
        let count = parse_u32(args[1])?;
        check_span(addr, count)?;

        let device = ctx.session.device()?;
        let console = &mut *ctx.console;
        write!(console, "{}", HEX_HEADER)?;
        // Rows are 16 bytes; keep every chunk after the first row aligned
        for_each_chunk(device, addr, count, 16, |at, chunk| {
            write!(console, "{}", hex_rows(at, chunk))?;
            Ok(())
        })
    }
}

/// `disass`, decoding through a pluggable [`Disassembler`]
pub struct Disass {
    disassembler: Box<dyn Disassembler>,
}

impl Disass {
    /// Create the command around `disassembler`
    pub fn new(disassembler: Box<dyn Disassembler>) -> Self {
        Self { disassembler }
    }
}

impl Command for Disass {
    fn name(&self) -> &'static str {
        "disass"
    }

    fn help(&self) -> &'static str {
        "Disassemble ARM code at memory address."
    }

    fn usage(&self) -> &'static str {
        "disass [ADDRESS] [COUNT]\n  ADDRESS -- starting memory address, thumb mode if not word aligned\n  COUNT -- count of bytes to disassemble"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let addr = parse_u32(args[0])?;
        let count = parse_u32(args[1])?;
        let start = addr & !1;
        let thumb = addr & 3 != 0;
        check_span(start, count)?;

        let device = ctx.session.device()?;
        let console = &mut *ctx.console;
        // Chunks end on word boundaries so no instruction is split
        for_each_chunk(device, start, count, 4, |at, chunk| {
            for insn in self.disassembler.disassemble(chunk, at, thumb) {
                writeln!(console, "{}", insn)?;
            }
            Ok(())
        })
    }
}

struct Go;

impl Command for Go {
    fn name(&self) -> &'static str {
        "go"
    }

    fn help(&self) -> &'static str {
        "Execute ARM code at address."
    }

    fn usage(&self) -> &'static str {
        "go [ADDRESS]\n  ADDRESS -- starting memory address of code to execute"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let addr = parse_u32(args[0])?;
        ctx.session.device()?.go(addr)
    }
}

struct Mrb;

impl Command for Mrb {
    fn name(&self) -> &'static str {
        "mrb"
    }

    fn help(&self) -> &'static str {
        "Read bytes from memory."
    }

    fn usage(&self) -> &'static str {
        "mrb [ADDRESS] <COUNT>\n  ADDRESS -- starting memory address\n  COUNT -- (optional) count of bytes to display, 1 if not given"
    }

    fn arity(&self) -> Arity {
        Arity::Range(1, 2)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let mut addr = parse_u32(args[0])?;
        let count = count_arg(args, 1)?;

        let device = ctx.session.device()?;
        for _ in 0..count {
            let value = device.read_byte(addr)?;
            writeln!(
                ctx.console,
                "{:08x} : {:02x}  {}",
                addr,
                value,
                bin_str(value as u32, 8)
            )?;
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }
}

struct Mrw;

impl Command for Mrw {
    fn name(&self) -> &'static str {
        "mrw"
    }

    fn help(&self) -> &'static str {
        "Read words from memory."
    }

    fn usage(&self) -> &'static str {
        "mrw [ADDRESS] <COUNT>\n  ADDRESS -- starting memory address\n  COUNT -- (optional) count of words to display, 1 if not given"
    }

    fn arity(&self) -> Arity {
        Arity::Range(1, 2)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let mut addr = parse_u32(args[0])?;
        let count = count_arg(args, 1)?;

        let device = ctx.session.device()?;
        for _ in 0..count {
            let value = device.read_word(addr)?;
            writeln!(
                ctx.console,
                "{:08x} : {:08x}  {}",
                addr,
                value,
                bin_str(value, 32)
            )?;
            addr = addr.wrapping_add(4);
        }
        Ok(())
    }
}

struct Mwb;

impl Command for Mwb {
    fn name(&self) -> &'static str {
        "mwb"
    }

    fn help(&self) -> &'static str {
        "Write bytes to memory."
    }

    fn usage(&self) -> &'static str {
        "mwb [ADDRESS] <VALUE>\n  ADDRESS -- starting memory address\n  VALUE -- (optional) value of byte to write, if not given\n           command will repeatedly prompt for input"
    }

    fn arity(&self) -> Arity {
        Arity::Range(1, 2)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let mut addr = parse_u32(args[0])?;
        let given = args.get(1).map(|token| parse_u32(token)).transpose()?;
        let to_byte = |value: u32| {
            u8::try_from(value).map_err(|_| Error::OutOfRange(format!("Byte value {}", value)))
        };
        if let Some(value) = given {
            to_byte(value)?;
        }
        ctx.session.device()?;

        let mut first = true;
        while let Some(value) = next_value(ctx, given, first)? {
            first = false;
            let byte = to_byte(value)?;
            ctx.session.device()?.write_byte(addr, byte)?;
            writeln!(ctx.console, "{:08x} : {:02x}", addr, byte)?;
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }
}

struct Mww;

impl Command for Mww {
    fn name(&self) -> &'static str {
        "mww"
    }

    fn help(&self) -> &'static str {
        "Write words to memory."
    }

    fn usage(&self) -> &'static str {
        "mww [ADDRESS] <VALUE>\n  ADDRESS -- starting memory address\n  VALUE -- (optional) value of word to write, if not given\n           command will repeatedly prompt for input"
    }

    fn arity(&self) -> Arity {
        Arity::Range(1, 2)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let mut addr = parse_u32(args[0])?;
        let given = args.get(1).map(|token| parse_u32(token)).transpose()?;
        ctx.session.device()?;

        let mut first = true;
        while let Some(value) = next_value(ctx, given, first)? {
            first = false;
            ctx.session.device()?.write_word(addr, value)?;
            writeln!(ctx.console, "{:08x} : {:08x}", addr, value)?;
            addr = addr.wrapping_add(4);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::console::testing::BufferConsole;

    #[test]
    fn test_dump_unaligned() {
        let mut harness = Harness::connected_dummy();
        harness.output("mww 0x200000 0x6c6c6548");
        let out = harness.output("dump 0x200000 5");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("00200000 | 48 65 6c 6c 00 "));
        assert!(lines[1].ends_with("| Hell.           "));
    }

    #[test]
    fn test_dump_rejects_wrapping_range() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();

        let err = harness.run("dump 0xfffffff0 0x20").unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_dump_reads_in_chunks() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();

        let out = harness.output("dump 0x1003 0x800");
        assert_eq!(
            calls.borrow().as_slice(),
            ["read 00001003 1021", "read 00001400 1024", "read 00001800 3"]
        );
        assert_eq!(out, rbossa_core::format::hex_dump(0x1003, &[0u8; 0x800]));
    }

    #[test]
    fn test_large_dump_never_reads_past_chunk() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();

        let out = harness.output("dump 0x20000008 0x40000");
        let lens: Vec<usize> = calls
            .borrow()
            .iter()
            .map(|call| call.rsplit(' ').next().unwrap().parse().unwrap())
            .collect();
        assert!(lens.iter().all(|&len| len <= CHUNK_SIZE));
        assert_eq!(lens.iter().sum::<usize>(), 0x40000);
        // Header, then one row per 16 bytes plus the split first and last rows
        assert_eq!(out.lines().count(), 1 + 0x40000 / 16 + 1);
        assert!(out.lines().nth(1).unwrap().starts_with("20000000 | "));
    }

    #[test]
    fn test_disass_reads_in_chunks() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();

        let out = harness.output("disass 0x102 0x802");
        assert_eq!(
            calls.borrow().as_slice(),
            ["read 00000102 1022", "read 00000500 1024", "read 00000900 4"]
        );
        // Thumb: one halfword per line
        assert_eq!(out.lines().count(), 0x802 / 2);
        assert!(out.lines().last().unwrap().starts_with("00000902:"));
    }

    #[test]
    fn test_disass_modes() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();

        let out = harness.output("disass 0x103 4");
        assert_eq!(calls.borrow().as_slice(), ["read 00000102 4"]);
        assert_eq!(
            out,
            "00000102:  00 00        .short 0x0000\n00000104:  00 00        .short 0x0000\n"
        );

        let out = harness.output("disass 0x100 4");
        assert_eq!(out, "00000100:  00 00 00 00  .word 0x00000000\n");
    }

    #[test]
    fn test_go() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();
        harness.output("go 0x202000");
        assert_eq!(calls.borrow().as_slice(), ["go 00202000"]);
    }

    #[test]
    fn test_mrb_and_mrw() {
        let mut harness = Harness::connected_dummy();
        harness.output("mwb 0x200000 0xaa");
        harness.output("mwb 0x200001 0x0f");

        let out = harness.output("mrb 0x200000 2");
        assert_eq!(
            out,
            "00200000 : aa  1010 1010\n00200001 : 0f  0000 1111\n"
        );

        let out = harness.output("mrw 0x200000");
        assert_eq!(
            out,
            "00200000 : 00000faa  0000 0000 0000 0000 0000 1111 1010 1010\n"
        );
    }

    #[test]
    fn test_mwb_out_of_range_before_device() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();

        let err = harness.run("mwb 0 256").unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_mwb_prompts_until_empty_line() {
        let mut harness = Harness::connected_dummy();
        harness.console = BufferConsole::with_input(&["1", "0x22", "", "4"]);
        harness.run("mwb 0x200010").unwrap();
        assert_eq!(
            harness.console.take(),
            "? 00200010 : 01\n? 00200011 : 22\n? "
        );
        assert_eq!(harness.console.input.len(), 1);

        let out = harness.output("mrb 0x200011");
        assert!(out.starts_with("00200011 : 22"));
    }

    #[test]
    fn test_mww_prompts_until_end_of_input() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();
        harness.console = BufferConsole::with_input(&["0x12345678", "7"]);

        harness.run("mww 0x100").unwrap();
        assert_eq!(
            calls.borrow().as_slice(),
            ["write_word 00000100 12345678", "write_word 00000104 00000007"]
        );
        assert_eq!(
            harness.console.take(),
            "? 00000100 : 12345678\n? 00000104 : 00000007\n? "
        );
    }

    #[test]
    fn test_prompted_value_out_of_range() {
        let mut harness = Harness::connected_dummy();
        harness.console = BufferConsole::with_input(&["300"]);
        assert!(matches!(
            harness.run("mwb 0x200000"),
            Err(Error::OutOfRange(_))
        ));
    }
}
