//! Streaming between device memory and host files

use super::{BarProgress, Command, Context, Registry};
use rbossa_core::args::{check_span, parse_u32, Arity};
use rbossa_core::transfer;
use rbossa_core::Result;
use std::io::Write;
use std::path::Path;

/// Register the file transfer commands
pub fn register(registry: &mut Registry) {
    registry.register(Box::new(Mrf));
    registry.register(Box::new(Mwf));
}

struct Mrf;

impl Command for Mrf {
    fn name(&self) -> &'static str {
        "mrf"
    }

    fn help(&self) -> &'static str {
        "Read memory to file."
    }

    fn usage(&self) -> &'static str {
        "mrf [ADDRESS] [COUNT] [FILE]\n  ADDRESS -- memory address to read\n  COUNT -- count of bytes to read\n  FILE -- file name on host filesystem to write"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let addr = parse_u32(args[0])?;
        let count = parse_u32(args[1])?;
        let path = Path::new(args[2]);
        check_span(addr, count)?;

        let device = ctx.session.device()?;
        let report =
            transfer::read_to_file(device, addr, count, path, &mut BarProgress::new())?;
        writeln!(
            ctx.console,
            "Read {} bytes from address {:08x}",
            report.bytes, report.address
        )?;
        Ok(())
    }
}

struct Mwf;

impl Command for Mwf {
    fn name(&self) -> &'static str {
        "mwf"
    }

    fn help(&self) -> &'static str {
        "Write memory from file."
    }

    fn usage(&self) -> &'static str {
        "mwf [ADDRESS] [FILE]\n  ADDRESS -- memory address to write\n  FILE -- file name on host filesystem to read"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let addr = parse_u32(args[0])?;
        let path = Path::new(args[1]);

        let device = ctx.session.device()?;
        let report = transfer::write_from_file(device, addr, path, &mut BarProgress::new())?;
        writeln!(
            ctx.console,
            "Wrote {} bytes to address {:08x}",
            report.bytes, report.address
        )?;
        Ok(())
    }
}
