//! Flash driver commands

use super::{BarProgress, Command, Context, Registry};
use rbossa_core::args::{parse_u32, Arity};
use rbossa_core::{Error, FlashInfo, Result};
use std::io::Write as _;
use std::path::Path;

/// Register the flash commands
pub fn register(registry: &mut Registry) {
    registry.register(Box::new(Erase));
    registry.register(Box::new(Info));
    registry.register(Box::new(Lock { lock: true }));
    registry.register(Box::new(Lock { lock: false }));
    registry.register(Box::new(Read));
    registry.register(Box::new(Verify));
    registry.register(Box::new(Write));
}

struct Erase;

impl Command for Erase {
    fn name(&self) -> &'static str {
        "erase"
    }

    fn help(&self) -> &'static str {
        "Erase the entire flash."
    }

    fn usage(&self) -> &'static str {
        "erase"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn invoke(&self, _args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let (flash, device) = ctx.session.flash()?;
        flash.erase(device)?;
        writeln!(ctx.console, "Flash erased")?;
        Ok(())
    }
}

struct Info;

fn print_info<W: std::io::Write + ?Sized>(out: &mut W, info: &FlashInfo) -> std::io::Result<()> {
    let locked: Vec<String> = info
        .lock_regions
        .iter()
        .enumerate()
        .filter(|(_, locked)| **locked)
        .map(|(i, _)| i.to_string())
        .collect();

    writeln!(out, "Device       : {}", info.name)?;
    writeln!(out, "Chip ID      : {:08x}", info.chip_id)?;
    writeln!(out, "Flash base   : 0x{:08x}", info.base)?;
    writeln!(out, "Pages        : {}", info.pages)?;
    writeln!(out, "Page size    : {} bytes", info.page_size)?;
    writeln!(out, "Total size   : {} KB", info.size() / 1024)?;
    writeln!(out, "Lock regions : {}", info.lock_regions.len())?;
    if locked.is_empty() {
        writeln!(out, "Locked       : none")?;
    } else {
        writeln!(out, "Locked       : {}", locked.join(","))?;
    }
    writeln!(out, "Security     : {}", info.security)
}

impl Command for Info {
    fn name(&self) -> &'static str {
        "info"
    }

    fn help(&self) -> &'static str {
        "Display information about the flash."
    }

    fn usage(&self) -> &'static str {
        "info"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn invoke(&self, _args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let (flash, device) = ctx.session.flash()?;
        let info = flash.info(device)?;
        print_info(&mut *ctx.console, &info)?;
        Ok(())
    }
}

/// `lock` and `unlock`
struct Lock {
    lock: bool,
}

impl Command for Lock {
    fn name(&self) -> &'static str {
        if self.lock {
            "lock"
        } else {
            "unlock"
        }
    }

    fn help(&self) -> &'static str {
        if self.lock {
            "Set lock bits in the flash."
        } else {
            "Clear lock bits in the flash."
        }
    }

    fn usage(&self) -> &'static str {
        if self.lock {
            "lock <BITS>\n  BITS -- (optional) comma separated list of bits,\n          all bits if not given"
        } else {
            "unlock <BITS>\n  BITS -- (optional) comma separated list of bits,\n          all bits if not given"
        }
    }

    fn arity(&self) -> Arity {
        Arity::Any
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        // "lock 1, 2" arrives split; rejoin before splitting on commas
        let bits = args.concat();
        let (flash, device) = ctx.session.flash()?;
        flash.lock(device, &bits, self.lock)
    }
}

struct Read;

impl Command for Read {
    fn name(&self) -> &'static str {
        "read"
    }

    fn help(&self) -> &'static str {
        "Read flash into a binary file."
    }

    fn usage(&self) -> &'static str {
        "read [FILE] <COUNT>\n  FILE -- file name on host filesystem\n  COUNT -- (optional) count of bytes to read, defaults\n           to entire flash if not given"
    }

    fn arity(&self) -> Arity {
        Arity::Range(1, 2)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let path = Path::new(args[0]);
        let count = args.get(1).map_or(Ok(0), |token| parse_u32(token))?;

        let (flash, device) = ctx.session.flash()?;
        let report = flash.read(device, path, count, &mut BarProgress::new())?;
        writeln!(
            ctx.console,
            "Read {} bytes from flash at {:08x}",
            report.bytes, report.address
        )?;
        Ok(())
    }
}

struct Verify;

impl Command for Verify {
    fn name(&self) -> &'static str {
        "verify"
    }

    fn help(&self) -> &'static str {
        "Verify binary file with the flash."
    }

    fn usage(&self) -> &'static str {
        "verify [FILE]\n  FILE -- file name on host filesystem"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let path = Path::new(args[0]);

        let (flash, device) = ctx.session.flash()?;
        let report = flash.verify(device, path, &mut BarProgress::new())?;
        match report.first_mismatch {
            None => {
                writeln!(ctx.console, "Verified {} bytes", report.bytes)?;
                Ok(())
            }
            Some(first) => Err(Error::Flash(format!(
                "Verify failed: {} of {} bytes differ, first at {:08x}",
                report.mismatches, report.bytes, first
            ))),
        }
    }
}

struct Write;

impl Command for Write {
    fn name(&self) -> &'static str {
        "write"
    }

    fn help(&self) -> &'static str {
        "Write binary file into flash."
    }

    fn usage(&self) -> &'static str {
        "write [FILE]\n  FILE -- file name on host filesystem"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let path = Path::new(args[0]);

        let (flash, device) = ctx.session.flash()?;
        let report = flash.write(device, path, &mut BarProgress::new())?;
        writeln!(
            ctx.console,
            "Wrote {} bytes to flash at {:08x}",
            report.bytes, report.address
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_info() {
        let mut harness = Harness::connected_dummy();
        harness.output("lock 1,3");
        let out = harness.output("info");
        assert_eq!(
            out,
            "Device       : at91sam7s256\n\
             Chip ID      : 270b0940\n\
             Flash base   : 0x00100000\n\
             Pages        : 1024\n\
             Page size    : 256 bytes\n\
             Total size   : 256 KB\n\
             Lock regions : 16\n\
             Locked       : 1,3\n\
             Security     : false\n"
        );
    }

    #[test]
    fn test_lock_arguments_are_joined() {
        let mut harness = Harness::connected_dummy();
        harness.output("lock 0, 2 ,5");
        let out = harness.output("info");
        assert!(out.contains("Locked       : 0,2,5\n"));

        harness.output("unlock 2");
        let out = harness.output("info");
        assert!(out.contains("Locked       : 0,5\n"));

        harness.output("unlock");
        let out = harness.output("info");
        assert!(out.contains("Locked       : none\n"));

        assert!(harness.run("lock 99").unwrap_err().is_usage());
    }

    #[test]
    fn test_write_verify_read() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("image.bin");
        let readback = dir.path().join("readback.bin");
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&image, &data).unwrap();

        let mut harness = Harness::connected_dummy();
        let out = harness.output(&format!("write {}", image.display()));
        assert_eq!(out, "Wrote 5000 bytes to flash at 00100000\n");

        let out = harness.output(&format!("verify {}", image.display()));
        assert_eq!(out, "Verified 5000 bytes\n");

        let out = harness.output(&format!("read {} 5000", readback.display()));
        assert_eq!(out, "Read 5000 bytes from flash at 00100000\n");
        assert_eq!(std::fs::read(&readback).unwrap(), data);

        harness.output(&format!("read {}", readback.display()));
        assert_eq!(std::fs::metadata(&readback).unwrap().len(), 256 * 1024);
    }

    #[test]
    fn test_verify_mismatch_is_error() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("image.bin");
        std::fs::write(&image, [0u8; 16]).unwrap();

        let mut harness = Harness::connected_dummy();
        let err = harness
            .run(&format!("verify {}", image.display()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Flash error: Verify failed: 16 of 16 bytes differ, first at 00100000"
        );
    }

    #[test]
    fn test_locked_region_blocks_write_and_erase() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("image.bin");
        std::fs::write(&image, [0x55u8; 64]).unwrap();

        let mut harness = Harness::connected_dummy();
        harness.output("lock 0");
        assert!(matches!(
            harness.run(&format!("write {}", image.display())),
            Err(Error::Flash(_))
        ));
        assert!(matches!(harness.run("erase"), Err(Error::Flash(_))));

        harness.output("unlock 0");
        harness.output(&format!("write {}", image.display()));
        assert_eq!(harness.output("erase"), "Flash erased\n");
        let out = harness.output("mrb 0x100000");
        assert!(out.starts_with("00100000 : ff"));
    }

    #[test]
    fn test_read_count_parsed_before_gating() {
        let (session, _) = recording_session();
        let mut harness = Harness::new(session);
        assert!(matches!(
            harness.run("read out.bin 12x"),
            Err(Error::InvalidNumber(_))
        ));
    }
}
