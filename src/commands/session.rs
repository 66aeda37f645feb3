//! Commands that manage the shell and its connection

use super::{Command, Context, Registry};
use rbossa_core::args::Arity;
use rbossa_core::{Attached, Error, Result};
use std::io::Write;

/// Register the session commands
pub fn register(registry: &mut Registry) {
    registry.register(Box::new(Connect));
    registry.register(Box::new(Scan));
    registry.register(Box::new(Debug));
    registry.register(Box::new(Exit));
    registry.register(Box::new(Help));
    registry.register(Box::new(History));
}

/// Report what was found on a freshly attached device
fn report_attached(ctx: &mut Context<'_>, attached: &Attached) -> Result<()> {
    match (attached.chip_id, &attached.flash) {
        (Some(id), Some(flash)) => writeln!(ctx.console, "Chip ID {:08x}, flash {}", id, flash)?,
        (Some(id), None) => writeln!(ctx.console, "Flash for chip ID {:08x} is not supported", id)?,
        (None, _) => writeln!(ctx.console, "Unable to read the chip ID; flash is not available")?,
    }
    Ok(())
}

struct Connect;

impl Command for Connect {
    fn name(&self) -> &'static str {
        "connect"
    }

    fn help(&self) -> &'static str {
        "Connect to device over serial port."
    }

    fn usage(&self) -> &'static str {
        "connect [PORT]\n  PORT -- host-specific serial port"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let port = args[0];
        match ctx.session.connect(port)? {
            Some(attached) => {
                writeln!(ctx.console, "Connected to device on {}", port)?;
                report_attached(ctx, &attached)
            }
            None => {
                writeln!(ctx.console, "No device found on {}", port)?;
                Ok(())
            }
        }
    }
}

struct Scan;

impl Command for Scan {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn help(&self) -> &'static str {
        "Scan all serial ports for a device."
    }

    fn usage(&self) -> &'static str {
        "scan"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn invoke(&self, _args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        match ctx.session.scan()? {
            Some((port, attached)) => {
                writeln!(ctx.console, "Device found on {}", port)?;
                report_attached(ctx, &attached)
            }
            None => {
                writeln!(
                    ctx.console,
                    "Auto scan for device failed.\n\
                     Try specifying a serial port with the \"connect\" command."
                )?;
                Ok(())
            }
        }
    }
}

struct Debug;

impl Command for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn help(&self) -> &'static str {
        "Change the debug state."
    }

    fn usage(&self) -> &'static str {
        "debug [STATE]\n  STATE -- either \"off\" or \"on\""
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let state = if args[0].eq_ignore_ascii_case("on") {
            true
        } else if args[0].eq_ignore_ascii_case("off") {
            false
        } else {
            return Err(Error::Usage(
                "Invalid debug state - must be \"off\" or \"on\"".into(),
            ));
        };
        ctx.session.set_debug(state);
        Ok(())
    }
}

struct Exit;

impl Command for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn help(&self) -> &'static str {
        "Exit the shell."
    }

    fn usage(&self) -> &'static str {
        "exit"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn invoke(&self, _args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        ctx.exit = true;
        Ok(())
    }
}

struct Help;

impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn help(&self) -> &'static str {
        "Display help for a command."
    }

    fn usage(&self) -> &'static str {
        "help <COMMAND>\n  COMMAND -- (optional) display detailed usage for this command,\n             display summary help for all commands if not given"
    }

    fn arity(&self) -> Arity {
        Arity::Range(0, 1)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        match args.first() {
            None => {
                for command in ctx.registry.iter() {
                    writeln!(ctx.console, "{:<8} -- {}", command.name(), command.help())?;
                }
            }
            Some(name) => {
                let command = ctx.registry.lookup(name)?;
                writeln!(ctx.console, "{}", command.usage())?;
            }
        }
        Ok(())
    }
}

struct History;

impl Command for History {
    fn name(&self) -> &'static str {
        "history"
    }

    fn help(&self) -> &'static str {
        "List the command history."
    }

    fn usage(&self) -> &'static str {
        "history"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn invoke(&self, _args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        for (i, line) in ctx.console.history().iter().enumerate() {
            writeln!(ctx.console, "  {}  {}", i + 1, line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::console::Console;

    #[test]
    fn test_connect_and_report() {
        let mut harness = Harness::new(dummy_session());
        let out = harness.output("connect dummy0");
        assert_eq!(
            out,
            "Connected to device on dummy0\nChip ID 270b0940, flash at91sam7s256\n"
        );
        assert!(harness.session.is_flashable());

        let out = harness.output("connect ttyUSB9");
        assert_eq!(out, "No device found on ttyUSB9\n");
        assert!(!harness.session.is_connected());
    }

    #[test]
    fn test_connect_unsupported_chip() {
        let (session, _) = recording_session();
        let mut harness = Harness::new(session);
        let out = harness.output("connect port");
        assert!(out.ends_with("Flash for chip ID 270b0940 is not supported\n"));
        assert!(harness.session.is_connected());
        assert!(!harness.session.is_flashable());
    }

    #[test]
    fn test_scan() {
        let mut harness = Harness::new(dummy_session());
        let out = harness.output("scan");
        assert!(out.starts_with("Device found on dummy0\n"));

        let (session, _) = recording_session();
        let mut harness = Harness::new(session);
        let out = harness.output("scan");
        assert!(out.starts_with("Auto scan for device failed."));
    }

    #[test]
    fn test_debug_states() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.output("debug ON");
        assert!(harness.session.debug());
        harness.output("connect port");
        assert_eq!(calls.borrow()[0], "set_debug true");
        harness.output("debug off");
        assert!(!harness.session.debug());

        let err = harness.run("debug maybe").unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_help() {
        let (session, _) = recording_session();
        let mut harness = Harness::new(session);
        let out = harness.output("help");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 23);
        assert_eq!(lines[0], "connect  -- Connect to device over serial port.");

        let out = harness.output("help mrb");
        assert!(out.starts_with("mrb [ADDRESS] <COUNT>"));

        assert!(matches!(
            harness.run("help nope"),
            Err(Error::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_history_and_exit() {
        let (session, _) = recording_session();
        let mut harness = Harness::new(session);
        harness.console.add_history("mrb 0");
        harness.console.add_history("help");
        assert_eq!(harness.output("history"), "  1  mrb 0\n  2  help\n");

        let mut ctx = Context {
            session: &mut harness.session,
            console: &mut harness.console,
            registry: &harness.registry,
            exit: false,
        };
        harness.registry.dispatch(&["exit"], &mut ctx).unwrap();
        assert!(ctx.exit);
    }
}
