//! Pin-level I/O

use super::{Command, Context, Registry};
use rbossa_core::args::Arity;
use rbossa_core::pio::{self, PioLine, PioOp, PioReport, RegisterLayout};
use rbossa_core::Result;
use std::io::Write;

/// Register the `pio` command
pub fn register(registry: &mut Registry) {
    registry.register(Box::new(Pio));
}

struct Pio;

impl Command for Pio {
    fn name(&self) -> &'static str {
        "pio"
    }

    fn help(&self) -> &'static str {
        "Parallel input/output operations."
    }

    fn usage(&self) -> &'static str {
        "pio [LINE] [OPERATION]\n\
         \x20 LINE -- PIO line name (i.e. pa28, pc5, etc.)\n\
         \x20 OPERATION -- operation to perform on the PIO line.  One of the following:\n\
         \x20   detail -- detail about the line\n\
         \x20   high -- drive the output high\n\
         \x20   low -- drive the output low\n\
         \x20   status -- read the input status\n\
         \x20   input -- make the line an input"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let pin = pio::parse_line(args[0])?;
        let op = PioOp::parse(args[1])?;

        let device = ctx.session.device()?;
        let layout = RegisterLayout::for_chip(device.chip_id()?);
        let line = PioLine::resolve(pin, layout);

        match pio::execute(device, &line, op)? {
            PioReport::Detail(detail) => write!(ctx.console, "{}", detail)?,
            PioReport::Status(high) => {
                writeln!(ctx.console, "{}", if high { "high" } else { "low" })?
            }
            PioReport::Done => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use rbossa_core::Error;

    #[test]
    fn test_drive_and_inspect_line() {
        let mut harness = Harness::connected_dummy();
        assert_eq!(
            harness.output("pio pa3 detail"),
            "PIO Status    : periph\nPeriph Select : B\n"
        );

        assert_eq!(harness.output("pio pa3 h"), "");
        assert_eq!(
            harness.output("pio pa3 detail"),
            "PIO Status    : PIO\n\
             Output Status : output\n\
             Output Data   : high\n\
             Pin Data      : high\n"
        );
        assert_eq!(harness.output("pio pa3 st"), "high\n");

        harness.output("pio pa3 low");
        assert_eq!(harness.output("pio pa3 status"), "low\n");

        harness.output("pio pa3 input");
        assert_eq!(
            harness.output("pio PA3 DETAIL"),
            "PIO Status    : PIO\n\
             Output Status : input\n\
             Pin Data      : low\n"
        );
    }

    #[test]
    fn test_register_sequence_on_legacy_chip() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();

        harness.output("pio pa3 high");
        assert_eq!(
            calls.borrow().as_slice(),
            [
                "chip_id",
                "write_word fffff430 00000008",
                "write_word fffff410 00000008",
                "write_word fffff400 00000008",
            ]
        );
    }

    #[test]
    fn test_bad_line_and_operation() {
        let (session, calls) = recording_session();
        let mut harness = Harness::new(session);
        harness.session.connect("port").unwrap();
        calls.borrow_mut().clear();

        for line in ["pio pd3 high", "pio pa32 high", "pio pa3 toggle", "pio x high"] {
            let err = harness.run(line).unwrap_err();
            assert!(matches!(err, Error::HardwareDecode(_)), "{}", line);
        }
        assert!(calls.borrow().is_empty());
    }
}
