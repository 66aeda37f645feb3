//! Interactive command loop

use crate::commands::{Context, Registry};
use crate::console::Console;
use colored::Colorize;
use rbossa_core::{Error, Result, Session};
use std::io::Write;

/// Split a command line into arguments
///
/// Arguments are separated by whitespace. Double quotes group text containing
/// spaces into one argument and are removed.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(Error::MalformedLine("unterminated quote".into()));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Text reported for a failed command
pub fn error_message(name: &str, err: &Error) -> String {
    if err.is_usage() {
        format!("{}.  Try \"help {}\".", err, name)
    } else {
        match err {
            Error::NotConnected | Error::FlashUnsupported | Error::UnknownCommand(_) => {
                format!("{}.", err)
            }
            Error::MalformedLine(_) => err.to_string(),
            _ => format!("Error: {}", err),
        }
    }
}

/// Command registry plus the connection it operates on
pub struct Shell {
    registry: Registry,
    session: Session,
}

impl Shell {
    /// Create a shell over `session` with every command registered
    pub fn new(session: Session) -> Self {
        Self {
            registry: Registry::with_defaults(),
            session,
        }
    }

    /// Command names, for completion
    pub fn command_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Run one line, reporting any failure on `console`
    ///
    /// Returns `true` once the user asked to leave.
    pub fn execute(&mut self, line: &str, console: &mut dyn Console) -> Result<bool> {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                writeln!(console, "{}", error_message("", &e))?;
                return Ok(false);
            }
        };
        if tokens.is_empty() {
            return Ok(false);
        }
        let argv: Vec<&str> = tokens.iter().map(String::as_str).collect();
        self.dispatch(&argv, console)
    }

    /// Connect to `port` as the `connect` command would
    pub fn connect(&mut self, port: &str, console: &mut dyn Console) -> Result<()> {
        self.dispatch(&["connect", port], console)?;
        Ok(())
    }

    fn dispatch(&mut self, argv: &[&str], console: &mut dyn Console) -> Result<bool> {
        let mut ctx = Context {
            session: &mut self.session,
            console,
            registry: &self.registry,
            exit: false,
        };
        match self.registry.dispatch(argv, &mut ctx) {
            Ok(()) => Ok(ctx.exit),
            Err(Error::Console(e)) => Err(Error::Console(e)),
            Err(e) => {
                log::debug!("{} failed: {:?}", argv[0], e);
                writeln!(ctx.console, "{}", error_message(argv[0], &e))?;
                Ok(false)
            }
        }
    }

    /// Read and run lines until `exit` or end of input
    pub fn run(&mut self, console: &mut dyn Console) -> Result<()> {
        writeln!(
            console,
            "Press Ctrl-D or enter \"{}\" to end session.\nType \"{}\" to display a list of commands.",
            "exit".bright_cyan(),
            "help".bright_cyan()
        )?;
        let prompt = format!("{} ", "bossa>".bright_green().bold());

        while let Some(line) = console.read_line(&prompt)? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            console.add_history(line);
            if self.execute(line, console)? {
                break;
            }
            console.flush()?;
        }

        self.session.disconnect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{dummy_session, recording_session};
    use crate::console::testing::BufferConsole;
    use test_case::test_case;

    #[test_case("", &[] ; "empty")]
    #[test_case("   \t ", &[] ; "blank")]
    #[test_case("mrb 0x10 4", &["mrb", "0x10", "4"] ; "plain")]
    #[test_case("  mrb   0x10  ", &["mrb", "0x10"] ; "extra space")]
    #[test_case("mwf 0 \"my file.bin\"", &["mwf", "0", "my file.bin"] ; "quoted")]
    #[test_case("read a\"b c\"d", &["read", "ab cd"] ; "quote inside token")]
    #[test_case("read \"\"", &["read", ""] ; "empty quotes")]
    fn test_tokenize(line: &str, expected: &[&str]) {
        assert_eq!(tokenize(line).unwrap(), expected);
    }

    #[test]
    fn test_tokenize_unterminated_quote() {
        assert!(matches!(
            tokenize("read \"abc"),
            Err(Error::MalformedLine(_))
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            error_message("mrb", &Error::InvalidNumber("12x".into())),
            "Invalid number \"12x\".  Try \"help mrb\"."
        );
        assert_eq!(
            error_message("dump", &Error::NotConnected),
            "No device connected.  Use \"connect\" or \"scan\" first."
        );
        assert_eq!(
            error_message("info", &Error::FlashUnsupported),
            "Flash on device is not supported."
        );
        assert_eq!(
            error_message("frob", &Error::UnknownCommand("frob".into())),
            "Unknown command \"frob\"."
        );
        assert_eq!(
            error_message("go", &Error::Transport("timeout".into())),
            "Error: Device transport error: timeout"
        );
    }

    #[test]
    fn test_execute_reports_and_continues() {
        let (session, _) = recording_session();
        let mut shell = Shell::new(session);
        let mut console = BufferConsole::default();

        assert!(!shell.execute("mrb", &mut console).unwrap());
        assert_eq!(
            console.take(),
            "Command requires 1 to 2 arguments.  Try \"help mrb\".\n"
        );

        assert!(!shell.execute("mrb 0", &mut console).unwrap());
        assert_eq!(
            console.take(),
            "No device connected.  Use \"connect\" or \"scan\" first.\n"
        );

        assert!(!shell.execute("read \"x", &mut console).unwrap());
        assert_eq!(
            console.take(),
            "Malformed command line: unterminated quote\n"
        );

        assert!(shell.execute("exit", &mut console).unwrap());
    }

    #[test]
    fn test_connect_reports_flash_support() {
        let (session, _) = recording_session();
        let mut shell = Shell::new(session);
        let mut console = BufferConsole::default();

        shell.connect("port", &mut console).unwrap();
        assert_eq!(
            console.take(),
            "Connected to device on port\nFlash for chip ID 270b0940 is not supported\n"
        );
        assert!(shell.session.is_connected());

        shell.connect("none", &mut console).unwrap();
        assert_eq!(console.take(), "No device found on none\n");
    }

    #[test]
    fn test_connect_keeps_port_with_spaces() {
        let mut shell = Shell::new(dummy_session());
        let mut console = BufferConsole::default();

        shell.connect("no such port", &mut console).unwrap();
        assert_eq!(console.take(), "No device found on no such port\n");
    }

    #[test]
    fn test_run_until_exit() {
        let mut shell = Shell::new(dummy_session());
        let mut console = BufferConsole::with_input(&[
            "connect dummy0",
            "",
            "mww 0x200000 0x11223344",
            "exit",
            "mrb 0",
        ]);

        shell.run(&mut console).unwrap();
        assert_eq!(
            console.history(),
            ["connect dummy0", "mww 0x200000 0x11223344", "exit"]
        );
        assert!(console.text().contains("00200000 : 11223344\n"));
        assert_eq!(console.input.len(), 1);
        assert!(!shell.session.is_connected());
    }

    #[test]
    fn test_run_until_end_of_input() {
        let mut shell = Shell::new(dummy_session());
        let mut console = BufferConsole::with_input(&["bogus", "help help"]);

        shell.run(&mut console).unwrap();
        let text = console.text();
        assert!(text.contains("Unknown command \"bogus\".\n"));
        assert!(text.contains("help <COMMAND>\n"));
    }
}
