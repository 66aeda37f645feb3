//! Shell command implementations
//!
//! Every command is a [`Command`] trait object registered by name in a
//! [`Registry`]. Dispatch checks the declared [`Arity`] before invoking, so a
//! command body only ever sees an argument count it accepts. Commands parse
//! all of their arguments and check connection state before touching the
//! device or the filesystem.
//!
//! - [`session`] - connect, scan, debug, exit, help, history
//! - [`memory`] - raw memory access: dump, disass, go, mrb, mrw, mwb, mww
//! - [`file`] - streaming between memory and host files: mrf, mwf
//! - [`flash`] - flash driver operations: erase, info, lock, unlock, read,
//!   verify, write
//! - [`pio`] - pin-level I/O

pub mod file;
pub mod flash;
pub mod memory;
pub mod pio;
pub mod session;

use crate::console::Console;
use indicatif::{ProgressBar, ProgressStyle};
use rbossa_core::args::Arity;
use rbossa_core::transfer::Progress;
use rbossa_core::{Error, Result, Session};
use std::collections::BTreeMap;

/// State handed to a command for one invocation
pub struct Context<'a> {
    /// Connection state
    pub session: &'a mut Session,
    /// Where output goes and interactive input comes from
    pub console: &'a mut dyn Console,
    /// All registered commands, for `help`
    pub registry: &'a Registry,
    /// Set by `exit` to end the shell loop
    pub exit: bool,
}

/// A shell command
pub trait Command {
    /// Name the command is invoked by
    fn name(&self) -> &'static str;

    /// One-line summary
    fn help(&self) -> &'static str;

    /// Detailed usage text
    fn usage(&self) -> &'static str;

    /// Accepted number of arguments, excluding the name
    fn arity(&self) -> Arity;

    /// Run the command
    fn invoke(&self, args: &[&str], ctx: &mut Context<'_>) -> Result<()>;
}

/// Commands ordered by name
#[derive(Default)]
pub struct Registry {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every shell command
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        session::register(&mut registry);
        memory::register(&mut registry);
        file::register(&mut registry);
        flash::register(&mut registry);
        pio::register(&mut registry);
        registry
    }

    /// Add a command
    ///
    /// # Panics
    ///
    /// Panics if a command with the same name is already registered.
    pub fn register(&mut self, command: Box<dyn Command>) {
        let name = command.name();
        let previous = self.commands.insert(name, command);
        assert!(previous.is_none(), "command {} registered twice", name);
    }

    /// Find a command by name
    pub fn lookup(&self, name: &str) -> Result<&dyn Command> {
        self.commands
            .get(name)
            .map(|c| c.as_ref())
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))
    }

    /// All commands in name order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> + '_ {
        self.commands.values().map(|c| c.as_ref())
    }

    /// Command names in order
    pub fn names(&self) -> Vec<String> {
        self.commands.keys().map(|n| n.to_string()).collect()
    }

    /// Run `argv[0]` with the remaining elements as arguments
    pub fn dispatch(&self, argv: &[&str], ctx: &mut Context<'_>) -> Result<()> {
        let (name, args) = argv
            .split_first()
            .ok_or_else(|| Error::MalformedLine("empty command".into()))?;
        let command = self.lookup(name)?;
        command.arity().check(args.len())?;
        log::debug!("Invoking {} with {:?}", name, args);
        command.invoke(args, ctx)
    }
}

/// Terminal progress bar for transfers
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    /// Create an idle progress bar
    pub fn new() -> Self {
        Self::default()
    }
}

impl Progress for BarProgress {
    fn start(&mut self, total: u64) {
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        self.bar = Some(pb);
    }

    fn advance(&mut self, done: u64) {
        if let Some(pb) = &self.bar {
            pb.set_position(done);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.abandon();
        }
    }
}
