//! rbossa - Interactive shell for SAM-BA boot monitors
//!
//! Connects to Atmel/Microchip SAM parts running the SAM-BA boot monitor and
//! offers a small command language for poking at them.
//!
//! # Architecture
//!
//! The shell itself knows nothing about serial ports. A backend supplies a
//! `Session` built from three collaborators:
//! - a **connector** that opens a port and handshakes with the monitor
//! - a **port source** listing candidate ports for `scan`
//! - a **flash factory** choosing a flash driver from the chip identifier
//!
//! Commands then go through the session, so the same command set drives the
//! real `samba` backend and the in-memory `dummy` target.

mod cli;
mod commands;
mod console;
mod programmers;
mod shell;

use clap::Parser;
use cli::Cli;
use colored::Colorize;
use console::{CommandHelper, EditorConsole};
use shell::Shell;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let session = match programmers::open_session(cli.backend, cli.baud) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}: {}", "Error".bright_red().bold(), e);
            let names: Vec<&str> = programmers::available_backends()
                .iter()
                .map(|b| b.name)
                .collect();
            eprintln!("Available backends: {}", names.join(", "));
            std::process::exit(1);
        }
    };
    let mut shell = Shell::new(session);

    let history_path = if cli.no_history {
        None
    } else {
        Some(cli.history.clone().unwrap_or_else(console::default_history_path))
    };
    let helper = CommandHelper::new(shell.command_names());
    let mut editor = EditorConsole::new(helper, history_path)?;

    if let Some(port) = &cli.port {
        shell.connect(port, &mut editor)?;
    }

    let result = shell.run(&mut editor);
    editor.save_history();
    result?;

    Ok(())
}
