//! Terminal input and output for the shell

use directories::ProjectDirs;
use rbossa_core::{Error, Result};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::{self, Write};
use std::path::PathBuf;

/// Line-oriented console used by commands
///
/// Output goes through [`Write`]. Input is read one line at a time.
pub trait Console: Write {
    /// Prompt for a line; `None` at end of input
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Record a line in the history
    fn add_history(&mut self, line: &str);

    /// Lines entered so far, oldest first
    fn history(&self) -> Vec<String>;
}

/// Default history file location
pub fn default_history_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "rbossa") {
        let mut path = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&path).ok();
        path.push("history");
        path
    } else {
        PathBuf::from(".rbossa_history")
    }
}

/// Completes command names in the first word of a line
#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CommandHelper {
    names: Vec<String>,
}

impl CommandHelper {
    /// Create a helper completing `names`
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let prefix = &line[..pos];
        let start = prefix.len() - prefix.trim_start().len();
        let word = &prefix[start..];
        if word.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }

        let candidates = self
            .names
            .iter()
            .filter(|name| name.starts_with(word))
            .map(|name| Pair {
                display: name.clone(),
                replacement: format!("{} ", name),
            })
            .collect();
        Ok((start, candidates))
    }
}

/// Console backed by a rustyline editor and stdout
pub struct EditorConsole {
    editor: Editor<CommandHelper, FileHistory>,
    history_path: Option<PathBuf>,
    stdout: io::Stdout,
}

impl EditorConsole {
    /// Create the console, loading history from `history_path` if given
    pub fn new(helper: CommandHelper, history_path: Option<PathBuf>) -> Result<Self> {
        let mut editor = Editor::<CommandHelper, FileHistory>::new().map_err(readline_error)?;
        editor.set_helper(Some(helper));

        if let Some(path) = &history_path {
            if let Err(e) = editor.load_history(path) {
                // First run has no history file yet
                log::debug!("No history loaded from {}: {}", path.display(), e);
            }
        }

        Ok(Self {
            editor,
            history_path,
            stdout: io::stdout(),
        })
    }

    /// Save the history, if a history file is configured
    pub fn save_history(&mut self) {
        if let Some(path) = &self.history_path {
            if let Err(e) = self.editor.save_history(path) {
                log::warn!("Failed to save history to {}: {}", path.display(), e);
            }
        }
    }
}

fn readline_error(e: ReadlineError) -> Error {
    match e {
        ReadlineError::Io(e) => Error::Console(e),
        other => Error::Console(io::Error::other(other)),
    }
}

impl Write for EditorConsole {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

impl Console for EditorConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) => {
                writeln!(self.stdout, "^C")?;
                Ok(Some(String::new()))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(readline_error(e)),
        }
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }

    fn history(&self) -> Vec<String> {
        self.editor.history().iter().cloned().collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::DefaultHistory;

    fn complete(line: &str) -> (usize, Vec<String>) {
        let helper = CommandHelper::new(vec!["mrb".into(), "mrf".into(), "mww".into()]);
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        let (start, pairs) = helper.complete(line, line.len(), &ctx).unwrap();
        (start, pairs.into_iter().map(|p| p.display).collect())
    }

    #[test]
    fn test_completes_command_names() {
        assert_eq!(complete("mr"), (0, vec!["mrb".to_string(), "mrf".to_string()]));
        assert_eq!(complete("  mw"), (2, vec!["mww".to_string()]));
        assert_eq!(complete("mrb 0x"), (6, vec![]));
    }
}
