//! REPL command parsing.

use std::path::PathBuf;

/// One line of user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/load <path>`
    Load(PathBuf),
    /// `/remove`
    Remove,
    /// `/undo`
    Undo,
    /// `/redo`
    Redo,
    /// `/cancel`
    Cancel,
    /// `/clear`
    Clear,
    /// `/select a,b,c` (empty list clears the selection)
    Select(Vec<String>),
    /// `/export <path>`
    Export(PathBuf),
    /// `/status`
    Status,
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
    /// Anything that is not a slash command.
    Prompt(String),
    /// A slash command that could not be understood.
    Invalid(String),
}

/// Usage text printed by `/help`.
pub const HELP: &str = "\
commands:
  /load <file.json>   load a document
  /remove             drop the document
  /undo, /redo        step through document history
  /cancel             stop the running request
  /clear              clear the conversation
  /select a,b         set selected node ids
  /export <file>      write the document as JSON
  /status             show session state
  /quit               exit
anything else is sent to the agent as a prompt";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Prompt(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match (name, arg) {
        ("load", "") | ("export", "") => Command::Invalid(format!("/{name} needs a file path")),
        ("load", path) => Command::Load(PathBuf::from(path)),
        ("export", path) => Command::Export(PathBuf::from(path)),
        ("remove", _) => Command::Remove,
        ("undo", _) => Command::Undo,
        ("redo", _) => Command::Redo,
        ("cancel", _) => Command::Cancel,
        ("clear", _) => Command::Clear,
        ("select", ids) => Command::Select(
            ids.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect(),
        ),
        ("status", _) => Command::Status,
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Invalid(format!("unknown command /{name}, try /help")),
    };
    Some(command)
}
