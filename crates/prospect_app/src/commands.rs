use prospect_core::{Msg, SortKey};

/// One line typed on stdin while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Dispatch(Msg),
    /// Print the full result table.
    List,
    Help,
    /// Terminate the job if it is still active, then exit.
    Quit,
    Invalid(String),
}

pub const HELP: &str = "commands: pause | resume | terminate | sort <arrival|score|completeness|financing|employees|risk|founded> | search <text> | list | help | quit";

pub fn parse_command(line: &str) -> Option<UserCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "pause" | "p" => UserCommand::Dispatch(Msg::PauseRequested),
        "resume" | "r" => UserCommand::Dispatch(Msg::ResumeRequested),
        "terminate" | "stop" => UserCommand::Dispatch(Msg::TerminateRequested),
        "sort" => match SortKey::parse(rest) {
            Some(key) => UserCommand::Dispatch(Msg::SortChanged(key)),
            None => UserCommand::Invalid(format!("unknown sort key `{rest}`")),
        },
        // Bare `search` clears the filter.
        "search" | "find" => UserCommand::Dispatch(Msg::SearchChanged(rest.to_string())),
        "list" | "ls" => UserCommand::List,
        "help" | "?" => UserCommand::Help,
        "quit" | "exit" | "q" => UserCommand::Quit,
        other => UserCommand::Invalid(format!("unknown command `{other}`")),
    };
    Some(command)
}
