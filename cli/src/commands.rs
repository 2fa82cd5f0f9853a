//! Line commands understood by the front end.

use litera_engine::litera_types::ActionRequest;
use litera_engine::litera_types::scenario::{
    ETHICAL_DILEMMA, PREBUNK_POST, PROFESSIONAL_MEETING, PostLabel,
};

pub const HELP: &str = "\
Commands:
  id <value>          set the session identifier (empty clears it)
  start [id]          start or resume a session
  label <verified|misleading|hoax>
                      label the feed post
  ethical <option>    answer the group chat dilemma
  pro <1|2>           attempt the meeting task
  show                show progress
  scenarios           show the three scenarios
  help                this text
  quit                exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetId(String),
    Start(Option<String>),
    Act(ActionRequest),
    Show,
    Scenarios,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown label `{0}`; expected verified, misleading or hoax")]
    Label(String),
    #[error("unknown option `{0}`; expected one of: {1}")]
    EthicalOption(String, String),
    #[error("unknown task `{0}`; expected 1 or 2")]
    Task(String),
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));

    let command = match word.to_ascii_lowercase().as_str() {
        "id" => Command::SetId(rest.to_string()),
        "start" => Command::Start((!rest.is_empty()).then(|| rest.to_string())),
        "label" => {
            if rest.is_empty() {
                return Err(CommandError::Usage("label <verified|misleading|hoax>"));
            }
            let label = PostLabel::parse(rest).ok_or_else(|| CommandError::Label(rest.to_string()))?;
            Command::Act(PREBUNK_POST.label_action(label))
        }
        "ethical" => {
            if rest.is_empty() {
                return Err(CommandError::Usage("ethical <option>"));
            }
            let action = ETHICAL_DILEMMA.decision_action(rest).ok_or_else(|| {
                let keys: Vec<&str> = ETHICAL_DILEMMA.options.iter().map(|o| o.key).collect();
                CommandError::EthicalOption(rest.to_string(), keys.join(", "))
            })?;
            Command::Act(action)
        }
        "pro" => {
            let action = rest
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|index| PROFESSIONAL_MEETING.attempt_action(index))
                .ok_or_else(|| CommandError::Task(rest.to_string()))?;
            Command::Act(action)
        }
        "show" => Command::Show,
        "scenarios" => Command::Scenarios,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}
