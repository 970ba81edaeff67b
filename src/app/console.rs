use std::io::{self, BufRead};
use std::thread;

use crossbeam::channel::Sender;

use crate::{cli::DEFAULT_RECORDS_LIMIT, Error, Result};

pub const CONSOLE_HELP: &str = concat!(
    "commands:\n",
    "  press            publish a manual button press\n",
    "  override on|off  publish a manual override change\n",
    "  records [n]      show the n most recent stored records (default 10)\n",
    "  status           redraw the status line\n",
    "  quit             stop the daemon\n",
    "  help             show this list\n",
);

/// Operator action read from the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Press,
    Override(bool),
    Records(usize),
    Status,
    Quit,
    Help,
}

impl OperatorCommand {
    /// `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        if let Some(extra) = words.next() {
            return Err(Error::InvalidArgs(format!("unexpected argument '{extra}'")));
        }
        let cmd = match (head.to_ascii_lowercase().as_str(), arg) {
            ("press" | "button", None) => OperatorCommand::Press,
            ("override", Some(state)) => match state.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => OperatorCommand::Override(true),
                "off" | "false" | "0" => OperatorCommand::Override(false),
                other => {
                    return Err(Error::InvalidArgs(format!(
                        "override expects on or off, got '{other}'"
                    )))
                }
            },
            ("override", None) => {
                return Err(Error::InvalidArgs("override expects on or off".into()))
            }
            ("records", None) => OperatorCommand::Records(DEFAULT_RECORDS_LIMIT),
            ("records", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => OperatorCommand::Records(n),
                _ => {
                    return Err(Error::InvalidArgs(
                        "records expects a positive integer".into(),
                    ))
                }
            },
            ("status", None) => OperatorCommand::Status,
            ("quit" | "exit", None) => OperatorCommand::Quit,
            ("help" | "?", None) => OperatorCommand::Help,
            (other, _) => {
                return Err(Error::InvalidArgs(format!("unknown command '{other}'")));
            }
        };
        Ok(Some(cmd))
    }
}

/// Read operator commands from stdin on a background thread.
///
/// The thread exits on EOF or when the receiver is gone; the daemon keeps
/// running without a console in either case.
pub fn spawn_console(commands: Sender<OperatorCommand>) -> Result<()> {
    thread::Builder::new()
        .name("coolrelay-console".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match OperatorCommand::parse(&line) {
                    Ok(Some(cmd)) => {
                        if commands.send(cmd).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => eprint!("{err}\n{CONSOLE_HELP}"),
                }
            }
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(OperatorCommand::parse("press").unwrap(), Some(OperatorCommand::Press));
        assert_eq!(
            OperatorCommand::parse("  override ON ").unwrap(),
            Some(OperatorCommand::Override(true))
        );
        assert_eq!(
            OperatorCommand::parse("override off").unwrap(),
            Some(OperatorCommand::Override(false))
        );
        assert_eq!(
            OperatorCommand::parse("records").unwrap(),
            Some(OperatorCommand::Records(DEFAULT_RECORDS_LIMIT))
        );
        assert_eq!(
            OperatorCommand::parse("records 3").unwrap(),
            Some(OperatorCommand::Records(3))
        );
        assert_eq!(OperatorCommand::parse("quit").unwrap(), Some(OperatorCommand::Quit));
        assert_eq!(OperatorCommand::parse("").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(OperatorCommand::parse("override").is_err());
        assert!(OperatorCommand::parse("override maybe").is_err());
        assert!(OperatorCommand::parse("records 0").is_err());
        assert!(OperatorCommand::parse("press now").is_err());
        assert!(OperatorCommand::parse("dance").is_err());
    }
}
