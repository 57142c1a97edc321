//! Line commands standing in for drag gestures
//!
//! ```text
//! move <px>                 drag the segment horizontally
//! resize <px>               drag the right edge
//! trim <px>                 drag the left edge (end stays fixed)
//! set <start> <duration>    replace the segment (seconds)
//! seek <seconds>
//! play | stop | status | quit
//! ```

use crate::playback::engine::LoopSession;
use crate::playback::segment::Segment;
use std::str::FromStr;
use thiserror::Error;
use waveloop_common::time::format_seconds;

/// One parsed command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditCommand {
    Move(f64),
    Resize(f64),
    Trim(f64),
    Set { start: f64, duration: f64 },
    Seek(f64),
    Play,
    Stop,
    Status,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("'{command}' expects {expected} argument(s)")]
    Arity {
        command: &'static str,
        expected: usize,
    },

    #[error("invalid number '{0}'")]
    Number(String),
}

/// What the input loop should do after a command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Continue(String),
    Quit,
}

impl FromStr for EditCommand {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Err(CommandParseError::Empty);
        };
        let args: Vec<&str> = parts.collect();

        let command = match name.to_ascii_lowercase().as_str() {
            "move" => EditCommand::Move(one_number("move", &args)?),
            "resize" => EditCommand::Resize(one_number("resize", &args)?),
            "trim" => EditCommand::Trim(one_number("trim", &args)?),
            "seek" => EditCommand::Seek(one_number("seek", &args)?),
            "set" => {
                if args.len() != 2 {
                    return Err(CommandParseError::Arity {
                        command: "set",
                        expected: 2,
                    });
                }
                EditCommand::Set {
                    start: number(args[0])?,
                    duration: number(args[1])?,
                }
            }
            "play" => no_args("play", &args, EditCommand::Play)?,
            "stop" => no_args("stop", &args, EditCommand::Stop)?,
            "status" => no_args("status", &args, EditCommand::Status)?,
            "quit" | "exit" => no_args("quit", &args, EditCommand::Quit)?,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

fn number(arg: &str) -> Result<f64, CommandParseError> {
    arg.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandParseError::Number(arg.to_string()))
}

fn one_number(command: &'static str, args: &[&str]) -> Result<f64, CommandParseError> {
    match args {
        [arg] => number(arg),
        _ => Err(CommandParseError::Arity {
            command,
            expected: 1,
        }),
    }
}

fn no_args(
    command: &'static str,
    args: &[&str],
    parsed: EditCommand,
) -> Result<EditCommand, CommandParseError> {
    if args.is_empty() {
        Ok(parsed)
    } else {
        Err(CommandParseError::Arity {
            command,
            expected: 0,
        })
    }
}

impl EditCommand {
    /// Run the command against a live session
    pub fn apply(self, session: &mut LoopSession) -> CommandResult {
        let segment = match self {
            EditCommand::Move(dx) => session.editor_mut().move_by_pixels(dx),
            EditCommand::Resize(dw) => session.editor_mut().resize_end_by_pixels(dw),
            EditCommand::Trim(dx) => session.editor_mut().resize_start_by_pixels(dx),
            EditCommand::Set { start, duration } => {
                session.editor_mut().set_segment(Segment::new(start, duration))
            }
            EditCommand::Seek(seconds) => {
                session.seek(seconds);
                return CommandResult::Continue(format!("seek {}", format_seconds(seconds)));
            }
            EditCommand::Play => {
                session.play();
                return CommandResult::Continue("playing".to_string());
            }
            EditCommand::Stop => {
                session.stop();
                return CommandResult::Continue("stopped".to_string());
            }
            EditCommand::Status => {
                let status = session.status();
                let mut line = format!(
                    "{:?} at {} (cursor x={:.1}px), {}, {}",
                    status.state,
                    format_seconds(status.position),
                    status.cursor_x,
                    status.segment,
                    status.loop_boundaries
                );
                if let Some(ring) = status.ring_buffer {
                    line.push_str(&format!(
                        ", ring {:.0}% ({} underruns)",
                        ring.fill_percent() * 100.0,
                        ring.underruns
                    ));
                }
                return CommandResult::Continue(line);
            }
            EditCommand::Quit => return CommandResult::Quit,
        };

        let loop_boundaries = session.transport().lock().loop_boundaries();
        CommandResult::Continue(format!("{} -> {}", segment, loop_boundaries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edits() {
        assert_eq!("move 25".parse::<EditCommand>(), Ok(EditCommand::Move(25.0)));
        assert_eq!("resize -10.5".parse::<EditCommand>(), Ok(EditCommand::Resize(-10.5)));
        assert_eq!("  trim 4 ".parse::<EditCommand>(), Ok(EditCommand::Trim(4.0)));
        assert_eq!(
            "set 2 1.5".parse::<EditCommand>(),
            Ok(EditCommand::Set {
                start: 2.0,
                duration: 1.5
            })
        );
        assert_eq!("SEEK 0.25".parse::<EditCommand>(), Ok(EditCommand::Seek(0.25)));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("play".parse::<EditCommand>(), Ok(EditCommand::Play));
        assert_eq!("stop".parse::<EditCommand>(), Ok(EditCommand::Stop));
        assert_eq!("status".parse::<EditCommand>(), Ok(EditCommand::Status));
        assert_eq!("exit".parse::<EditCommand>(), Ok(EditCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<EditCommand>(), Err(CommandParseError::Empty));
        assert_eq!(
            "jump 3".parse::<EditCommand>(),
            Err(CommandParseError::Unknown("jump".to_string()))
        );
        assert_eq!(
            "move".parse::<EditCommand>(),
            Err(CommandParseError::Arity {
                command: "move",
                expected: 1
            })
        );
        assert_eq!(
            "set 1".parse::<EditCommand>(),
            Err(CommandParseError::Arity {
                command: "set",
                expected: 2
            })
        );
        assert_eq!(
            "move abc".parse::<EditCommand>(),
            Err(CommandParseError::Number("abc".to_string()))
        );
        assert_eq!(
            "seek NaN".parse::<EditCommand>(),
            Err(CommandParseError::Number("NaN".to_string()))
        );
        assert!("play now".parse::<EditCommand>().is_err());
    }
}
