use snafu::{ResultExt, Snafu};

use super::Action;
use crate::model::{CourseId, ParseCourseId};

#[derive(Debug, Snafu, PartialEq)]
pub enum ParseError {
    #[snafu(display("unknown command `{command}`, try `help`"))]
    UnknownCommand { command: String },

    #[snafu(display("`{command}` expects {expected}"))]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[snafu(display("{source}"))]
    InvalidCourseId { source: ParseCourseId },

    #[snafu(display("`{text}` is not a number of seconds"))]
    InvalidSeconds { text: String },
}

const WATCH_USAGE: &str = "<course id> <seconds> <topic name>";
const COMPLETE_USAGE: &str = "<course id> <topic name>";

pub fn parse(input: &str) -> Result<Action, ParseError> {
    let input = input.trim();
    let (command, rest) = split_word(input);

    match command {
        "" => Ok(Action::None),
        "status" => Ok(Action::Status),
        "topics" => Ok(Action::Topics),
        "refresh" | "retry" => Ok(Action::Refresh),
        "help" => Ok(Action::Help),
        "exit" | "quit" => Ok(Action::Exit),
        "watch" => {
            let (course_id, rest) = course_id(rest, "watch", WATCH_USAGE)?;
            let (seconds, topic_name) = split_word(rest);
            let seconds = parse_seconds(seconds, "watch")?;
            let topic_name = topic_name_of(topic_name, "watch", WATCH_USAGE)?;

            Ok(Action::Watch {
                course_id,
                seconds,
                topic_name,
            })
        }
        "complete" => {
            let (course_id, rest) = course_id(rest, "complete", COMPLETE_USAGE)?;
            let topic_name = topic_name_of(rest, "complete", COMPLETE_USAGE)?;

            Ok(Action::Complete {
                course_id,
                topic_name,
            })
        }
        other => UnknownCommandSnafu { command: other }.fail(),
    }
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

fn course_id<'a>(
    input: &'a str, command: &'static str, expected: &'static str,
) -> Result<(CourseId, &'a str), ParseError> {
    let (word, rest) = split_word(input);
    if word.is_empty() {
        return MissingArgumentSnafu { command, expected }.fail();
    }

    let course_id = word.parse().context(InvalidCourseIdSnafu)?;
    Ok((course_id, rest))
}

fn parse_seconds(text: &str, command: &'static str) -> Result<f64, ParseError> {
    if text.is_empty() {
        return MissingArgumentSnafu {
            command,
            expected: WATCH_USAGE,
        }
        .fail();
    }

    text.parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite())
        .ok_or_else(|| ParseError::InvalidSeconds {
            text: text.to_string(),
        })
}

fn topic_name_of(
    input: &str, command: &'static str, expected: &'static str,
) -> Result<String, ParseError> {
    let name = input.trim();
    if name.is_empty() {
        return MissingArgumentSnafu { command, expected }.fail();
    }
    Ok(name.to_string())
}
