//! Log record model for tm.
//!
//! Each line of the task log is one `LogRecord`:
//!
//! ```text
//! <dd/MM/yyyy HH:mm>,<command>,<taskName>[,<extra1>[,<extra2>]]
//! ```
//!
//! Fields are comma separated with no escaping, so task names and
//! descriptions may not contain commas or line breaks.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// chrono format for record timestamps (`dd/MM/yyyy HH:mm`).
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

const FIELD_SEPARATOR: char = ',';

/// Size bucket attached to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Size {
    S,
    M,
    L,
    XL,
}

impl Size {
    pub fn as_str(self) -> &'static str {
        match self {
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::XL => "XL",
        }
    }

    /// Returns the bucket when `value` is exactly one of the size labels.
    pub fn bucket(value: &str) -> Option<Self> {
        match value {
            "S" => Some(Size::S),
            "M" => Some(Size::M),
            "L" => Some(Size::L),
            "XL" => Some(Size::XL),
            _ => None,
        }
    }
}

impl FromStr for Size {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Size::bucket(value.trim()).ok_or_else(|| Error::InvalidSize(value.to_string()))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The command carried by a log record, one variant per command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    Start {
        name: String,
    },
    Stop {
        name: String,
    },
    Describe {
        name: String,
        text: String,
        size: Option<Size>,
    },
    Size {
        name: String,
        size: Size,
    },
    Rename {
        name: String,
        new_name: String,
    },
    Delete {
        name: String,
    },
}

impl TaskCommand {
    pub fn keyword(&self) -> &'static str {
        match self {
            TaskCommand::Start { .. } => "start",
            TaskCommand::Stop { .. } => "stop",
            TaskCommand::Describe { .. } => "describe",
            TaskCommand::Size { .. } => "size",
            TaskCommand::Rename { .. } => "rename",
            TaskCommand::Delete { .. } => "delete",
        }
    }

    /// Subject task of the command.
    pub fn task_name(&self) -> &str {
        match self {
            TaskCommand::Start { name }
            | TaskCommand::Stop { name }
            | TaskCommand::Describe { name, .. }
            | TaskCommand::Size { name, .. }
            | TaskCommand::Rename { name, .. }
            | TaskCommand::Delete { name } => name,
        }
    }

    /// Check that every free-text field can be written to the log verbatim.
    pub fn validate(&self) -> Result<()> {
        validate_field("task name", self.task_name())?;
        match self {
            TaskCommand::Describe { text, .. } => validate_field("description", text),
            TaskCommand::Rename { new_name, .. } => validate_field("new task name", new_name),
            _ => Ok(()),
        }
    }

    /// Most fields a line may carry after the task name.
    fn extra_field_count(&self) -> usize {
        match self {
            TaskCommand::Start { .. } | TaskCommand::Stop { .. } | TaskCommand::Delete { .. } => 0,
            TaskCommand::Rename { .. } | TaskCommand::Size { .. } => 1,
            TaskCommand::Describe { .. } => 2,
        }
    }
}

fn validate_field(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{label} cannot be empty")));
    }
    if value.trim() != value {
        return Err(Error::InvalidArgument(format!(
            "{label} cannot start or end with whitespace: '{value}'"
        )));
    }
    if value.contains(FIELD_SEPARATOR) || value.contains(['\n', '\r']) {
        return Err(Error::InvalidArgument(format!(
            "{label} cannot contain commas or line breaks: '{value}'"
        )));
    }
    Ok(())
}

/// One immutable line of the task log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub command: TaskCommand,
}

impl LogRecord {
    pub fn new(timestamp: NaiveDateTime, command: TaskCommand) -> Self {
        Self {
            timestamp: truncate_to_minute(timestamp),
            command,
        }
    }

    /// Record stamped with the current local time at minute resolution.
    pub fn now(command: TaskCommand) -> Self {
        Self::new(Local::now().naive_local(), command)
    }

    /// Parse one log line.
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(FIELD_SEPARATOR).collect();
        let (raw_timestamp, keyword, name, extra) = match fields.as_slice() {
            [timestamp, keyword, name, extra @ ..] => (*timestamp, *keyword, *name, extra),
            _ => {
                return Err(Error::MalformedRecord(format!(
                    "expected at least 3 fields in '{line}'"
                )))
            }
        };

        let timestamp = parse_timestamp(raw_timestamp)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::MalformedRecord(format!("missing task name in '{line}'")));
        }
        let name = name.to_string();

        let command = match keyword.trim() {
            "start" => TaskCommand::Start { name },
            "stop" => TaskCommand::Stop { name },
            "delete" => TaskCommand::Delete { name },
            "rename" => {
                let new_name = required_extra(extra, 0, "new name", line)?;
                TaskCommand::Rename {
                    name,
                    new_name: new_name.to_string(),
                }
            }
            "describe" => {
                let text = required_extra(extra, 0, "description", line)?;
                let size = match extra.get(1).map(|value| value.trim()) {
                    // Older logs write a literal `null` when no size was given.
                    None | Some("") | Some("null") => None,
                    Some(value) => Some(parse_record_size(value, line)?),
                };
                TaskCommand::Describe {
                    name,
                    text: text.to_string(),
                    size,
                }
            }
            "size" => {
                let value = required_extra(extra, 0, "size", line)?;
                TaskCommand::Size {
                    name,
                    size: parse_record_size(value, line)?,
                }
            }
            other => {
                return Err(Error::MalformedRecord(format!(
                    "unknown command '{other}' in '{line}'"
                )))
            }
        };

        if extra.len() > command.extra_field_count() {
            return Err(Error::MalformedRecord(format!(
                "too many fields for '{}' in '{line}'",
                command.keyword()
            )));
        }

        Ok(Self { timestamp, command })
    }

    /// Render the record as a log line without the trailing newline.
    pub fn to_line(&self) -> String {
        let mut fields = vec![
            format_timestamp(&self.timestamp),
            self.command.keyword().to_string(),
            self.command.task_name().to_string(),
        ];
        match &self.command {
            TaskCommand::Describe { text, size, .. } => {
                fields.push(text.clone());
                if let Some(size) = size {
                    fields.push(size.to_string());
                }
            }
            TaskCommand::Size { size, .. } => fields.push(size.to_string()),
            TaskCommand::Rename { new_name, .. } => fields.push(new_name.clone()),
            TaskCommand::Start { .. } | TaskCommand::Stop { .. } | TaskCommand::Delete { .. } => {}
        }
        fields.join(",")
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|err| {
        Error::MalformedRecord(format!("invalid timestamp '{value}': {err}"))
    })
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn truncate_to_minute(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .with_second(0)
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(timestamp)
}

fn required_extra<'a>(extra: &[&'a str], idx: usize, label: &str, line: &str) -> Result<&'a str> {
    match extra.get(idx).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::MalformedRecord(format!("missing {label} in '{line}'"))),
    }
}

fn parse_record_size(value: &str, line: &str) -> Result<Size> {
    value
        .parse()
        .map_err(|_| Error::MalformedRecord(format!("invalid size '{value}' in '{line}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn parses_start_line() {
        let record = LogRecord::parse("05/03/2024 10:00,start,alpha").expect("parse");
        assert_eq!(record.timestamp, at(10, 0));
        assert_eq!(
            record.command,
            TaskCommand::Start {
                name: "alpha".to_string()
            }
        );
    }

    #[test]
    fn parses_describe_with_and_without_size() {
        let with_size = LogRecord::parse("05/03/2024 10:00,describe,alpha,first pass,M").expect("parse");
        assert_eq!(
            with_size.command,
            TaskCommand::Describe {
                name: "alpha".to_string(),
                text: "first pass".to_string(),
                size: Some(Size::M),
            }
        );

        let without = LogRecord::parse("05/03/2024 10:00,describe,alpha,first pass").expect("parse");
        assert!(matches!(without.command, TaskCommand::Describe { size: None, .. }));

        let legacy = LogRecord::parse("05/03/2024 10:00,describe,alpha,first pass,null").expect("parse");
        assert!(matches!(legacy.command, TaskCommand::Describe { size: None, .. }));
    }

    #[test]
    fn rejects_bad_timestamp() {
        let err = LogRecord::parse("2024-03-05 10:00,start,alpha").expect_err("bad timestamp");
        assert!(matches!(err, Error::MalformedRecord(_)));
    }

    #[test]
    fn rejects_missing_fields_and_unknown_commands() {
        for line in [
            "05/03/2024 10:00,start",
            "05/03/2024 10:00,rename,alpha",
            "05/03/2024 10:00,size,alpha",
            "05/03/2024 10:00,describe,alpha",
            "05/03/2024 10:00,pause,alpha",
            "05/03/2024 10:00,size,alpha,XXL",
        ] {
            let err = LogRecord::parse(line).expect_err(line);
            assert!(matches!(err, Error::MalformedRecord(_)), "{line}: {err}");
        }
    }

    #[test]
    fn rejects_extra_fields() {
        for line in [
            "05/03/2024 10:00,start,alpha,junk",
            "05/03/2024 10:00,stop,alpha,",
            "05/03/2024 10:00,rename,alpha,beta,gamma",
            "05/03/2024 10:00,size,alpha,M,L",
            "05/03/2024 10:00,describe,alpha,one,M,L",
        ] {
            let err = LogRecord::parse(line).expect_err(line);
            assert!(err.to_string().contains("too many fields"), "{line}: {err}");
        }
        assert!(LogRecord::parse("05/03/2024 10:00,describe,alpha,notes,null").is_ok());
    }

    #[test]
    fn to_line_matches_log_format() {
        let record = LogRecord::new(
            at(9, 5),
            TaskCommand::Rename {
                name: "alpha".to_string(),
                new_name: "beta".to_string(),
            },
        );
        assert_eq!(record.to_line(), "05/03/2024 09:05,rename,alpha,beta");

        let describe = LogRecord::new(
            at(9, 5),
            TaskCommand::Describe {
                name: "alpha".to_string(),
                text: "notes".to_string(),
                size: None,
            },
        );
        assert_eq!(describe.to_line(), "05/03/2024 09:05,describe,alpha,notes");
    }

    #[test]
    fn new_truncates_to_minute() {
        let precise = at(10, 0)
            .with_second(42)
            .and_then(|value| value.with_nanosecond(7))
            .expect("valid");
        let record = LogRecord::new(precise, TaskCommand::Stop { name: "a".to_string() });
        assert_eq!(record.timestamp, at(10, 0));
    }

    #[test]
    fn size_bucket_is_exact() {
        assert_eq!(Size::bucket("XL"), Some(Size::XL));
        assert_eq!(Size::bucket("xl"), None);
        assert_eq!(Size::bucket("alpha"), None);
        assert!(matches!("XXL".parse::<Size>(), Err(Error::InvalidSize(_))));
    }

    #[test]
    fn validate_rejects_commas() {
        let command = TaskCommand::Describe {
            name: "alpha".to_string(),
            text: "one, two".to_string(),
            size: None,
        };
        assert!(matches!(command.validate(), Err(Error::InvalidArgument(_))));

        let empty = TaskCommand::Start {
            name: "  ".to_string(),
        };
        assert!(matches!(empty.validate(), Err(Error::InvalidArgument(_))));
    }
}
