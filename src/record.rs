use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One parsed line: `<date> <time> <LEVEL> <message...>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub date: String,
    pub time: String,
    pub level: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected '<date> <time> <level> <message>', got '{line}'")]
    Malformed { line: String },
}

impl ParseError {
    pub fn line(&self) -> &str {
        match self { ParseError::Malformed { line } => line }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unsupported log level: {0}")]
pub struct UnsupportedLevel(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level { Error, Warning, Info, Debug }

impl Level {
    pub const ALL: [Level; 4] = [Level::Error, Level::Warning, Level::Info, Level::Debug];

    pub fn as_str(self) -> &'static str {
        match self { Level::Error => "ERROR", Level::Warning => "WARNING", Level::Info => "INFO", Level::Debug => "DEBUG" }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Level {
    type Err = UnsupportedLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Level::ALL.into_iter().find(|l| l.as_str() == upper).ok_or(UnsupportedLevel(upper))
    }
}

/// Splits on single spaces; the fourth segment keeps the rest of the line verbatim.
/// The caller is expected to have trimmed the raw line.
pub fn parse_line(line: &str) -> Result<LogRecord, ParseError> {
    let mut parts = line.splitn(4, ' ');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(time), Some(level), Some(message))
            if !date.is_empty() && !time.is_empty() && !level.is_empty() =>
        {
            Ok(LogRecord { date: date.to_string(), time: time.to_string(), level: level.to_string(), message: message.to_string() })
        }
        _ => Err(ParseError::Malformed { line: line.to_string() }),
    }
}
