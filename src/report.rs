use crate::aggregate::LogCounts;
use crate::filter::by_level;
use crate::record::{Level, LogRecord, UnsupportedLevel};
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use std::path::Path;

const TOTAL_WIDTH: usize = 43;
const L_WIDTH: usize = 30;
const R_WIDTH: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReportError {
    #[error(transparent)]
    UnsupportedLevel(#[from] UnsupportedLevel),
}

pub fn render_counts(counts: &LogCounts) -> String {
    let rule = "-".repeat(TOTAL_WIDTH);
    let mut s = String::new();
    s.push_str(&format!("{}\n", rule));
    s.push_str(&format!("|{:^lw$}|{:^rw$}|\n", "LOG LEVELS", "COUNT", lw = L_WIDTH, rw = R_WIDTH));
    s.push_str(&format!("{}\n", rule));
    for (level, count) in counts.iter() {
        s.push_str(&format!("|{:<lw$}|{:^rw$}|\n", level, count, lw = L_WIDTH, rw = R_WIDTH));
    }
    s.push_str(&format!("{}\n", rule));
    s
}

pub fn render_filtered(records: &[LogRecord], level: &str) -> Result<String, ReportError> {
    let level: Level = level.parse()?;
    let mut s = format!("Logs with level: '{}'\n", level);
    for r in by_level(records, level.as_str()) {
        s.push_str(&format!("{} {} - {}\n", r.date, r.time, r.message));
    }
    Ok(s)
}

pub fn render_filtered_table(records: &[LogRecord], level: &str) -> Result<String, ReportError> {
    let level: Level = level.parse()?;
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Date", "Time", "Message"]);
    for r in by_level(records, level.as_str()) {
        table.add_row(vec![r.date.as_str(), r.time.as_str(), r.message.as_str()]);
    }
    Ok(format!("Logs with level: '{}'\n{}\n", level, table))
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub file: &'a Path,
    pub total: usize,
    pub skipped: usize,
    pub counts: &'a LogCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<&'a LogRecord>>,
}

impl<'a> JsonReport<'a> {
    pub fn new(file: &'a Path, records: &'a [LogRecord], counts: &'a LogCounts, skipped: usize, level: Option<&str>) -> Result<Self, ReportError> {
        let level = level.map(str::parse::<Level>).transpose()?;
        Ok(Self {
            file,
            total: records.len(),
            skipped,
            counts,
            level,
            records: level.map(|l| by_level(records, l.as_str())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::count_by_level;
    use crate::record::parse_line;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<LogRecord> {
        [
            "2024-01-01 10:00:00 INFO Service started",
            "2024-01-01 10:00:05 ERROR Connection failed",
            "2024-01-01 10:00:06 INFO Retry scheduled",
        ]
        .iter()
        .map(|l| parse_line(l).unwrap())
        .collect()
    }

    #[test]
    fn counts_table_layout() {
        let out = render_counts(&count_by_level(&sample()));
        let expected = "\
-------------------------------------------
|          LOG LEVELS          |  COUNT   |
-------------------------------------------
|INFO                          |    2     |
|ERROR                         |    1     |
-------------------------------------------
";
        assert_eq!(out, expected);
        assert!(out.lines().all(|l| l.chars().count() == TOTAL_WIDTH));
    }

    #[test]
    fn counts_table_empty_and_wide_counts() {
        let out = render_counts(&LogCounts::default());
        assert_eq!(out.lines().count(), 4);
        let recs: Vec<LogRecord> = (0..12).map(|_| parse_line("d t DEBUG x").unwrap()).collect();
        let out = render_counts(&count_by_level(&recs));
        assert!(out.contains("|DEBUG                         |    12    |\n"));
    }

    #[test]
    fn filtered_lines() {
        let out = render_filtered(&sample(), "info").unwrap();
        assert_eq!(out, "Logs with level: 'INFO'\n2024-01-01 10:00:00 - Service started\n2024-01-01 10:00:06 - Retry scheduled\n");
    }

    #[test]
    fn filtered_with_no_matches_keeps_header() {
        let out = render_filtered(&sample(), "WARNING").unwrap();
        assert_eq!(out, "Logs with level: 'WARNING'\n");
    }

    #[test]
    fn unsupported_level_is_rejected() {
        let err = render_filtered(&sample(), "trace").unwrap_err();
        assert_eq!(err, ReportError::UnsupportedLevel(UnsupportedLevel("TRACE".to_string())));
        assert_eq!(err.to_string(), "Unsupported log level: TRACE");
        assert!(render_filtered_table(&sample(), "fatal").is_err());
    }

    #[test]
    fn filtered_table_lists_messages() {
        let out = render_filtered_table(&sample(), "error").unwrap();
        assert!(out.starts_with("Logs with level: 'ERROR'\n"));
        assert!(out.contains("Connection failed"));
        assert!(!out.contains("Service started"));
    }

    #[test]
    fn json_report_keeps_count_order() {
        let recs = sample();
        let counts = count_by_level(&recs);
        let rep = JsonReport::new(Path::new("app.log"), &recs, &counts, 0, Some("info")).unwrap();
        let v = serde_json::to_value(&rep).unwrap();
        assert_eq!(v["total"], 3);
        assert_eq!(v["counts"], serde_json::json!([["INFO", 2], ["ERROR", 1]]));
        assert_eq!(v["level"], "INFO");
        assert_eq!(v["records"].as_array().unwrap().len(), 2);
        let rep = JsonReport::new(Path::new("app.log"), &recs, &counts, 0, None).unwrap();
        let v = serde_json::to_value(&rep).unwrap();
        assert!(v.get("records").is_none());
    }
}
