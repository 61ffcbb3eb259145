use crate::record::LogRecord;

/// Records whose level equals `level` upper-cased, in input order. The level is not validated here.
pub fn by_level<'a>(records: &'a [LogRecord], level: &str) -> Vec<&'a LogRecord> {
    let target = level.to_uppercase();
    records.iter().filter(|r| r.level == target).collect()
}
