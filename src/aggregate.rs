use crate::record::LogRecord;
use serde::Serialize;

/// Per-level counts, ordered by first appearance in the input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LogCounts(Vec<(String, usize)>);

impl LogCounts {
    pub fn get(&self, level: &str) -> Option<usize> {
        self.0.iter().find(|(l, _)| l == level).map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn total(&self) -> usize { self.0.iter().map(|(_, c)| *c).sum() }
}

pub fn count_by_level(records: &[LogRecord]) -> LogCounts {
    let mut by_level: Vec<(String, usize)> = vec![];
    for r in records {
        match by_level.iter_mut().find(|(l, _)| *l == r.level) {
            Some((_, c)) => *c += 1,
            None => by_level.push((r.level.clone(), 1)),
        }
    }
    LogCounts(by_level)
}
