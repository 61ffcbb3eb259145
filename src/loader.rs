use crate::record::{parse_line, LogRecord, ParseError};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// First malformed line aborts the load.
    #[default]
    Strict,
    /// Malformed lines are skipped and counted.
    Lenient,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("File '{}' not found.", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read '{}': {}", .path.display(), .source)]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("Malformed log line {line_no}: '{}'", .source.line())]
    Malformed { line_no: u64, #[source] source: ParseError },
}

#[derive(Clone, Debug, Default)]
pub struct Loaded {
    pub records: Vec<LogRecord>,
    pub skipped: usize,
}

pub fn load(path: impl AsRef<Path>) -> Result<Vec<LogRecord>, LoadError> {
    load_with(path, LoadMode::Strict).map(|l| l.records)
}

pub fn load_with(path: impl AsRef<Path>, mode: LoadMode) -> Result<Loaded, LoadError> {
    let path = path.as_ref();
    let io_err = |source: std::io::Error| {
        if source.kind() == std::io::ErrorKind::NotFound { LoadError::NotFound { path: path.to_path_buf() } }
        else { LoadError::Io { path: path.to_path_buf(), source } }
    };
    let f = std::fs::File::open(path).map_err(io_err)?;
    let mut br = BufReader::new(f);
    let mut out = Loaded::default();
    let mut line = String::new();
    let mut idx: u64 = 0;
    loop {
        line.clear();
        let read = br.read_line(&mut line).map_err(io_err)?;
        if read == 0 { break; }
        idx += 1;
        match parse_line(line.trim()) {
            Ok(r) => out.records.push(r),
            Err(e) if mode == LoadMode::Lenient => {
                log::warn!("Skipping malformed line {} in {}: {}", idx, path.display(), e);
                out.skipped += 1;
            }
            Err(e) => return Err(LoadError::Malformed { line_no: idx, source: e }),
        }
    }
    log::debug!("Loaded {} records from {} ({} lines, {} skipped)", out.records.len(), path.display(), idx, out.skipped);
    Ok(out)
}
