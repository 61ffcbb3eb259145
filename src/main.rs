use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use anyhow::Context;
use clap::{Parser, ValueEnum, ColorChoice, ArgAction, CommandFactory};
use clap::error::ErrorKind;
use clap_complete::Shell;
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};
use crate::loader::{LoadError, LoadMode, Loaded};
use crate::record::{Level, LogRecord};
use crate::report::{JsonReport, ReportError};
mod record;
mod loader;
mod aggregate;
mod filter;
mod report;

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();

const USAGE: &str = "Usage: logtally [OPTIONS] <log_file> [log_level]";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFmt { Text, Json }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TextFormat { Lines, Table }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

#[derive(Parser, Debug)]
#[command(
    name = "logtally",
    version,
    about = "Plain-text log level counter and filter",
    long_about = "Reads a '<date> <time> <LEVEL> <message>' log file, prints a per-level count table and optionally the entries of one level (ERROR, WARNING, INFO, DEBUG).",
    after_long_help = "Examples:\n  logtally app.log\n  logtally app.log error\n  logtally app.log info --text-format table\n  logtally app.log warning --output json --csv-path warnings.csv\n  logtally --lenient noisy.log debug",
    color = ColorChoice::Auto
)]
struct Args {
    /// Log file to analyze
    log_file: Option<PathBuf>,
    /// Show the entries of this level (case-insensitive)
    #[arg(value_name = "LOG_LEVEL")]
    level: Option<String>,
    /// Report format [default: text]
    #[arg(long, short = 'o', value_enum)]
    output: Option<OutputFmt>,
    /// Layout of the filtered entries [default: lines]
    #[arg(long, value_enum)]
    text_format: Option<TextFormat>,
    /// Skip malformed lines instead of aborting on the first one
    #[arg(long, default_value_t = false)]
    lenient: bool,
    /// Write the selected entries (all, or those of LOG_LEVEL) as CSV
    #[arg(long)]
    csv_path: Option<PathBuf>,
    /// TOML config (default ./logtally.toml or $LOGTALLY_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(long, default_value_t = false)]
    force_color: bool,
    #[arg(long)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<PathBuf>,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            log_file: None,
            level: None,
            output: None,
            text_format: None,
            lenient: false,
            csv_path: None,
            config: None,
            no_color: false,
            force_color: false,
            log_level: None,
            log_format: None,
            log_path: None,
            verbose: 0,
            quiet: false,
            completions: None,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct AppConfig {
    output: Option<OutputFmt>,
    text_format: Option<TextFormat>,
    lenient: Option<bool>,
    csv_path: Option<PathBuf>,
    no_color: Option<bool>,
    force_color: Option<bool>,
    log_level: Option<LogLevel>,
    log_format: Option<LogFormat>,
    log_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("{}", USAGE)]
    Usage,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("{0:#}")]
    Export(#[from] anyhow::Error),
}

impl AppError {
    fn exit_code(&self) -> i32 { match self { AppError::Usage => 2, _ => 1 } }
}

fn main() {
    let mut args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            println!("{}", USAGE);
            eprint!("{}", e.render());
            std::process::exit(2);
        }
    };
    if let Some(sh) = args.completions {
        clap_complete::generate(sh, &mut Args::command(), "logtally", &mut std::io::stdout());
        return;
    }
    let cfg_path = args.config.clone()
        .or_else(|| std::env::var_os("LOGTALLY_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("logtally.toml"));
    match load_config(&cfg_path) {
        Ok(Some(cfg)) => apply_config(&mut args, cfg),
        Ok(None) => {}
        Err(e) => eprintln!("Ignoring config {}: {:#}", cfg_path.display(), e),
    }
    init_logger(&args);
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    let enable_color = if args.force_color { true } else { color_default && !args.no_color };
    let _ = ENABLE_COLOR.set(enable_color);

    let res = {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        run(&args, &mut out)
    };
    if let Err(e) = res {
        log::debug!("run failed: {:?}", e);
        println!("{}", paint(&e.to_string(), "1;31"));
        std::process::exit(e.exit_code());
    }
}

fn run(args: &Args, out: &mut dyn Write) -> Result<(), AppError> {
    let path = args.log_file.as_deref().ok_or(AppError::Usage)?;
    let loaded = if args.lenient { loader::load_with(path, LoadMode::Lenient)? } else { Loaded { records: loader::load(path)?, skipped: 0 } };
    if loaded.skipped > 0 { log::warn!("{} malformed lines skipped in {}", loaded.skipped, path.display()); }
    let counts = aggregate::count_by_level(&loaded.records);
    if counts.is_empty() { log::warn!("No log entries in {}", path.display()); }
    log::info!("{} records across {} levels in {} ({} errors)", counts.total(), counts.len(), path.display(), counts.get("ERROR").unwrap_or(0));
    let level = args.level.as_deref();
    match args.output.unwrap_or(OutputFmt::Text) {
        OutputFmt::Json => {
            // counts are still emitted when the requested level is rejected
            let checked = level.map(str::parse::<Level>).transpose();
            let shown = if checked.is_ok() { level } else { None };
            let rep = JsonReport::new(path, &loaded.records, &counts, loaded.skipped, shown)?;
            let s = serde_json::to_string_pretty(&rep).context("serializing report")?;
            writeln!(out, "{}", s).context("writing report")?;
            checked.map_err(ReportError::from)?;
        }
        OutputFmt::Text => {
            write!(out, "{}", report::render_counts(&counts)).context("writing counts")?;
            if let Some(l) = level {
                let body = match args.text_format.unwrap_or(TextFormat::Lines) {
                    TextFormat::Lines => report::render_filtered(&loaded.records, l)?,
                    TextFormat::Table => report::render_filtered_table(&loaded.records, l)?,
                };
                write!(out, "\n{}", body).context("writing filtered entries")?;
            }
        }
    }
    if let Some(p) = args.csv_path.as_ref() {
        let selected: Vec<&LogRecord> = match level {
            Some(l) => filter::by_level(&loaded.records, l),
            None => loaded.records.iter().collect(),
        };
        write_csv(p, &selected).with_context(|| format!("CSV write failed for {}", p.display()))?;
        log::info!("CSV written: {} ({} rows)", p.display(), selected.len());
    }
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Option<AppConfig>> {
    let s = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context("reading config"),
    };
    let cfg = toml::from_str::<AppConfig>(&s).context("parsing config")?;
    Ok(Some(cfg))
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.output.is_none() && let Some(v) = cfg.output { args.output = Some(v); }
    if args.text_format.is_none() && let Some(v) = cfg.text_format { args.text_format = Some(v); }
    if let Some(v) = cfg.lenient { args.lenient |= v; }
    if args.csv_path.is_none() && let Some(v) = cfg.csv_path { args.csv_path = Some(v); }
    if let Some(v) = cfg.no_color { args.no_color |= v; }
    if let Some(v) = cfg.force_color { args.force_color |= v; }
    if args.log_level.is_none() && let Some(v) = cfg.log_level { args.log_level = Some(v); }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
}

fn init_logger(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if args.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if let Some(lvl) = args.log_level {
        let f = match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace };
        builder.filter_level(f);
    } else if args.verbose > 0 {
        let f = if args.verbose >= 3 { log::LevelFilter::Trace } else if args.verbose == 2 { log::LevelFilter::Debug } else { log::LevelFilter::Info };
        builder.filter_level(f);
    }
    match args.log_format {
        Some(LogFormat::Json) => {
            builder.format(|buf, record| {
                let ts = chrono::Local::now().to_rfc3339();
                let obj = serde_json::json!({
                    "ts": ts,
                    "level": record.level().to_string(),
                    "target": record.target(),
                    "msg": record.args().to_string(),
                });
                writeln!(buf, "{}", obj)
            });
        }
        Some(LogFormat::Text) => {
            builder.format(|buf, record| {
                let ts = chrono::Local::now().format("%H:%M:%S");
                writeln!(buf, "[{:<5} {}] {}", record.level(), ts, record.args())
            });
        }
        None => {}
    }
    if let Some(path) = args.log_path.as_ref() {
        match std::fs::File::create(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => { eprintln!("Failed to open log file {}: {}", path.display(), e); }
        }
    }
    builder.init();
}

fn write_csv(path: &Path, records: &[&LogRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["date", "time", "level", "message"])?;
    for r in records {
        wtr.write_record([r.date.as_str(), r.time.as_str(), r.level.as_str(), r.message.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn paint(s: &str, code: &str) -> String {
    if *ENABLE_COLOR.get().unwrap_or(&false) { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "2024-01-01 10:00:00 INFO Service started\n2024-01-01 10:00:05 ERROR Connection failed\n2024-01-01 10:00:06 INFO Retry scheduled\n";

    fn fixture(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let p = dir.path().join("app.log");
        std::fs::write(&p, content).unwrap();
        p
    }

    fn base_args(p: &Path, level: Option<&str>) -> Args {
        Args { log_file: Some(p.to_path_buf()), level: level.map(str::to_string), ..Default::default() }
    }

    fn run_to_string(args: &Args) -> (Result<(), AppError>, String) {
        let mut buf: Vec<u8> = Vec::new();
        let res = run(args, &mut buf);
        (res, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn counts_then_filtered_entries() {
        let dir = tempfile::tempdir().unwrap();
        let p = fixture(&dir, SAMPLE);
        let (res, out) = run_to_string(&base_args(&p, Some("info")));
        assert!(res.is_ok());
        let expected = "\
-------------------------------------------
|          LOG LEVELS          |  COUNT   |
-------------------------------------------
|INFO                          |    2     |
|ERROR                         |    1     |
-------------------------------------------

Logs with level: 'INFO'
2024-01-01 10:00:00 - Service started
2024-01-01 10:00:06 - Retry scheduled
";
        assert_eq!(out, expected);
    }

    #[test]
    fn unsupported_level_after_table() {
        let dir = tempfile::tempdir().unwrap();
        let p = fixture(&dir, SAMPLE);
        let (res, out) = run_to_string(&base_args(&p, Some("trace")));
        let err = res.unwrap_err();
        assert!(matches!(err, AppError::Report(_)));
        assert_eq!(err.to_string(), "Unsupported log level: TRACE");
        assert_eq!(err.exit_code(), 1);
        assert!(out.contains("|ERROR                         |    1     |"));
        assert!(!out.contains("Logs with level"));
    }

    #[test]
    fn missing_file_message() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("missing.log");
        let (res, out) = run_to_string(&base_args(&p, None));
        assert_eq!(res.unwrap_err().to_string(), format!("File '{}' not found.", p.display()));
        assert!(out.is_empty());
    }

    #[test]
    fn missing_log_file_is_usage_error() {
        let (res, _) = run_to_string(&Args::default());
        let err = res.unwrap_err();
        assert!(err.to_string().starts_with("Usage:"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn too_many_positionals_rejected_by_parser() {
        assert!(Args::try_parse_from(["logtally", "a.log", "info", "extra"]).is_err());
        let a = Args::try_parse_from(["logtally", "a.log", "info"]).unwrap();
        assert_eq!(a.log_file, Some(PathBuf::from("a.log")));
        assert_eq!(a.level.as_deref(), Some("info"));
    }

    #[test]
    fn lenient_flag_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let p = fixture(&dir, "d t INFO ok\ngarbage\nd t DEBUG fine\n");
        let (res, _) = run_to_string(&base_args(&p, None));
        assert!(matches!(res, Err(AppError::Load(LoadError::Malformed { line_no: 2, .. }))));
        let mut a = base_args(&p, None);
        a.lenient = true;
        let (res, out) = run_to_string(&a);
        assert!(res.is_ok());
        assert!(out.contains("|DEBUG                         |    1     |"));
    }

    #[test]
    fn json_output_and_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let p = fixture(&dir, SAMPLE);
        let csv_path = dir.path().join("out.csv");
        let mut a = base_args(&p, Some("info"));
        a.output = Some(OutputFmt::Json);
        a.csv_path = Some(csv_path.clone());
        let (res, out) = run_to_string(&a);
        assert!(res.is_ok());
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["counts"], serde_json::json!([["INFO", 2], ["ERROR", 1]]));
        assert_eq!(v["records"][1]["message"], "Retry scheduled");
        let data = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(data, "date,time,level,message\n2024-01-01,10:00:00,INFO,Service started\n2024-01-01,10:00:06,INFO,Retry scheduled\n");
    }

    #[test]
    fn table_text_format() {
        let dir = tempfile::tempdir().unwrap();
        let p = fixture(&dir, SAMPLE);
        let mut a = base_args(&p, Some("ERROR"));
        a.text_format = Some(TextFormat::Table);
        let (res, out) = run_to_string(&a);
        assert!(res.is_ok());
        assert!(out.contains("Logs with level: 'ERROR'"));
        assert!(out.contains("Connection failed"));
    }

    #[test]
    fn config_fills_unset_args_only() {
        let cfg: AppConfig = toml::from_str("output = \"json\"\ntext_format = \"table\"\nlenient = true\nlog_format = \"json\"\n").unwrap();
        let mut a = Args::default();
        apply_config(&mut a, cfg);
        assert_eq!(a.output, Some(OutputFmt::Json));
        assert_eq!(a.text_format, Some(TextFormat::Table));
        assert!(a.lenient);
        assert!(matches!(a.log_format, Some(LogFormat::Json)));
        assert_eq!(a.level, None);
    }

    #[test]
    fn explicit_cli_formats_beat_config() {
        let cfg: AppConfig = toml::from_str("output = \"json\"\ntext_format = \"table\"\n").unwrap();
        let mut a = Args::try_parse_from(["logtally", "--output", "text", "--text-format", "lines", "a.log"]).unwrap();
        apply_config(&mut a, cfg);
        assert_eq!(a.output, Some(OutputFmt::Text));
        assert_eq!(a.text_format, Some(TextFormat::Lines));
    }

    #[test]
    fn config_cannot_supply_filter_level() {
        assert!(toml::from_str::<AppConfig>("level = \"debug\"\n").is_err());
    }

    #[test]
    fn json_unsupported_level_still_emits_counts() {
        let dir = tempfile::tempdir().unwrap();
        let p = fixture(&dir, SAMPLE);
        let mut a = base_args(&p, Some("trace"));
        a.output = Some(OutputFmt::Json);
        let (res, out) = run_to_string(&a);
        let err = res.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported log level: TRACE");
        assert_eq!(err.exit_code(), 1);
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["counts"], serde_json::json!([["INFO", 2], ["ERROR", 1]]));
        assert!(v.get("level").is_none());
        assert!(v.get("records").is_none());
    }

    #[test]
    fn config_missing_file_is_none_and_bad_keys_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("absent.toml")).unwrap().is_none());
        let p = dir.path().join("bad.toml");
        std::fs::write(&p, "colour = true\n").unwrap();
        assert!(load_config(&p).is_err());
    }
}
