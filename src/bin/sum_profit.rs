use clap::Parser;
use regex::Regex;
use std::sync::OnceLock;

const SAMPLE: &str = "The employee's total income consists of several parts: 1000.01 as the main income, supplemented by additional receipts of 27.45 and 324.00 dollars.";

static NUMBER_RE: OnceLock<Regex> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "sum_profit", about = "Sums the decimal amounts found in a text")]
struct Args {
    /// Text to scan (defaults to a sample income statement)
    text: Option<String>,
}

fn number_re() -> &'static Regex {
    NUMBER_RE.get_or_init(|| Regex::new(r"\d+\.\d+").expect("static pattern"))
}

/// Lazily yields every `<digits>.<digits>` amount in `text`.
fn generator_numbers(text: &str) -> impl Iterator<Item = f64> + '_ {
    number_re().find_iter(text).filter_map(|m| m.as_str().parse::<f64>().ok())
}

fn sum_profit<'a, F, I>(text: &'a str, extract: F) -> f64
where
    F: Fn(&'a str) -> I,
    I: Iterator<Item = f64>,
{
    extract(text).sum()
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let text = args.text.as_deref().unwrap_or(SAMPLE);
    log::debug!("scanning {} bytes", text.len());
    let total = sum_profit(text, generator_numbers);
    println!("Total income: {:.2}", total);
}
