use clap::Parser;
use std::collections::HashMap;

/// Largest index whose Fibonacci number fits in a u128.
const MAX_INDEX: i64 = 186;

#[derive(Parser, Debug)]
#[command(name = "fibonacci", about = "Memoized Fibonacci numbers")]
struct Args {
    /// Indices to compute
    #[arg(default_values_t = [10, 15], allow_negative_numbers = true)]
    numbers: Vec<i64>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("fib({0}) does not fit in 128 bits")]
struct Overflow(i64);

/// Owns its memo table; repeated lookups reuse earlier results.
#[derive(Debug, Default)]
struct Fibonacci {
    cache: HashMap<i64, u128>,
}

impl Fibonacci {
    fn get(&mut self, n: i64) -> Result<u128, Overflow> {
        if n > MAX_INDEX { return Err(Overflow(n)); }
        Ok(self.calc(n))
    }

    fn calc(&mut self, n: i64) -> u128 {
        if n <= 0 { return 0; }
        if n == 1 { return 1; }
        if let Some(v) = self.cache.get(&n) { return *v; }
        let v = self.calc(n - 1) + self.calc(n - 2);
        self.cache.insert(n, v);
        v
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let mut fib = Fibonacci::default();
    for n in args.numbers {
        match fib.get(n) {
            Ok(v) => println!("{}", v),
            Err(e) => println!("{}", e),
        }
    }
    log::debug!("memo table holds {} entries", fib.cache.len());
}
