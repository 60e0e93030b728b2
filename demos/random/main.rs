use std::env;
use std::process;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use kmmatching::{KuhnMunkres, Matrix, Weight};

const N: usize = 10;

// Usage: random [SIZE] [SEED] [--min]
// Without a seed a fresh one is drawn and printed, so a run can be repeated.
fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    let minimize = args.iter().any(|a| a == "--min");
    let mut positional = args.iter().filter(|a| !a.starts_with("--"));

    let n: usize = match positional.next() {
        Some(s) => s.parse().unwrap_or_else(|_| usage(&format!("bad size {:?}", s))),
        None => N,
    };
    let seed: u64 = match positional.next() {
        Some(s) => s.parse().unwrap_or_else(|_| usage(&format!("bad seed {:?}", s))),
        None => rand::thread_rng().gen(),
    };
    println!("size = {} seed = {}", n, seed);

    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(seed);
    let weights: Matrix = (0..n)
        .map(|_| (0..n).map(|_| rng.gen_range(0..100) as Weight / 100.0).collect())
        .collect();
    // Maximizing the negated weights minimizes the original ones.
    let weights = if minimize { reverse(&weights) } else { weights };

    let now = Instant::now();
    let (assignment, total) = match KuhnMunkres::new(weights) {
        Ok(mut km) => km.solve(),
        Err(e) => usage(&e.to_string()),
    };
    println!("Elapsed time: {:?}", now.elapsed());

    if minimize {
        println!("cost = {}", -total);
    } else {
        println!("reward = {}", total);
    }
    let columns: Vec<String> = assignment.iter().map(|j| j.to_string()).collect();
    println!("assignment: {}", columns.join(" "));
}

fn reverse(weights: &Matrix) -> Matrix {
    weights.iter().map(|row| row.iter().map(|w| -w).collect()).collect()
}

fn usage(message: &str) -> ! {
    eprintln!("{}", message);
    eprintln!("usage: random [SIZE] [SEED] [--min]");
    process::exit(1)
}
