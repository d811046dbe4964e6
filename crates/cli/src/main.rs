//! Trace-driven prefetcher harness.
//!
//! This binary replays an annotated cache access trace against a configured
//! prefetcher and reports what it would have fetched. It performs:
//! 1. **Trace replay:** Each line is `H <hex-addr>` or `M <hex-addr>` for a
//!    hit or miss at that byte address; `#` starts a comment.
//! 2. **Host modelling:** A bookkeeping host presents a fixed MSHR level
//!    and bandwidth, remembers prefetched blocks, and flags later hits to
//!    them as useful prefetches.
//! 3. **Reporting:** A replay summary plus the engine's own final stats.

use clap::Parser;
use std::collections::HashSet;
use std::{fs, process};

use prefetch_core::common::constants::LOG2_BLOCK_SIZE;
use prefetch_core::common::Address;
use prefetch_core::config::{PrefetcherConfig, PrefetcherKind};
use prefetch_core::engine::{AccessKind, CacheAccess, CacheHost, FillEvent};

#[derive(Parser, Debug)]
#[command(
    name = "prefsim",
    author,
    version,
    about = "Trace-driven cache prefetcher harness",
    long_about = "Replay an annotated access trace against a configured prefetcher.\n\nTrace format: one access per line, `H <hex-addr>` for a hit or `M <hex-addr>` for a miss. Lines starting with `#` are skipped.\n\nExamples:\n  prefsim traces/stream.trace\n  prefsim traces/attention.trace --config configs/selector.json --mshr 0.3"
)]
struct Cli {
    /// Annotated access trace to replay.
    trace: String,

    /// JSON prefetcher configuration (defaults to the transformer stream).
    #[arg(short, long)]
    config: Option<String>,

    /// Fixed MSHR occupancy presented to the engines.
    #[arg(long, default_value_t = 0.0)]
    mshr: f64,

    /// Fixed DRAM bandwidth utilization presented to the selectors.
    #[arg(long, default_value_t = 0.0)]
    bandwidth: f64,

    /// Simulated cycles driven after each access.
    #[arg(long, default_value_t = 1)]
    cycles_per_access: u64,
}

/// Bookkeeping host for trace replay.
///
/// Accepts every prefetch, remembers the prefetched blocks and reports the
/// fixed MSHR and bandwidth levels from the command line.
struct TraceHost {
    mshr: f64,
    bandwidth: f64,
    prefetched_blocks: HashSet<u64>,
    issued_this_step: Vec<Address>,
    total_issued: u64,
}

impl TraceHost {
    fn new(mshr: f64, bandwidth: f64) -> Self {
        Self {
            mshr,
            bandwidth,
            prefetched_blocks: HashSet::new(),
            issued_this_step: Vec::new(),
            total_issued: 0,
        }
    }

    /// Consumes the prefetched-block marker for a hit, reporting usefulness.
    fn take_useful(&mut self, addr: Address) -> bool {
        self.prefetched_blocks.remove(&addr.block().val())
    }
}

impl CacheHost for TraceHost {
    fn prefetch_line(&mut self, addr: Address, _fill_this_level: bool) -> bool {
        self.prefetched_blocks.insert(addr.block().val());
        self.issued_this_step.push(addr);
        self.total_issued += 1;
        true
    }

    fn mshr_occupancy_ratio(&self) -> f64 {
        self.mshr
    }

    fn bandwidth_utilization(&self) -> f64 {
        self.bandwidth
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading config {}: {}", path, e);
                process::exit(1);
            });
            serde_json::from_str(&text).unwrap_or_else(|e| {
                eprintln!("Error parsing config {}: {}", path, e);
                process::exit(1);
            })
        }
        None => PrefetcherConfig {
            kind: PrefetcherKind::TransformerStream,
            ..PrefetcherConfig::default()
        },
    };

    let Some(mut prefetcher) = prefetch_core::build(&config) else {
        eprintln!("Config selects no prefetcher (kind = None); nothing to replay");
        process::exit(1);
    };

    let trace = fs::read_to_string(&cli.trace).unwrap_or_else(|e| {
        eprintln!("Error reading trace {}: {}", cli.trace, e);
        process::exit(1);
    });

    let num_sets = config.selector.num_sets;
    let mut host = TraceHost::new(cli.mshr, cli.bandwidth);

    let mut accesses: u64 = 0;
    let mut misses: u64 = 0;
    let mut useful: u64 = 0;

    for (line_no, line) in trace.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (tag, addr_text) = match (fields.next(), fields.next()) {
            (Some(tag), Some(addr)) => (tag, addr),
            _ => {
                eprintln!(
                    "{}:{}: malformed trace line: {}",
                    cli.trace,
                    line_no + 1,
                    line
                );
                process::exit(1);
            }
        };

        let hit = match tag {
            "H" | "h" => true,
            "M" | "m" => false,
            other => {
                eprintln!(
                    "{}:{}: expected H or M, found {}",
                    cli.trace,
                    line_no + 1,
                    other
                );
                process::exit(1);
            }
        };

        let addr_val =
            u64::from_str_radix(addr_text.trim_start_matches("0x"), 16).unwrap_or_else(|e| {
                eprintln!(
                    "{}:{}: bad address {}: {}",
                    cli.trace,
                    line_no + 1,
                    addr_text,
                    e
                );
                process::exit(1);
            });

        let addr = Address::new(addr_val);
        accesses += 1;
        if !hit {
            misses += 1;
        }

        let useful_prefetch = hit && host.take_useful(addr);
        if useful_prefetch {
            useful += 1;
        }

        let access = CacheAccess {
            addr,
            ip: Address::new(0),
            hit,
            useful_prefetch,
            kind: AccessKind::Load,
            metadata: 0,
        };
        let metadata_out = prefetcher.on_access(&mut host, &access);

        // Report the accepted prefetches back as fills so selectors can
        // attribute them through the metadata source bits.
        let issued: Vec<Address> = host.issued_this_step.drain(..).collect();
        for pf_addr in issued {
            let set = (pf_addr.val() >> LOG2_BLOCK_SIZE) as usize & (num_sets - 1);
            let fill = FillEvent {
                addr: pf_addr,
                set,
                way: 0,
                prefetch: true,
                evicted_addr: Address::new(0),
                metadata: metadata_out,
            };
            prefetcher.on_fill(&mut host, &fill);
        }

        for _ in 0..cli.cycles_per_access {
            prefetcher.on_cycle(&mut host);
            host.issued_this_step.clear();
        }
    }

    println!("==========================================================");
    println!("TRACE REPLAY SUMMARY");
    println!("==========================================================");
    println!("trace                    {}", cli.trace);
    println!("accesses                 {}", accesses);
    println!("misses                   {}", misses);
    println!("prefetches_issued        {}", host.total_issued);
    println!("useful_prefetch_hits     {}", useful);
    if host.total_issued > 0 {
        println!(
            "prefetch_accuracy        {:.2}%",
            100.0 * useful as f64 / host.total_issued as f64
        );
    }
    println!("==========================================================");
    println!();

    prefetcher.final_stats();
}
