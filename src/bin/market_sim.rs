// Timed market simulation: prefill one book, run a scenario's order flow
// against it, and report per-operation latency tails.
//
// Usage: market_sim <scenario|config.toml> <price_std_dev> <total_events>
// Scenarios: add_heavy, cancel_heavy, match_heavy, balanced

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::info;
use matchbook::sim::{LatencyRecorder, SimConfig, SimOp, Simulator};
use matchbook::OrderBook;

fn usage() -> ! {
    eprintln!("Usage: market_sim <scenario|config.toml> <price_std_dev> <total_events>");
    eprintln!("Scenarios: add_heavy, cancel_heavy, match_heavy, balanced");
    std::process::exit(1);
}

fn parse_config(args: &[String]) -> anyhow::Result<SimConfig> {
    let scenario = args.get(1).unwrap_or_else(|| usage());
    if scenario.ends_with(".toml") {
        return SimConfig::from_file(Path::new(scenario));
    }
    let std_dev: f64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| usage());
    let total_events: u64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| usage());
    let cfg = SimConfig::preset(scenario, std_dev, total_events).unwrap_or_else(|| usage());
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let cfg = parse_config(&args)?;
    let book_cfg = cfg.book_config();
    info!(
        "scenario {} std_dev {} events {} (chunk pool {} chunks)",
        cfg.scenario, cfg.price_std_dev, cfg.total_events, book_cfg.chunk_pool_capacity
    );

    let mut book = OrderBook::with_config(1, book_cfg);
    let mut sim = Simulator::new(cfg.clone(), 42, book_cfg.max_price_levels);

    info!("prefilling book with {} orders...", cfg.initial_depth);
    sim.prefill(&mut book, |_| {})?;

    let mut adds = LatencyRecorder::with_capacity(cfg.total_events as usize);
    let mut cancels = LatencyRecorder::with_capacity(cfg.total_events as usize);
    let mut matches = LatencyRecorder::with_capacity(cfg.total_events as usize);

    let started = Instant::now();
    for _ in 0..cfg.total_events {
        if let Some(outcome) = sim.step(&mut book)? {
            match outcome.op {
                SimOp::Add { .. } => adds.record(outcome.latency),
                SimOp::Cancel { .. } => cancels.record(outcome.latency),
                SimOp::Match { .. } => matches.record(outcome.latency),
            }
        }
    }
    let elapsed = started.elapsed();

    println!("--- simulation complete ---");
    println!(
        "time elapsed: {:.3}s  adds: {}  cancels: {}  matches: {}  live orders: {}",
        elapsed.as_secs_f64(),
        adds.len(),
        cancels.len(),
        matches.len(),
        sim.live_orders(),
    );
    adds.report("ADD operations");
    cancels.report("CANCEL operations");
    matches.report("MATCH operations");

    let suffix = format!("{}_{}", cfg.scenario, cfg.price_std_dev as i64);
    adds.save(&PathBuf::from(format!("latencies_add_{suffix}.txt")))?;
    cancels.save(&PathBuf::from(format!("latencies_cancel_{suffix}.txt")))?;
    matches.save(&PathBuf::from(format!("latencies_match_{suffix}.txt")))?;

    Ok(())
}
