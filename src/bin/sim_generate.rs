// Generate a binary event stream for a scenario. A book is driven while
// generating so every cancel and match in the stream references an order
// that is actually live at that point.
//
// Usage: sim_generate <scenario> <price_std_dev> <total_events>
// Output: simulation_<scenario>_<std_dev>_<events>.bin

use std::path::PathBuf;

use log::info;
use matchbook::events::write_events;
use matchbook::sim::{SimConfig, Simulator};
use matchbook::OrderBook;

fn usage() -> ! {
    eprintln!("Usage: sim_generate <scenario> <price_std_dev> <total_events>");
    eprintln!("Scenarios: add_heavy, cancel_heavy, match_heavy, balanced");
    std::process::exit(1);
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let scenario = args.get(1).unwrap_or_else(|| usage());
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

    info!(
        "generating scenario {} std_dev {} events {}",
        cfg.scenario, cfg.price_std_dev, cfg.total_events
    );

    let book_cfg = cfg.book_config();
    let mut book = OrderBook::with_config(1, book_cfg);
    let mut sim = Simulator::new(cfg.clone(), 42, book_cfg.max_price_levels);

    let mut events = Vec::with_capacity((cfg.initial_depth + cfg.total_events) as usize);
    sim.prefill(&mut book, |op| events.push(op.to_event(true)))?;
    for _ in 0..cfg.total_events {
        if let Some(outcome) = sim.step(&mut book)? {
            events.push(outcome.op.to_event(false));
        }
    }

    let path = PathBuf::from(format!(
        "simulation_{}_{}_{}.bin",
        cfg.scenario, cfg.price_std_dev, cfg.total_events
    ));
    write_events(&path, &events)?;
    info!("wrote {} events to {}", events.len(), path.display());

    Ok(())
}
