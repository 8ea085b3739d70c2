// Replay a generated event stream into a fresh book and report what it
// did. Useful both as a throughput benchmark with a fixed workload and as
// a cross-check that a stream drives the book without errors.
//
// Usage: sim_replay <events.bin>

use std::path::Path;
use std::time::Instant;

use log::info;
use matchbook::events::{read_events, EventKind};
use matchbook::{BookConfig, OrderBook, CHUNK_ORDERS};

fn usage() -> ! {
    eprintln!("Usage: sim_replay <events.bin>");
    std::process::exit(1);
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let path = args.get(1).unwrap_or_else(|| usage());
    let events = read_events(Path::new(path))?;
    info!("loaded {} events from {}", events.len(), path);

    // Size the book from the stream itself.
    let max_order_id = events.iter().map(|e| e.order_id).max().unwrap_or(0);
    let pushes = events
        .iter()
        .filter(|e| matches!(e.kind(), Some(EventKind::Add | EventKind::Prefill)))
        .count() as u64;
    let defaults = BookConfig::default();
    let book_cfg = BookConfig {
        max_clients: 4,
        max_orders_per_client: (max_order_id + 1).min(u32::MAX as u64) as u32,
        chunk_pool_capacity: (pushes / CHUNK_ORDERS as u64 + defaults.max_price_levels as u64 + 8)
            .min(u32::MAX as u64 - 1) as u32,
        ..defaults
    };
    let mut book = OrderBook::with_config(1, book_cfg);

    let mut adds = 0u64;
    let mut cancels = 0u64;
    let mut match_calls = 0u64;
    let mut fills = 0u64;
    let mut filled_qty = 0u64;
    let mut skipped = 0u64;

    let started = Instant::now();
    for event in &events {
        match event.kind() {
            Some(EventKind::Add | EventKind::Prefill) => {
                book.add_order(
                    event.client_id,
                    event.order_id,
                    event.order_id,
                    event.side(),
                    event.price,
                    event.qty,
                )?;
                adds += 1;
            }
            Some(EventKind::Cancel) => {
                book.remove_order(event.client_id, event.order_id);
                cancels += 1;
            }
            Some(EventKind::Match) => {
                let result = book.match_order(
                    event.client_id,
                    event.order_id,
                    event.side(),
                    event.price,
                    event.qty,
                );
                fills += result.matches.len() as u64;
                filled_qty += result.matches.iter().map(|m| m.quantity as u64).sum::<u64>();
                match_calls += 1;
            }
            None => skipped += 1,
        }
    }
    let elapsed = started.elapsed();

    let (bid, ask) = book.bbo();
    println!(
        "sim_replay: events={} adds={} cancels={} match_calls={} fills={} filled_qty={} \
         skipped={} time_ms={:.3} throughput_meps={:.3} final_bbo={}/{}",
        events.len(),
        adds,
        cancels,
        match_calls,
        fills,
        filled_qty,
        skipped,
        elapsed.as_secs_f64() * 1000.0,
        events.len() as f64 / 1_000_000.0 / elapsed.as_secs_f64(),
        bid.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
        ask.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
    );

    Ok(())
}
