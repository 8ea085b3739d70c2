// Queue fragmentation benchmark: build one price level where only every
// ratio-th order survives cancellation, then time match calls as the head
// cursor skips the tombstones between survivors.
//
// Usage: bench_fragmentation <active_orders> <fragmentation_ratio> <match_quantity>

use std::path::PathBuf;
use std::time::Instant;

use log::info;
use matchbook::sim::LatencyRecorder;
use matchbook::{BookConfig, OrderBook, OrderId, Quantity, Side, CHUNK_ORDERS};

const TEST_PRICE: i64 = 5000;
const TAKER_ORDER_ID: OrderId = 99_999_999;

fn usage() -> ! {
    eprintln!("Usage: bench_fragmentation <active_orders> <fragmentation_ratio> <match_quantity>");
    std::process::exit(1);
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let active_orders: u64 = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| usage());
    let ratio: u64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| usage());
    let match_qty: Quantity = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| usage());
    if active_orders == 0 || ratio == 0 || match_qty == 0 {
        usage();
    }

    let total_orders = active_orders * ratio;
    info!(
        "fragmentation test: {} active orders, 1 survivor per {} added ({} total)",
        active_orders, ratio, total_orders
    );

    // Every cancelled order is a tombstone pinning its chunk until the
    // match head walks past, so the chunk pool covers all pushes.
    let book_cfg = BookConfig {
        max_clients: 4,
        max_orders_per_client: (total_orders + 1).min(u32::MAX as u64) as u32,
        chunk_pool_capacity: (total_orders / CHUNK_ORDERS as u64 + 8).min(u32::MAX as u64 - 1)
            as u32,
        ..BookConfig::default()
    };
    let mut book = OrderBook::with_config(1, book_cfg);

    let build_start = Instant::now();
    for id in 0..total_orders {
        book.add_order(1, id, id, Side::Buy, TEST_PRICE, 1)?;
    }
    for id in 0..total_orders {
        if (id + 1) % ratio != 0 {
            book.remove_order(1, id);
        }
    }
    info!(
        "built fragmented level in {:.3}s",
        build_start.elapsed().as_secs_f64()
    );

    let mut latencies = LatencyRecorder::with_capacity(active_orders as usize);
    let mut matched = 0u64;
    let mut attempts = 0u64;
    while matched < active_orders {
        attempts += 1;
        let start = Instant::now();
        let result = book.match_order(2, TAKER_ORDER_ID, Side::Sell, TEST_PRICE, match_qty);
        let elapsed = start.elapsed();
        let count = result.matches.len() as u64;
        if count == 0 {
            eprintln!(
                "expected a match on attempt {attempts} but found none \
                 ({matched} of {active_orders} matched)"
            );
            break;
        }
        latencies.record(elapsed);
        matched += count;
    }

    println!("--- fragmentation test complete ---");
    latencies.report("MATCH over fragmented queue");
    latencies.save(&PathBuf::from(format!(
        "latencies_fragmentation_{active_orders}x{ratio}.txt"
    )))?;

    Ok(())
}
