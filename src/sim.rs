// src/sim.rs
//
// Scenario-driven market simulation shared by the driver binaries: a
// deterministic order-flow generator (seeded ChaCha8, normal-distributed
// prices around a base) plus latency bookkeeping. The generator keeps its
// own live-order map so cancels and matches always reference real orders.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use hashbrown::HashMap;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::book::{BookConfig, OrderBook};
use crate::error::Error;
use crate::events::{EventKind, SimEvent};
use crate::queue::CHUNK_ORDERS;
use crate::types::{ClientId, OrderId, Price, Quantity, Side};

/// Client ids used by generated flow: one maker posting resting orders,
/// one taker sending crossing orders.
pub const MAKER_CLIENT: ClientId = 1;
pub const TAKER_CLIENT: ClientId = 2;

/// How far from the base price taker orders reach into the book.
const TAKER_PRICE_OFFSET: Price = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    pub scenario: String,
    pub total_events: u64,
    pub initial_depth: u64,
    /// One match order per this many events (roughly).
    pub order_to_trade_ratio: u32,
    /// Of the non-match events, the percentage that are adds.
    pub add_probability_percent: u32,
    pub base_price: Price,
    pub price_std_dev: f64,
}

impl SimConfig {
    /// Built-in scenario mixes.
    pub fn preset(scenario: &str, price_std_dev: f64, total_events: u64) -> Option<SimConfig> {
        let (order_to_trade_ratio, add_probability_percent, initial_depth) = match scenario {
            "add_heavy" => (50, 80, 100_000),
            "cancel_heavy" => (50, 20, 1_000_000),
            "match_heavy" => (5, 55, 1_000_000),
            "balanced" => (5, 60, 20_000),
            _ => return None,
        };
        Some(SimConfig {
            scenario: scenario.to_string(),
            total_events,
            initial_depth,
            order_to_trade_ratio,
            add_probability_percent,
            base_price: 5000,
            price_std_dev,
        })
    }

    pub fn from_file(path: &Path) -> anyhow::Result<SimConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read simulation config {}", path.display()))?;
        let cfg: SimConfig = toml::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.total_events == 0 {
            anyhow::bail!("total_events must be > 0");
        }
        if self.order_to_trade_ratio == 0 {
            anyhow::bail!("order_to_trade_ratio must be > 0");
        }
        if self.add_probability_percent > 100 {
            anyhow::bail!("add_probability_percent must be in [0, 100]");
        }
        if self.price_std_dev <= 0.0 {
            anyhow::bail!("price_std_dev must be positive");
        }
        Ok(())
    }

    /// Book sized for this scenario. Every push pins chunk memory until the
    /// head cursor passes it, so the chunk pool covers the worst case of
    /// prefill plus every flow event being an add.
    pub fn book_config(&self) -> BookConfig {
        let defaults = BookConfig::default();
        let pushes = self.initial_depth + self.total_events;
        let id_space = (pushes + 1).min(u32::MAX as u64) as u32;
        let chunks = (pushes / CHUNK_ORDERS as u64 + defaults.max_price_levels as u64 + 8)
            .min(u32::MAX as u64 - 1) as u32;
        BookConfig {
            max_clients: 4,
            max_orders_per_client: id_space,
            chunk_pool_capacity: chunks,
            ..defaults
        }
    }
}

/// What one simulation step did to the book.
#[derive(Debug, Clone, Copy)]
pub enum SimOp {
    Add {
        order_id: OrderId,
        side: Side,
        price: Price,
        qty: Quantity,
    },
    Cancel {
        order_id: OrderId,
        side: Side,
        price: Price,
        qty: Quantity,
    },
    Match {
        order_id: OrderId,
        side: Side,
        price: Price,
        qty: Quantity,
    },
}

impl SimOp {
    pub fn to_event(&self, prefill: bool) -> SimEvent {
        match *self {
            SimOp::Add {
                order_id,
                side,
                price,
                qty,
            } => {
                let kind = if prefill {
                    EventKind::Prefill
                } else {
                    EventKind::Add
                };
                SimEvent::new(kind, order_id, price, qty, side, MAKER_CLIENT)
            }
            SimOp::Cancel {
                order_id,
                side,
                price,
                qty,
            } => SimEvent::new(EventKind::Cancel, order_id, price, qty, side, MAKER_CLIENT),
            SimOp::Match {
                order_id,
                side,
                price,
                qty,
            } => SimEvent::new(EventKind::Match, order_id, price, qty, side, TAKER_CLIENT),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveOrder {
    price: Price,
    qty: Quantity,
    side: Side,
}

pub struct StepOutcome {
    pub op: SimOp,
    pub latency: Duration,
}

pub struct Simulator {
    cfg: SimConfig,
    rng: ChaCha8Rng,
    price_dist: Normal<f64>,
    price_lo: Price,
    price_hi: Price,
    active: HashMap<OrderId, ActiveOrder>,
    active_ids: Vec<OrderId>,
    next_order_id: OrderId,
    steps: u64,
}

impl Simulator {
    /// `price_window` is the book's price-table size; generated prices are
    /// clamped into one window around the base so no two live prices can
    /// collide in the direct-mapped table.
    pub fn new(cfg: SimConfig, seed: u64, price_window: u32) -> Simulator {
        let half = (price_window / 2) as Price;
        let price_dist = Normal::new(cfg.base_price as f64, cfg.price_std_dev)
            .expect("validated std dev");
        Simulator {
            price_lo: cfg.base_price - half + 1,
            price_hi: cfg.base_price + half - 1,
            price_dist,
            rng: ChaCha8Rng::seed_from_u64(seed),
            active: HashMap::new(),
            active_ids: Vec::new(),
            next_order_id: 0,
            steps: 0,
            cfg,
        }
    }

    pub fn live_orders(&self) -> usize {
        self.active.len()
    }

    #[inline]
    fn gen_price(&mut self) -> Price {
        let price = self.price_dist.sample(&mut self.rng).round() as Price;
        price.clamp(self.price_lo, self.price_hi)
    }

    #[inline]
    fn gen_qty(&mut self) -> Quantity {
        self.rng.gen_range(1..=100)
    }

    /// Seed the book with resting orders around the base price, invoking
    /// `on_op` for each one.
    pub fn prefill(
        &mut self,
        book: &mut OrderBook,
        mut on_op: impl FnMut(&SimOp),
    ) -> anyhow::Result<()> {
        for _ in 0..self.cfg.initial_depth {
            let op = self.do_add(book)?;
            on_op(&op);
        }
        info!(
            "prefilled book with {} resting orders",
            self.cfg.initial_depth
        );
        Ok(())
    }

    /// One flow event: add, cancel or match per the scenario mix. Returns
    /// `None` when a cancel found nothing live to cancel.
    pub fn step(&mut self, book: &mut OrderBook) -> anyhow::Result<Option<StepOutcome>> {
        let step = self.steps;
        self.steps += 1;
        let action = self.rng.gen_range(1..=self.cfg.order_to_trade_ratio);
        if action < self.cfg.order_to_trade_ratio {
            if self.rng.gen_range(1..=100) <= self.cfg.add_probability_percent {
                let start = Instant::now();
                let op = self.do_add(book)?;
                let latency = start.elapsed();
                Ok(Some(StepOutcome { op, latency }))
            } else {
                Ok(self.do_cancel(book))
            }
        } else {
            let side = if step % 2 == 0 { Side::Sell } else { Side::Buy };
            Ok(Some(self.do_match(book, side)))
        }
    }

    fn do_add(&mut self, book: &mut OrderBook) -> anyhow::Result<SimOp> {
        let price = self.gen_price();
        let qty = self.gen_qty();
        let side = if price < self.cfg.base_price {
            Side::Buy
        } else {
            Side::Sell
        };
        let order_id = self.next_order_id;
        self.next_order_id += 1;

        match book.add_order(MAKER_CLIENT, order_id, order_id, side, price, qty) {
            Ok(()) => {}
            Err(e @ Error::PoolExhausted { .. }) => {
                return Err(e).context("book undersized for scenario")
            }
            Err(e) => return Err(e.into()),
        }
        self.active.insert(order_id, ActiveOrder { price, qty, side });
        self.active_ids.push(order_id);
        Ok(SimOp::Add {
            order_id,
            side,
            price,
            qty,
        })
    }

    fn do_cancel(&mut self, book: &mut OrderBook) -> Option<StepOutcome> {
        // Ids stay in the vec after a match consumes them; skip a few stale
        // picks before giving up on this step.
        for _ in 0..3 {
            if self.active_ids.is_empty() {
                return None;
            }
            let pick = self.rng.gen_range(0..self.active_ids.len());
            let order_id = self.active_ids.swap_remove(pick);
            if let Some(order) = self.active.remove(&order_id) {
                let start = Instant::now();
                book.remove_order(MAKER_CLIENT, order_id);
                let latency = start.elapsed();
                return Some(StepOutcome {
                    op: SimOp::Cancel {
                        order_id,
                        side: order.side,
                        price: order.price,
                        qty: order.qty,
                    },
                    latency,
                });
            }
        }
        None
    }

    fn do_match(&mut self, book: &mut OrderBook, side: Side) -> StepOutcome {
        let price = match side {
            Side::Sell => self.cfg.base_price - TAKER_PRICE_OFFSET,
            _ => self.cfg.base_price + TAKER_PRICE_OFFSET,
        };
        let qty = self.gen_qty() * 5;
        let order_id = self.next_order_id;
        self.next_order_id += 1;

        let start = Instant::now();
        let result = book.match_order(TAKER_CLIENT, order_id, side, price, qty);
        let latency = start.elapsed();
        for m in result.matches {
            if m.matched_remaining_qty == 0 {
                self.active.remove(&m.matched_order_id);
            }
        }
        StepOutcome {
            op: SimOp::Match {
                order_id,
                side,
                price,
                qty,
            },
            latency,
        }
    }
}

/// Per-operation latency samples with the usual tail summary.
#[derive(Default)]
pub struct LatencyRecorder {
    samples_us: Vec<f64>,
}

impl LatencyRecorder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples_us: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn record(&mut self, latency: Duration) {
        self.samples_us.push(latency.as_secs_f64() * 1e6);
    }

    pub fn len(&self) -> usize {
        self.samples_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_us.is_empty()
    }

    /// Print the summary block for this operation type.
    pub fn report(&mut self, label: &str) {
        if self.samples_us.is_empty() {
            println!("--- {label}: no samples ---");
            return;
        }
        self.samples_us.sort_by(f64::total_cmp);
        let count = self.samples_us.len();
        let total: f64 = self.samples_us.iter().sum();
        let mean = total / count as f64;
        let p99 = self.samples_us[(count as f64 * 0.99) as usize];
        let p999 = self.samples_us[(count as f64 * 0.999) as usize];
        let variance = self
            .samples_us
            .iter()
            .map(|s| (s - mean) * (s - mean))
            .sum::<f64>()
            / count as f64;
        let throughput = count as f64 / (total / 1e6);

        println!("--- {label} ---");
        println!("total time: {total:.2} us over {count} ops");
        println!("avg latency: {mean:.3} us");
        println!("p99 latency: {p99:.3} us");
        println!("p99.9 latency: {p999:.3} us");
        println!("min/max latency: {:.3} / {:.3} us", self.samples_us[0], self.samples_us[count - 1]);
        println!("stddev: {:.3} us", variance.sqrt());
        println!("throughput: {throughput:.0} ops/sec");
    }

    /// One sample per line, for the plotting scripts.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("create latency file {}", path.display()))?;
        let mut out = BufWriter::new(file);
        for sample in &self.samples_us {
            writeln!(out, "{sample}")?;
        }
        out.flush()?;
        info!("saved {} latency samples to {}", self.samples_us.len(), path.display());
        Ok(())
    }
}
