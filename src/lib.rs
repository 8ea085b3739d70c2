//! matchbook: price-time priority matching core for a single instrument.
//!
//! The hot path is the [`book::OrderBook`] with its pooled price levels and
//! chunked FIFO queues; everything allocates up front and runs single-writer.
//! The `sim` and `events` modules feed the benchmark and replay drivers in
//! `src/bin/`.

pub mod book;
pub mod error;
pub mod events;
pub mod level;
pub mod pool;
pub mod queue;
pub mod sim;
pub mod types;

pub use book::{BookConfig, OrderBook, OrderInfo};
pub use error::{Error, Result};
pub use level::PriceLevel;
pub use queue::{BasicOrder, OrderHandle, CHUNK_ORDERS};
pub use types::{
    ClientId, InstrumentId, MatchResult, MatchResultSet, OrderId, Price, Quantity, Side,
    INVALID_CLIENT_ID, INVALID_INSTRUMENT_ID, INVALID_ORDER_ID, INVALID_PRICE, INVALID_QUANTITY,
};
