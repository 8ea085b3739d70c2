// Binary simulation event records: the input shape for replay and
// benchmark drivers.
// - native little-endian, 32 bytes per record
// - #[repr(C)] with zerocopy for safe cast to/from bytes

use std::fs::{self, File};
use std::io::Write;
use std::mem;
use std::path::Path;

use anyhow::Context;
use zerocopy::{AsBytes, FromBytes};

use crate::types::{ClientId, OrderId, Price, Quantity, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    Add = 0,
    Cancel = 1,
    Match = 2,
    Prefill = 3,
}

impl EventKind {
    #[inline]
    pub fn from_u8(v: u8) -> Option<EventKind> {
        match v {
            0 => Some(EventKind::Add),
            1 => Some(EventKind::Cancel),
            2 => Some(EventKind::Match),
            3 => Some(EventKind::Prefill),
            _ => None,
        }
    }
}

/// One recorded book operation. Field order keeps the struct free of
/// implicit padding so it can be written to disk as raw bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, AsBytes)]
pub struct SimEvent {
    pub order_id: u64,
    pub price: i64,
    pub qty: u32,
    pub client_id: u32,
    pub side: u8,
    pub kind: u8,
    pub _pad: [u8; 6],
}

const _: () = assert!(mem::size_of::<SimEvent>() == 32);

impl SimEvent {
    pub fn new(
        kind: EventKind,
        order_id: OrderId,
        price: Price,
        qty: Quantity,
        side: Side,
        client_id: ClientId,
    ) -> Self {
        Self {
            order_id,
            price,
            qty,
            client_id,
            side: side as u8,
            kind: kind as u8,
            _pad: [0; 6],
        }
    }

    #[inline]
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_u8(self.kind)
    }

    #[inline]
    pub fn side(&self) -> Side {
        Side::from_u8(self.side)
    }
}

pub fn write_events(path: &Path, events: &[SimEvent]) -> anyhow::Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("create event file {}", path.display()))?;
    file.write_all(events.as_bytes())
        .with_context(|| format!("write event file {}", path.display()))?;
    Ok(())
}

pub fn read_events(path: &Path) -> anyhow::Result<Vec<SimEvent>> {
    let bytes =
        fs::read(path).with_context(|| format!("read event file {}", path.display()))?;
    let record = mem::size_of::<SimEvent>();
    let chunks = bytes.chunks_exact(record);
    if !chunks.remainder().is_empty() {
        anyhow::bail!(
            "event file {} is {} bytes, not a whole number of {}-byte records",
            path.display(),
            bytes.len(),
            record
        );
    }
    let mut events = Vec::with_capacity(bytes.len() / record);
    for chunk in chunks {
        // read_from copies, so the byte buffer's alignment does not matter.
        let event = SimEvent::read_from(chunk).context("malformed event record")?;
        events.push(event);
    }
    Ok(events)
}
