use std::collections::BTreeMap;

use itertools::Itertools;
use smallvec::SmallVec;
use tracing::{debug, info, instrument, trace};

use crate::engine::types::{Group, Record, RecordKey, Tick};

// Records sharing a key keep their own tick, in arrival order.
type Ticks = SmallVec<[Tick; 1]>;

/// Ordered multiset of records under the canonical ordering.
#[derive(Debug, Default, PartialEq)]
pub struct Collector {
    entries: BTreeMap<RecordKey, Ticks>,
    len: usize,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // O(log n): one tree lookup, duplicates land in the same slot
    pub fn insert(&mut self, record: Record) {
        let (key, tick) = record.into_key_and_tick();
        trace!(symbol = %key.symbol, price = tick.price, sequence = key.sequence.0, "Buffering record");
        self.entries.entry(key).or_default().push(tick);
        self.len += 1;
    }

    /// Canonical-order walk over everything buffered so far.
    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        self.entries
            .iter()
            .flat_map(|(key, ticks)| ticks.iter().map(move |&tick| key.to_record(tick)))
    }

    /// Consume the buffer and split it into one group per symbol, ascending.
    #[instrument(skip(self), fields(records = self.len))]
    pub fn into_groups(self) -> Vec<Group> {
        let chunks = self.entries.into_iter().chunk_by(|(key, _)| key.symbol.clone());

        let mut groups = Vec::new();
        for (symbol, chunk) in &chunks {
            let records: Vec<Record> = chunk
                .flat_map(|(key, ticks)| ticks.into_iter().map(move |tick| key.to_record(tick)))
                .collect();
            debug!(symbol = %symbol, rows = records.len(), "Grouped symbol");
            groups.push(Group { symbol, row_count: records.len() as u64, records });
        }
        info!(groups = groups.len(), "Collector drained into groups");
        groups
    }
}
