use tracing::{info, instrument, warn};

use crate::engine::collector::Collector;
use crate::engine::types::{Group, Record, SessionError, SessionState};

/// Counters for one ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub received: u64,
    pub inserted: u64,
    pub malformed: u64,
    pub ignored_empty: u64,
    pub oversized: u64,
    pub transport_errors: u64,
}

/// One ingestion run. Starts `Open`, moves to `Closed` exactly once.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    collector: Collector,
    pub stats: SessionStats,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        info!("Opened ingestion session");
        Self { state: SessionState::Open, collector: Collector::new(), stats: SessionStats::default() }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn buffered(&self) -> usize {
        self.collector.len()
    }

    pub fn insert(&mut self, record: Record) -> Result<(), SessionError> {
        if !self.is_open() {
            warn!(symbol = %record.symbol, sequence = record.sequence, "Insert after close rejected");
            return Err(SessionError::Closed);
        }
        self.collector.insert(record);
        self.stats.inserted += 1;
        Ok(())
    }

    /// Close the session and hand out its groups. Only the first call succeeds.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> Result<Vec<Group>, SessionError> {
        if !self.is_open() {
            return Err(SessionError::Closed);
        }
        self.state = SessionState::Closed;
        let collector = std::mem::take(&mut self.collector);
        info!(records = collector.len(), stats = ?self.stats, "Session closed");
        Ok(collector.into_groups())
    }
}
