// Engine module entrypoint
pub mod types;      // Record, canonical key, Group, session state
pub mod collector;  // ordered multiset keyed by the canonical ordering
pub mod session;    // Open -> Closed state machine around the collector
