// Market data module entrypoint
pub mod parser;    // wire payload -> Record
pub mod listener;  // UDP receive loop driving one session
pub mod sender;    // streams a tick file as datagrams
