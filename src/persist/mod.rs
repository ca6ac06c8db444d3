pub mod types;
pub use types::*;
pub mod exporter;
pub mod csv_sink;

use std::path::PathBuf;

use crate::engine::types::Group;

/// Destination for exported groups. One call per symbol, in ascending symbol order.
pub trait GroupSink {
    /// Write the whole group into a fresh artifact and close it before returning.
    fn write_group(&mut self, group: &Group) -> ExportResult<PathBuf>;
}
