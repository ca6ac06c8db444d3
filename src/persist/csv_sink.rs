use std::path::PathBuf;

use tracing::debug;

use crate::engine::types::Group;
use crate::persist::types::{ExportError, ExportResult};
use crate::persist::GroupSink;

/// Writes each group to `<dir>/<symbol>.csv`, no header row.
pub struct CsvDirSink {
    dir: PathBuf,
}

impl CsvDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn artifact_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl GroupSink for CsvDirSink {
    fn write_group(&mut self, group: &Group) -> ExportResult<PathBuf> {
        let path = self.artifact_path(&group.symbol);
        let csv_err = |source: csv::Error| ExportError::Csv { symbol: group.symbol.clone(), source };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(csv_err)?;

        for record in &group.records {
            writer.write_record(record.to_row()).map_err(csv_err)?;
        }

        // Flush explicitly; dropping the writer would swallow the error
        writer.flush().map_err(|source| ExportError::Io { symbol: group.symbol.clone(), source })?;
        debug!(symbol = %group.symbol, path = %path.display(), rows = group.row_count, "Closed artifact");
        Ok(path)
    }
}
