use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O failure exporting {symbol}: {source}")]
    Io {
        symbol: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV failure exporting {symbol}: {source}")]
    Csv {
        symbol: String,
        #[source]
        source: csv::Error,
    },
}

impl ExportError {
    pub fn symbol(&self) -> &str {
        match self {
            ExportError::Io { symbol, .. } | ExportError::Csv { symbol, .. } => symbol,
        }
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Outcome for one symbol group.
#[derive(Debug)]
pub struct GroupReport {
    pub symbol: String,
    pub rows: u64,
    pub artifact: Option<PathBuf>,
    pub error: Option<ExportError>,
}

impl GroupReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// `<symbol> Rows: <count>`
    pub fn summary_line(&self) -> String {
        format!("{} Rows: {}", self.symbol, self.rows)
    }
}

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub groups: Vec<GroupReport>,
}

impl ExportSummary {
    pub fn total_rows(&self) -> u64 {
        self.groups.iter().filter(|g| g.is_ok()).map(|g| g.rows).sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|g| !g.is_ok())
    }

    pub fn is_complete(&self) -> bool {
        self.groups.iter().all(GroupReport::is_ok)
    }
}
