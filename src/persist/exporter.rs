//! Grouped export: one artifact per symbol, one summary line per closed artifact.
//!
//! A failing group never stops the rest; its error is kept in the summary and logged.

use std::io::Write;

use tracing::{error, info, instrument, warn};

use crate::engine::types::Group;
use crate::persist::types::{ExportSummary, GroupReport};
use crate::persist::GroupSink;

pub struct Exporter<S, W> {
    sink: S,
    summary_out: W,
}

impl<S: GroupSink, W: Write> Exporter<S, W> {
    pub fn new(sink: S, summary_out: W) -> Self {
        Self { sink, summary_out }
    }

    pub fn into_parts(self) -> (S, W) {
        (self.sink, self.summary_out)
    }

    /// Emit every group in the order given (ascending symbol, as the collector yields them).
    #[instrument(skip_all, fields(groups = groups.len()))]
    pub fn emit(&mut self, groups: Vec<Group>) -> ExportSummary {
        let mut summary = ExportSummary::default();

        for group in groups {
            let report = match self.sink.write_group(&group) {
                Ok(path) => {
                    metrics::counter!("tickx_export_rows_total").increment(group.row_count);
                    let report = GroupReport {
                        symbol: group.symbol,
                        rows: group.row_count,
                        artifact: Some(path),
                        error: None,
                    };
                    if let Err(e) = writeln!(self.summary_out, "{}", report.summary_line()) {
                        warn!(symbol = %report.symbol, error = %e, "Failed to write summary line");
                    }
                    info!(symbol = %report.symbol, rows = report.rows, "Exported group");
                    report
                }
                Err(e) => {
                    metrics::counter!("tickx_export_failures_total").increment(1);
                    error!(symbol = %group.symbol, rows = group.row_count, error = %e, "Group export failed");
                    GroupReport { symbol: group.symbol, rows: group.row_count, artifact: None, error: Some(e) }
                }
            };
            summary.groups.push(report);
        }

        if let Err(e) = self.summary_out.flush() {
            warn!(error = %e, "Failed to flush summary output");
        }
        summary
    }
}
