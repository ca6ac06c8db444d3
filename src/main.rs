use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use tickx_rs::config::{Cli, Command, Settings};
use tickx_rs::market_data::listener::{Listener, ListenerError};
use tickx_rs::market_data::sender::Sender;
use tickx_rs::persist::csv_sink::CsvDirSink;
use tickx_rs::persist::exporter::Exporter;
use tickx_rs::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    settings.apply_cli(&cli.command);

    telemetry::init_tracing(&settings.log_filter);
    telemetry::init_metrics().context("starting metrics exporter")?;

    match cli.command {
        Command::Listen { .. } => listen(&settings).await,
        Command::Send { file, .. } => {
            let sender = Sender::connect(&settings.target_addr)
                .await
                .with_context(|| format!("connecting to {}", settings.target_addr))?;
            let rows = sender.send_file(&file).await?;
            sender.finish().await?;
            info!(dest = %sender.target(), file = %file.display(), rows, "Transmission complete");
            println!("Total rows: {}", rows);
            Ok(())
        }
    }
}

async fn listen(settings: &Settings) -> anyhow::Result<()> {
    let listener = Listener::bind(&settings.bind_addr).await?;
    let sink = CsvDirSink::new(&settings.output_dir);
    let mut exporter = Exporter::new(sink, io::stdout());

    match listener.run(&mut exporter).await {
        Ok(report) => {
            info!(
                inserted = report.stats.inserted,
                malformed = report.stats.malformed,
                oversized = report.stats.oversized,
                exported = report.export.total_rows(),
                "Session complete"
            );
            let failed: Vec<&str> = report.export.failed().map(|g| g.symbol.as_str()).collect();
            if !failed.is_empty() {
                warn!(symbols = ?failed, "Some groups were not exported");
                anyhow::bail!("export failed for {} symbol(s): {}", failed.len(), failed.join(", "));
            }
            Ok(())
        }
        Err(ListenerError::Transport { source, stats }) => {
            error!(?stats, "Session ended without ENDTRANSMISSION; nothing exported");
            Err(anyhow::Error::new(source).context("transport failed before end of stream"))
        }
        Err(e) => Err(e.into()),
    }
}
