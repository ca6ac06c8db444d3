// Sending side: stream a file's lines as individual datagrams, then the sentinel.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, info, instrument};

use crate::market_data::parser::SENTINEL;

#[derive(Debug, Error)]
pub enum SenderError {
    #[error("could not resolve {0}")]
    Resolve(String),
    #[error("unable to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("send failed: {0}")]
    Io(#[from] io::Error),
}

pub struct Sender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl Sender {
    pub async fn connect(target: &str) -> Result<Self, SenderError> {
        let target = lookup_host(target)
            .await
            .map_err(|_| SenderError::Resolve(target.to_string()))?
            .next()
            .ok_or_else(|| SenderError::Resolve(target.to_string()))?;

        // Ephemeral local port in the target's address family
        let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).await?;
        info!(dest = %target, "Sender ready");
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send one payload unmodified.
    pub async fn send_line(&self, line: &[u8]) -> Result<usize, SenderError> {
        Ok(self.socket.send_to(line, self.target).await?)
    }

    /// Send every line of `path` as-is, terminator included. Returns the number of lines sent.
    #[instrument(skip(self), fields(dest = %self.target))]
    pub async fn send_file(&self, path: &Path) -> Result<u64, SenderError> {
        let file = File::open(path)
            .await
            .map_err(|source| SenderError::Open { path: path.to_path_buf(), source })?;
        let mut reader = BufReader::new(file);

        let mut line = Vec::new();
        let mut sent = 0u64;
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            self.send_line(&line).await?;
            sent += 1;
        }
        debug!(rows = sent, "File streamed");
        Ok(sent)
    }

    /// Signal end of stream to the listener.
    pub async fn finish(&self) -> Result<(), SenderError> {
        self.send_line(SENTINEL).await?;
        info!(dest = %self.target, "Sent end of transmission");
        Ok(())
    }
}
