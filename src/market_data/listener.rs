// UDP listener: receive -> parse -> insert, re-armed until the sentinel closes the session

use std::io;
use std::io::Write;
use std::net::SocketAddr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::session::{Session, SessionStats};
use crate::engine::types::SessionError;
use crate::market_data::parser;
use crate::persist::exporter::Exporter;
use crate::persist::types::ExportSummary;
use crate::persist::GroupSink;

/// Receive buffer size. A datagram that fills it may have been truncated.
pub const RECV_BUFFER_SIZE: usize = 1024;
pub const MAX_PAYLOAD: usize = RECV_BUFFER_SIZE - 1;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    // Session ended without a sentinel; nothing was exported
    #[error("transport failed before end of stream: {source}")]
    Transport {
        #[source]
        source: io::Error,
        stats: SessionStats,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// What one datagram did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Close,
}

/// Result of a cleanly closed session.
#[derive(Debug)]
pub struct SessionReport {
    pub stats: SessionStats,
    pub export: ExportSummary,
}

/// Where datagrams come from. Each call waits for exactly one datagram.
#[async_trait]
pub trait DatagramSource: Send {
    async fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

#[async_trait]
impl DatagramSource for UdpSocket {
    async fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.recv_from(buf).await
    }
}

pub struct Listener<R = UdpSocket> {
    source: R,
    session: Session,
}

/// Transient receive errors re-arm the loop; anything else ends the session.
pub fn is_recoverable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
    )
}

impl Listener<UdpSocket> {
    pub async fn bind(addr: &str) -> Result<Self, ListenerError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr: addr.to_string(), source })?;
        let local = socket.local_addr().ok();
        info!(addr = %addr, local = ?local, "Listening for tick datagrams");
        Ok(Self::with_source(socket))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.source.local_addr()
    }
}

impl<R: DatagramSource> Listener<R> {
    pub fn with_source(source: R) -> Self {
        Self { source, session: Session::new() }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Receive until the sentinel arrives, then export through `exporter`.
    /// The source (socket) is dropped when this returns, whatever the outcome.
    pub async fn run<S: GroupSink, W: Write>(
        mut self,
        exporter: &mut Exporter<S, W>,
    ) -> Result<SessionReport, ListenerError> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        loop {
            let (n, peer) = match self.source.recv_datagram(&mut buf).await {
                Ok(received) => received,
                Err(e) if is_recoverable(&e) => {
                    self.session.stats.transport_errors += 1;
                    warn!(error = %e, "Transient receive error, re-arming");
                    continue;
                }
                Err(source) => {
                    self.session.stats.transport_errors += 1;
                    error!(error = %source, stats = ?self.session.stats, "Transport failed, session aborted without export");
                    return Err(ListenerError::Transport { source, stats: self.session.stats });
                }
            };

            if self.handle_datagram(&buf[..n], peer)? == Step::Close {
                break;
            }
        }

        let groups = self.session.close()?;
        let export = exporter.emit(groups);
        Ok(SessionReport { stats: self.session.stats, export })
    }

    /// Process one datagram. Never suspends.
    #[instrument(level = "trace", skip(self, payload), fields(len = payload.len()))]
    pub fn handle_datagram(&mut self, payload: &[u8], peer: SocketAddr) -> Result<Step, ListenerError> {
        if !self.session.is_open() {
            return Err(SessionError::Closed.into());
        }
        if payload.is_empty() {
            self.session.stats.ignored_empty += 1;
            return Ok(Step::Continue);
        }

        self.session.stats.received += 1;
        metrics::counter!("tickx_datagrams_received_total").increment(1);

        if parser::is_sentinel(payload) {
            info!(peer = %peer, buffered = self.session.buffered(), "End of transmission received");
            return Ok(Step::Close);
        }

        if payload.len() > MAX_PAYLOAD {
            self.session.stats.oversized += 1;
            warn!(peer = %peer, len = payload.len(), "Dropping datagram that may be truncated");
            return Ok(Step::Continue);
        }

        match parser::parse_bytes(payload) {
            Ok(record) => {
                debug!(symbol = %record.symbol, sequence = record.sequence, "Accepted record");
                self.session.insert(record)?;
                metrics::counter!("tickx_records_inserted_total").increment(1);
            }
            Err(e) => {
                self.session.stats.malformed += 1;
                metrics::counter!("tickx_malformed_total").increment(1);
                warn!(
                    peer = %peer,
                    kind = ?e.kind(),
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "Discarding malformed record"
                );
            }
        }
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::types::ExportResult;
    use crate::engine::types::Group;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    // Replays a fixed list of receive results
    struct ScriptedSource {
        script: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
            Self { script: script.into() }
        }
    }

    #[async_trait]
    impl DatagramSource for ScriptedSource {
        async fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            match self.script.pop_front() {
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok((n, peer()))
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from(io::ErrorKind::NotConnected)),
            }
        }
    }

    #[derive(Default)]
    struct MemorySink {
        groups: Vec<Group>,
    }

    impl GroupSink for MemorySink {
        fn write_group(&mut self, group: &Group) -> ExportResult<PathBuf> {
            self.groups.push(group.clone());
            Ok(PathBuf::from(&group.symbol))
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn listener() -> Listener<UdpSocket> {
        Listener::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_datagram_ignored() {
        let mut l = listener().await;
        assert_eq!(l.handle_datagram(b"", peer()).unwrap(), Step::Continue);
        assert_eq!(l.session().stats.ignored_empty, 1);
        assert_eq!(l.session().stats.received, 0);
        assert!(l.session().is_open());
    }

    #[tokio::test]
    async fn test_malformed_keeps_session_open() {
        let mut l = listener().await;
        assert_eq!(l.handle_datagram(b"not,a,record", peer()).unwrap(), Step::Continue);
        assert_eq!(l.handle_datagram(b"3ef,MSFT,9.52,3700\n", peer()).unwrap(), Step::Continue);
        assert_eq!(l.session().stats.malformed, 1);
        assert_eq!(l.session().stats.inserted, 1);
        assert!(l.session().is_open());
    }

    #[tokio::test]
    async fn test_sentinel_must_match_exactly() {
        let mut l = listener().await;
        assert_eq!(l.handle_datagram(b"ENDTRANSMISSIONX", peer()).unwrap(), Step::Continue);
        assert_eq!(l.session().stats.malformed, 1);
        assert_eq!(l.handle_datagram(b"ENDTRANSMISSION", peer()).unwrap(), Step::Close);
    }

    #[tokio::test]
    async fn test_oversized_datagram_rejected() {
        let mut l = listener().await;
        let big = vec![b'1'; RECV_BUFFER_SIZE];
        assert_eq!(l.handle_datagram(&big, peer()).unwrap(), Step::Continue);
        assert_eq!(l.session().stats.oversized, 1);
        assert_eq!(l.session().buffered(), 0);
    }

    #[test]
    fn test_error_classification() {
        assert!(is_recoverable(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_recoverable(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_recoverable(&io::Error::from(io::ErrorKind::NotConnected)));
        assert!(!is_recoverable(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[tokio::test]
    async fn test_run_exports_on_sentinel() {
        let l = listener().await;
        let addr = l.local_addr().unwrap();
        let mut exporter = Exporter::new(MemorySink::default(), Vec::new());

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let handle = tokio::spawn(async move {
            let result = l.run(&mut exporter).await;
            (result, exporter)
        });

        for payload in ["3ef,MSFT,9.52,3700\n", "garbage", "", "3f0,AAPL,4.6,2300\n", "3f1,MSFT,9.52,100\n"] {
            sender.send_to(payload.as_bytes(), addr).await.unwrap();
        }
        sender.send_to(b"ENDTRANSMISSION", addr).await.unwrap();

        let (result, exporter) = handle.await.unwrap();
        let report = result.unwrap();
        assert_eq!(report.stats.inserted, 3);
        assert_eq!(report.stats.malformed, 1);
        assert_eq!(report.export.total_rows(), 3);

        let (sink, out) = exporter.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "AAPL Rows: 1\nMSFT Rows: 2\n");
        assert_eq!(sink.groups[1].records[0].sequence, 1009);
    }

    #[tokio::test]
    async fn test_fatal_receive_error_aborts_without_export() {
        let source = ScriptedSource::new(vec![
            Ok(b"3ef,MSFT,9.52,3700\n".to_vec()),
            Err(io::Error::from(io::ErrorKind::NotConnected)),
            Ok(b"ENDTRANSMISSION".to_vec()),
        ]);
        let mut exporter = Exporter::new(MemorySink::default(), Vec::new());

        let err = Listener::with_source(source).run(&mut exporter).await.unwrap_err();
        match err {
            ListenerError::Transport { source, stats } => {
                assert_eq!(source.kind(), io::ErrorKind::NotConnected);
                assert_eq!(stats.inserted, 1);
                assert_eq!(stats.transport_errors, 1);
            }
            other => panic!("expected transport error, got {other:?}"),
        }

        let (sink, out) = exporter.into_parts();
        assert!(sink.groups.is_empty());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_transient_receive_error_rearms() {
        let source = ScriptedSource::new(vec![
            Err(io::Error::from(io::ErrorKind::ConnectionReset)),
            Ok(b"3f0,AAPL,4.6,2300\n".to_vec()),
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Ok(b"ENDTRANSMISSION".to_vec()),
        ]);
        let mut exporter = Exporter::new(MemorySink::default(), Vec::new());

        let report = Listener::with_source(source).run(&mut exporter).await.unwrap();
        assert_eq!(report.stats.transport_errors, 2);
        assert_eq!(report.stats.inserted, 1);

        let (_, out) = exporter.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "AAPL Rows: 1\n");
    }
}
