//! Per-Client Connection Loop
//!
//! Each accepted socket gets its own task running [`ConnectionHandler::run`].
//!
//! ```text
//!   ┌──────────────────────┐
//!   │ read into BytesMut   │◄──────────────────┐
//!   └──────────┬───────────┘                   │
//!              ▼                               │
//!   ┌──────────────────────┐   incomplete      │
//!   │ parse next request   │───────────────────┤
//!   └──────────┬───────────┘                   │
//!              ▼                               │
//!   ┌──────────────────────┐                   │
//!   │ execute, queue reply │── more buffered? ─┘ (after flush)
//!   └──────────────────────┘
//! ```
//!
//! Requests pipelined in one read are answered in order and flushed
//! together. A malformed request, or one that outgrows the buffer limit,
//! gets an error reply and the connection is closed, since the stream
//! position can no longer be trusted.

use crate::commands::CommandHandler;
use crate::protocol::parser::MAX_REQUEST_SIZE;
use crate::protocol::{Command, CommandParser, ParseError, Reply};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

/// Maximum amount of unparsed data buffered per client
const MAX_BUFFER_SIZE: usize = MAX_REQUEST_SIZE;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    #[error("client closed the connection mid-request")]
    UnexpectedEof,

    #[error("request exceeds buffer limit")]
    BufferFull,
}

/// State for one connected client.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    buffer: BytesMut,
    out: BytesMut,
    commands: CommandHandler,
    parser: CommandParser,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        commands: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            out: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            commands,
            parser: CommandParser::new(),
            stats,
        }
    }

    /// Serves the client until it disconnects or an error occurs.
    ///
    /// A clean disconnect between requests returns `Ok(())`.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        debug!(client = %self.addr, "client connected");

        let result = self.serve().await;

        match &result {
            Ok(()) => debug!(client = %self.addr, "client disconnected"),
            Err(ConnectionError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                debug!(client = %self.addr, "connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "connection error"),
        }

        self.stats.closed();
        result
    }

    async fn serve(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(command) = self.next_command().await? {
                let reply = self.commands.execute(command);
                self.stats.commands_processed.fetch_add(1, Ordering::Relaxed);
                reply.serialize_into(&mut self.out);
            }

            self.flush().await?;

            if !self.fill_buffer().await? {
                return Ok(());
            }
        }
    }

    /// Pops the next complete request off the buffer.
    ///
    /// On a parse error the client is sent an error reply before the error
    /// is returned.
    async fn next_command(&mut self) -> Result<Option<Command>, ConnectionError> {
        match self.parser.parse(&self.buffer) {
            Ok(Some((command, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(client = %self.addr, consumed, remaining = self.buffer.len(), "parsed request");
                Ok(Some(command))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                Reply::error(format!("ERR Protocol error: {}", e)).serialize_into(&mut self.out);
                self.flush().await?;
                Err(e.into())
            }
        }
    }

    /// Reads more bytes from the socket. Returns `false` on a clean EOF.
    async fn fill_buffer(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            let err = ConnectionError::BufferFull;
            Reply::error(format!("ERR Protocol error: {}", err)).serialize_into(&mut self.out);
            self.flush().await?;
            return Err(err);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return if self.buffer.is_empty() {
                Ok(false)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }

        self.stats.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
        trace!(client = %self.addr, bytes = n, "read");
        Ok(true)
    }

    async fn flush(&mut self) -> Result<(), ConnectionError> {
        if self.out.is_empty() {
            return Ok(());
        }

        let pending = self.out.split();
        self.stream.write_all(&pending).await?;
        self.stream.flush().await?;
        self.stats
            .bytes_written
            .fetch_add(pending.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

/// Runs a [`ConnectionHandler`] to completion, logging only unexpected
/// failures.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    commands: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    if let Err(e) = ConnectionHandler::new(stream, addr, commands, stats).run().await {
        trace!(client = %addr, error = %e, "connection ended with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoEngine;
    use crate::storage::KeyValueStore;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn create_test_server() -> (SocketAddr, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let commands =
            CommandHandler::new(Arc::new(KeyValueStore::new()), Arc::new(GeoEngine::new()));
        let stats = Arc::new(ConnectionStats::new());

        let stats_clone = Arc::clone(&stats);
        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    commands.clone(),
                    Arc::clone(&stats_clone),
                ));
            }
        });

        (addr, stats)
    }

    /// Reads until `expected` bytes arrived or two seconds passed.
    async fn read_exact_reply(client: &mut TcpStream, expected: usize) -> Vec<u8> {
        let mut buf = vec![0u8; expected];
        tokio::time::timeout(Duration::from_secs(2), client.read_exact(&mut buf))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();

        assert_eq!(read_exact_reply(&mut client, 7).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_inline_commands() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"SET name Ariz -1\r\n").await.unwrap();
        assert_eq!(read_exact_reply(&mut client, 5).await, b"+OK\r\n");

        client.write_all(b"GET name\r\n").await.unwrap();
        assert_eq!(read_exact_reply(&mut client, 10).await, b"$4\r\nAriz\r\n");
    }

    #[tokio::test]
    async fn test_pipelined_geo_commands() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(
                b"GEOADD ns 0 0 a\r\n\
                  GEOADD ns 0 0 b\r\n\
                  GEODIST ns a b\r\n\
                  GEODIST ns a nobody\r\n",
            )
            .await
            .unwrap();

        // +OK, +OK, $1 0, $2 -1
        let expected: &[u8] = b"+OK\r\n+OK\r\n$1\r\n0\r\n$2\r\n-1\r\n";
        assert_eq!(read_exact_reply(&mut client, expected.len()).await, expected);
    }

    #[tokio::test]
    async fn test_request_split_across_writes() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*2\r\n$4\r\nEC").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"HO\r\n$2\r\nhi\r\n").await.unwrap();

        assert_eq!(read_exact_reply(&mut client, 8).await, b"$2\r\nhi\r\n");
    }

    #[tokio::test]
    async fn test_protocol_error_closes_connection() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n:1\r\n").await.unwrap();

        let mut reply = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut reply))
            .await
            .expect("server did not close the connection")
            .unwrap();
        assert!(reply.starts_with(b"-ERR Protocol error"));
    }

    #[tokio::test]
    async fn test_large_value_round_trip() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let value = vec![b'x'; 100 * 1024];
        let mut request =
            format!("*4\r\n$3\r\nSET\r\n$1\r\nk\r\n${}\r\n", value.len()).into_bytes();
        request.extend_from_slice(&value);
        request.extend_from_slice(b"\r\n$2\r\n-1\r\n");
        client.write_all(&request).await.unwrap();
        assert_eq!(read_exact_reply(&mut client, 5).await, b"+OK\r\n");

        client.write_all(b"GET k\r\n").await.unwrap();
        let header = format!("${}\r\n", value.len());
        let reply = read_exact_reply(&mut client, header.len() + value.len() + 2).await;
        assert!(reply.starts_with(header.as_bytes()));
        assert_eq!(&reply[header.len()..header.len() + value.len()], &value[..]);
    }

    #[tokio::test]
    async fn test_oversized_bulk_header_gets_error_reply() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let header = format!(
            "*4\r\n$3\r\nSET\r\n$1\r\nk\r\n${}\r\n",
            MAX_REQUEST_SIZE + 1
        );
        client.write_all(header.as_bytes()).await.unwrap();

        let mut reply = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut reply))
            .await
            .expect("server did not close the connection")
            .unwrap();
        assert!(reply.starts_with(b"-ERR Protocol error: bulk string too large"));
    }

    #[tokio::test]
    async fn test_buffer_limit_gets_error_reply() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        // An inline request that never terminates fills the buffer exactly
        let request = vec![b'a'; MAX_BUFFER_SIZE];
        client.write_all(&request).await.unwrap();

        let mut reply = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut reply))
            .await
            .expect("server did not close the connection")
            .unwrap();
        assert_eq!(reply, b"-ERR Protocol error: request exceeds buffer limit\r\n");
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, stats) = create_test_server().await;
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        read_exact_reply(&mut client, 7).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 14);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 7);

        drop(client);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
