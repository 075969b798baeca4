//! Per-connection session loop.
//!
//! Reads from the client into a fixed [`RecvBuffer`], then drains every
//! complete unit already buffered before reading again:
//!
//! 1. a Telnet option triple at the front is dropped;
//! 2. otherwise a terminated line is tokenized and dispatched;
//! 3. otherwise the line is incomplete and more input is needed.
//!
//! Output queued by commands and prompts is flushed with one write per
//! batch. The session ends on EOF, an `exit` command, a shutdown signal, an
//! I/O error or a line that cannot fit the buffer.

use crate::buffer::RecvBuffer;
use crate::commands::{Flow, Registry};
use crate::error::SessionError;
use crate::protocol::{frame_line, skip_option, tokenize, LineResult, TelnetOption};
use bytes::{BufMut, BytesMut};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default receive buffer size, and so the longest accepted line.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default cap on tokens per line.
pub const DEFAULT_MAX_ARGS: usize = 32;

pub const DEFAULT_WELCOME: &str = "Welcome to telnet server\r\n";
pub const DEFAULT_PROMPT: &str = "SHELL> ";

/// Output buffer starting size
const OUTPUT_CAPACITY: usize = 1024;

/// Settings shared by all sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub buffer_size: usize,
    pub max_args: usize,
    /// Sent once on connect.
    pub welcome: String,
    /// Sent after the welcome and after every processed line.
    pub prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_args: DEFAULT_MAX_ARGS,
            welcome: DEFAULT_WELCOME.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

/// Next thing found at the front of the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Option(TelnetOption),
    Line { len: usize, consumed: usize },
    Incomplete,
}

fn next_unit(input: &[u8]) -> Unit {
    if let Some(opt) = skip_option(input) {
        return Unit::Option(opt);
    }
    match frame_line(input) {
        LineResult::Complete { len, consumed } => Unit::Line { len, consumed },
        LineResult::Incomplete => Unit::Incomplete,
    }
}

/// How a flush ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flushed {
    Done,
    Shutdown,
}

/// One client connection.
pub struct Session<S> {
    stream: S,
    registry: Arc<Registry>,
    config: Arc<SessionConfig>,
    shutdown: broadcast::Receiver<()>,
    recv: RecvBuffer,
    out: BytesMut,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        registry: Arc<Registry>,
        config: Arc<SessionConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let recv = RecvBuffer::new(config.buffer_size);
        Self {
            stream,
            registry,
            config,
            shutdown,
            recv,
            out: BytesMut::with_capacity(OUTPUT_CAPACITY),
        }
    }

    /// Drive the session to completion.
    ///
    /// Returns `Ok` when the client disconnects, runs `exit`, or the server
    /// shuts down. The stream is dropped on return either way.
    pub async fn run(mut self) -> Result<(), SessionError> {
        self.out.put_slice(self.config.welcome.as_bytes());
        self.out.put_slice(self.config.prompt.as_bytes());

        loop {
            if self.process_buffered() == Flow::Exit {
                if self.flush().await? == Flushed::Shutdown {
                    return Ok(());
                }
                // Peer may already be gone.
                if let Err(e) = self.stream.shutdown().await {
                    debug!(error = %e, "Stream shutdown after exit failed");
                }
                debug!("Session exit requested");
                return Ok(());
            }
            if self.flush().await? == Flushed::Shutdown {
                return Ok(());
            }

            if self.recv.is_full() {
                return Err(SessionError::LineTooLong {
                    capacity: self.recv.capacity(),
                });
            }

            let n = tokio::select! {
                res = self.recv.read_from(&mut self.stream) => res?,
                _ = self.shutdown.recv() => {
                    debug!("Shutdown signal received");
                    return Ok(());
                }
            };

            if n == 0 {
                trace!("Connection closed by client");
                return Ok(());
            }
            trace!(read = n, buffered = self.recv.len(), "Received data");
        }
    }

    /// Handle every complete unit in the receive buffer.
    fn process_buffered(&mut self) -> Flow {
        loop {
            match next_unit(self.recv.filled()) {
                Unit::Option(opt) => {
                    trace!(option = %opt, "Discarding telnet option");
                    self.recv.consume(TelnetOption::LEN);
                }
                Unit::Line { len, consumed } => {
                    let flow = self.dispatch_line(len);
                    self.recv.consume(consumed);
                    if flow == Flow::Exit {
                        return Flow::Exit;
                    }
                    self.out.put_slice(self.config.prompt.as_bytes());
                }
                Unit::Incomplete => return Flow::Continue,
            }
        }
    }

    fn dispatch_line(&mut self, len: usize) -> Flow {
        let line = String::from_utf8_lossy(&self.recv.filled()[..len]);
        let args = tokenize(&line, self.config.max_args);
        trace!(?args, "Dispatching line");
        self.registry.dispatch(&args, &mut self.out)
    }

    /// Write queued output, giving up if the server shuts down first.
    ///
    /// Shutdown is observed even when the client has stopped reading.
    async fn flush(&mut self) -> std::io::Result<Flushed> {
        if self.out.is_empty() {
            return Ok(Flushed::Done);
        }

        tokio::select! {
            res = self.stream.write_all(&self.out) => res?,
            _ = self.shutdown.recv() => {
                debug!(pending = self.out.len(), "Shutdown signal received while writing");
                return Ok(Flushed::Shutdown);
            }
        }

        self.out.clear();
        Ok(Flushed::Done)
    }
}
