//! TCP server for shell sessions.
//!
//! Accepts connections and runs one [`Session`] task per client. Tasks live
//! in a `JoinSet` owned by the accept loop, so shutdown can signal every
//! session and wait for all of them to finish.

use crate::commands::Registry;
use crate::config::Config;
use crate::session::{Session, SessionConfig};
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::{lookup_host, TcpListener, TcpSocket};
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Pending connection queue length
const LISTEN_BACKLOG: u32 = 128;

/// Server instance
pub struct Server {
    config: Config,
    registry: Arc<Registry>,
    session_config: Arc<SessionConfig>,
    connection_limit: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a server with the built-in command set
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, Registry::builtin())
    }

    /// Create a server with a custom command set
    pub fn with_registry(config: Config, registry: Registry) -> Self {
        if registry.is_empty() {
            warn!("Command registry is empty");
        }
        let (shutdown_tx, _) = broadcast::channel(1);

        Server {
            registry: Arc::new(registry),
            session_config: Arc::new(config.session.clone()),
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            shutdown_tx,
            config,
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = bind_listener(&self.config.listen).await?;
        info!(
            address = %listener.local_addr()?,
            commands = self.registry.len(),
            "Server listening"
        );
        self.serve(listener, shutdown).await
    }

    /// Accept connections on `listener` until `shutdown` resolves, then stop
    /// every session and wait for them to exit.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            let accept = async {
                // Semaphore is never closed, so acquisition cannot fail.
                let permit = self.connection_limit.clone().acquire_owned().await.ok();
                (permit, listener.accept().await)
            };

            tokio::select! {
                _ = &mut shutdown => break,

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Session task failed");
                    }
                }

                (permit, accepted) = accept => match accepted {
                    Ok((stream, addr)) => {
                        let session = Session::new(
                            stream,
                            Arc::clone(&self.registry),
                            Arc::clone(&self.session_config),
                            self.shutdown_tx.subscribe(),
                        );

                        sessions.spawn(
                            async move {
                                info!("Connected");
                                match session.run().await {
                                    Ok(()) => info!("Disconnected"),
                                    Err(e) => warn!(error = %e, "Disconnected with error"),
                                }
                                drop(permit);
                            }
                            .instrument(info_span!("session", peer = %addr)),
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }

        info!(active = sessions.len(), "Shutting down");
        // Err only means no session is currently subscribed.
        let _ = self.shutdown_tx.send(());
        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Session task failed");
            }
        }
        debug!("All sessions closed");

        Ok(())
    }
}

/// Bind a listening socket with address reuse enabled
async fn bind_listener(listen: &str) -> io::Result<TcpListener> {
    let addr = lookup_host(listen).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no address resolved for '{listen}'"),
        )
    })?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    const GREETING: &[u8] = b"Welcome to telnet server\r\nSHELL> ";

    fn test_config() -> Config {
        Config {
            listen: "127.0.0.1:0".to_string(),
            workers: None,
            max_connections: 16,
            session: SessionConfig::default(),
            log_level: "info".to_string(),
        }
    }

    async fn start() -> (
        std::net::SocketAddr,
        oneshot::Sender<()>,
        tokio::task::JoinHandle<io::Result<()>>,
    ) {
        let listener = bind_listener("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let server = Server::new(test_config());
            server
                .serve(listener, async move {
                    let _ = rx.await;
                })
                .await
        });

        (addr, tx, handle)
    }

    async fn expect(stream: &mut TcpStream, expected: &[u8]) {
        let mut buf = vec![0u8; expected.len()];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[..], expected);
    }

    #[tokio::test]
    async fn test_session_over_tcp() {
        let (addr, shutdown, handle) = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        expect(&mut stream, GREETING).await;

        stream.write_all(&[0xff, 0xfd, 0x03]).await.unwrap();
        stream.write_all(b"echo hi 'there you'\r\n").await.unwrap();
        expect(&mut stream, b"hi\r\nthere you\r\nSHELL> ").await;

        stream.write_all(b"exit\r\n").await.unwrap();
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        shutdown.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (addr, shutdown, handle) = start().await;
        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();

        expect(&mut first, GREETING).await;
        expect(&mut second, GREETING).await;

        first.write_all(b"echo one\r\n").await.unwrap();
        second.write_all(b"echo two\r\n").await.unwrap();
        expect(&mut second, b"two\r\nSHELL> ").await;
        expect(&mut first, b"one\r\nSHELL> ").await;

        first.write_all(b"exit\n").await.unwrap();
        let mut rest = Vec::new();
        first.read_to_end(&mut rest).await.unwrap();

        second.write_all(b"echo still here\r\n").await.unwrap();
        expect(&mut second, b"still\r\nhere\r\nSHELL> ").await;

        shutdown.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_sessions() {
        let (addr, shutdown, handle) = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        expect(&mut stream, GREETING).await;

        shutdown.send(()).unwrap();
        handle.await.unwrap().unwrap();

        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_address() {
        assert!(bind_listener("not an address").await.is_err());
    }
}
