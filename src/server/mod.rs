pub mod config;
pub mod http_status;
pub mod listing;
pub mod request;
pub mod shutdown;
mod handlers;

use log::{debug, error, info};
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use threadpool::ThreadPool;

use config::ServerConfig;

/// Workers handling accepted connections, one pool task per connection.
const WORKER_THREADS: usize = 4;

/// How long the accept loop sleeps when no connection is pending. The stop
/// flag is re-checked at this cadence.
const ACCEPT_POLL: Duration = Duration::from_millis(1);

pub struct HttpServer {
    listener: TcpListener,
    root: Arc<PathBuf>,
    pool: ThreadPool,
}

impl HttpServer {
    /// Binds the listening socket on all interfaces at the configured port.
    ///
    /// Bind failures (port in use, privileged port) are fatal to startup and
    /// propagate to the caller.
    pub fn bind(config: &ServerConfig, root: PathBuf) -> io::Result<Self> {
        let addr = format!("0.0.0.0:{}", config.port);
        let listener = TcpListener::bind(&addr)?;
        listener.set_nonblocking(true)?;

        info!("Server bound on {}", addr);

        Ok(Self {
            listener,
            root: Arc::new(root),
            pool: ThreadPool::new(WORKER_THREADS),
        })
    }

    /// The bound address. With port 0 this reports the port the OS picked.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the process-wide interrupt flag is set.
    pub fn run(&self) {
        self.run_until(shutdown::flag());
    }

    /// Accepts connections until `stop` becomes true.
    ///
    /// Connections are handed to the worker pool; the loop itself never does
    /// request I/O, so a slow client cannot stall accepting.
    pub fn run_until(&self, stop: &AtomicBool) {
        info!(
            "Serving {} with {} worker threads",
            self.root.display(),
            WORKER_THREADS
        );

        while !stop.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    if let Err(e) = stream.set_nonblocking(false) {
                        error!("Failed to set blocking mode for {}: {}", addr, e);
                        continue;
                    }
                    let root = Arc::clone(&self.root);
                    self.pool.execute(move || {
                        handlers::handle_client(stream, &root);
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }

        info!("Stop requested, closing listener");
    }
}
