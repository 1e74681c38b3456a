use crate::config::{Config, ServerConfig};
use crate::core_error::FtpdError;
use crate::core_ftpcommand::handlers::{initialize_command_handlers, CommandTable};
use crate::core_network::network;
use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const STATE_NEW: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Registry entry for a live session, used to abort it during cleanup.
struct SessionHandle {
    peer: SocketAddr,
    closer: CancellationToken,
}

/// The FTP daemon: listening socket, canonical root and live-session registry.
///
/// Lifecycle is `init` once, `start` once, `stop` (idempotent, from any
/// thread), then `cleanup` once. The running state goes NEW -> RUNNING ->
/// STOPPED and never returns to RUNNING.
pub struct Server {
    config: ServerConfig,
    root: PathBuf,
    state: AtomicU8,
    shutdown: CancellationToken,
    sessions: Mutex<HashMap<u64, SessionHandle>>,
    next_session_id: AtomicU64,
    tracker: TaskTracker,
    commands: CommandTable,
}

impl Server {
    /// Resolves the root to a canonical, symlink-free absolute path. No
    /// socket is opened here; port 0 binds an ephemeral port.
    pub fn init(config: ServerConfig) -> Result<Arc<Self>, FtpdError> {
        if config.buffer_size == 0 {
            return Err(FtpdError::InvalidBufferSize);
        }

        let root = fs::canonicalize(&config.root_dir).map_err(|source| {
            FtpdError::RootDirectory {
                path: PathBuf::from(&config.root_dir),
                source,
            }
        })?;
        if !root.is_dir() {
            return Err(FtpdError::RootNotADirectory(root));
        }

        let commands = initialize_command_handlers();
        debug!("Registered {} FTP commands", commands.len());

        Ok(Arc::new(Self {
            config,
            root,
            state: AtomicU8::new(STATE_NEW),
            shutdown: CancellationToken::new(),
            sessions: Mutex::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            tracker: TaskTracker::new(),
            commands,
        }))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_RUNNING
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Opens the listening socket on `0.0.0.0:<listen_port>`.
    pub fn listen(&self) -> Result<TcpListener, FtpdError> {
        network::bind_listener(self.config.listen_port, self.config.backlog())
    }

    /// Runs the accept loop on an already bound listener until `stop` is
    /// called or accept fails fatally. The listener is closed on return.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> Result<(), FtpdError> {
        match self.state.compare_exchange(
            STATE_NEW,
            STATE_RUNNING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {}
            Err(STATE_STOPPED) => {
                info!("Server stopped before it was started");
                return Ok(());
            }
            Err(_) => return Err(FtpdError::AlreadyStarted),
        }

        match listener.local_addr() {
            Ok(addr) => info!("Server listening on {}", addr),
            Err(_) => info!("Server listening on port {}", self.config.listen_port),
        }
        info!("Serving files from {}", self.root.display());

        network::accept_loop(self, listener).await
    }

    /// Binds and serves. Blocks until the server is stopped.
    pub async fn start(self: &Arc<Self>) -> Result<(), FtpdError> {
        let listener = self.listen()?;
        self.serve(listener).await
    }

    /// Flags the server as stopped and interrupts the accept loop.
    pub fn stop(&self) {
        let previous = self.state.swap(STATE_STOPPED, Ordering::SeqCst);
        if previous != STATE_STOPPED {
            debug!("Server stop requested");
        }
        self.shutdown.cancel();
    }

    /// Aborts every live session and waits until all of them have released
    /// their resources. Call after `start` has returned.
    pub async fn cleanup(&self) {
        self.stop();
        info!("Closing {} active session(s)", self.session_count());

        {
            let sessions = self.lock_sessions();
            for (id, handle) in sessions.iter() {
                debug!("Closing session {} ({})", id, handle.peer);
                handle.closer.cancel();
            }
        }

        self.tracker.close();
        self.tracker.wait().await;

        info!("Server stopped");
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    pub(crate) fn register(&self, peer: SocketAddr) -> (u64, CancellationToken) {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let closer = CancellationToken::new();
        self.lock_sessions().insert(
            id,
            SessionHandle {
                peer,
                closer: closer.clone(),
            },
        );
        (id, closer)
    }

    pub(crate) fn unregister(&self, id: u64) {
        self.lock_sessions().remove(&id);
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<u64, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Calls `stop` on the first SIGINT or SIGTERM.
fn watch_signals(server: Arc<Server>) -> Result<JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
        server.stop();
    }))
}

/// Runs the FTP server with the provided configuration until a shutdown
/// signal arrives or the accept loop fails.
pub async fn run(config: Config) -> Result<()> {
    info!("Starting server with config: {:?}", config.server);
    config.server.validate()?;

    let server = Server::init(config.server)?;
    let signals = watch_signals(Arc::clone(&server))?;

    let result = server.start().await;
    server.cleanup().await;
    signals.abort();

    result?;
    Ok(())
}
