use crate::core_error::FtpdError;
use crate::server::Server;
use crate::session::Session;
use log::{debug, error, info, warn};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

/// Creates the listening socket with address reuse and the given backlog.
pub fn bind_listener(port: u16, backlog: u32) -> Result<TcpListener, FtpdError> {
    let bind_error = |source| FtpdError::Bind { port, source };
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

    let socket = TcpSocket::new_v4().map_err(bind_error)?;
    if let Err(e) = socket.set_reuseaddr(true) {
        warn!("Failed to set SO_REUSEADDR: {}", e);
    }
    socket.bind(addr).map_err(bind_error)?;
    socket.listen(backlog).map_err(bind_error)
}

/// Errors after which accepting can simply continue.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
    )
}

pub async fn accept_loop(server: &Arc<Server>, listener: TcpListener) -> Result<(), FtpdError> {
    let shutdown = server.shutdown_token().clone();

    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Accept loop interrupted by shutdown");
                break;
            }
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((socket, addr)) => {
                info!("New connection from {}", addr);
                handle_connection(server, socket, addr);
            }
            Err(e) if is_transient(&e) => {
                debug!("Transient accept error: {}", e);
            }
            Err(e) if !server.is_running() => {
                debug!("Accept failed during shutdown: {}", e);
                break;
            }
            Err(e) => {
                error!("Fatal accept error: {}", e);
                return Err(FtpdError::Accept(e));
            }
        }
    }

    Ok(())
}

/// Registers a session for the new control connection and spawns its task.
fn handle_connection(server: &Arc<Server>, socket: TcpStream, peer: SocketAddr) {
    let (id, closer) = server.register(peer);
    let session = Session::new(id, socket, peer, Arc::clone(server), closer);
    server.tracker().spawn(session.run());
}
