use log::{debug, error};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// The active-mode data connection of one session.
///
/// A channel is single use: PORT stores a pending port, `connect` dials
/// `127.0.0.1:<port>` and consumes it, one transfer runs, then `close` drops
/// the socket. The address octets given with PORT are never dialed.
#[derive(Debug)]
pub struct DataChannel {
    pending_port: Option<u16>,
    stream: Option<TcpStream>,
    buffer_size: usize,
}

impl DataChannel {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            pending_port: None,
            stream: None,
            buffer_size,
        }
    }

    /// Records the port announced by PORT, replacing any earlier one.
    pub fn set_pending_port(&mut self, port: u16) {
        self.pending_port = Some(port);
    }

    pub fn pending_port(&self) -> Option<u16> {
        self.pending_port
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Dials the client on loopback. The pending port is cleared only when
    /// the connection succeeds.
    pub async fn connect(&mut self) -> io::Result<()> {
        let port = self.pending_port.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "no data port set, use PORT first")
        })?;

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                debug!("Data connection established with {}", addr);
                self.stream = Some(stream);
                self.pending_port = None;
                Ok(())
            }
            Err(e) => {
                error!("Failed to open data connection to {}: {}", addr, e);
                Err(e)
            }
        }
    }

    fn stream_mut(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "data channel not open"))
    }

    /// Writes all of `data` to the data connection.
    pub async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream_mut()?.write_all(data).await
    }

    /// Reads at most `buf.len()` bytes; `Ok(0)` means the peer finished.
    pub async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.stream_mut()?.read(buf).await {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    /// Streams the file at `path` to the client. Returns the bytes sent.
    pub async fn send_file(&mut self, path: &Path) -> io::Result<u64> {
        let mut file = File::open(path).await?;
        let mut buffer = vec![0; self.buffer_size];
        let mut total = 0u64;

        loop {
            let bytes_read = file.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }
            self.send(&buffer[..bytes_read]).await?;
            total += bytes_read as u64;
        }

        self.stream_mut()?.flush().await?;
        Ok(total)
    }

    /// Receives the client's stream into `path`, creating or truncating it
    /// with mode 0644. Returns the bytes written.
    pub async fn recv_file(&mut self, path: &Path) -> io::Result<u64> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(path)
            .await?;
        let mut buffer = vec![0; self.buffer_size];
        let mut total = 0u64;

        loop {
            let bytes_read = self.recv(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }
            file.write_all(&buffer[..bytes_read]).await?;
            total += bytes_read as u64;
        }

        file.flush().await?;
        Ok(total)
    }

    /// Closes the socket if open and forgets any pending port.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Error shutting down data stream: {}", e);
            }
        }
        self.pending_port = None;
    }
}
