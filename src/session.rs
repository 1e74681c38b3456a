use crate::constants::{reply, CMD_MAX, GREETING};
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_network::data::DataChannel;
use crate::server::Server;
use log::{debug, info, warn};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// What the command loop does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlow {
    Continue,
    Disconnect,
}

/// State of one connected client, owned by its own task.
pub struct Session {
    pub id: u64,
    pub peer: SocketAddr,
    pub data: DataChannel,
    pub username: Option<String>, // For logging only
    pub is_authenticated: bool,   // Set by USER, never reset
    pub cwd: PathBuf,             // Canonical, always inside the server root
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    server: Arc<Server>,
    closer: CancellationToken,
}

impl Session {
    pub fn new(
        id: u64,
        socket: TcpStream,
        peer: SocketAddr,
        server: Arc<Server>,
        closer: CancellationToken,
    ) -> Self {
        let (reader, writer) = socket.into_split();
        Self {
            id,
            peer,
            data: DataChannel::new(server.config().buffer_size),
            username: None,
            is_authenticated: false,
            cwd: server.root().to_path_buf(),
            reader: BufReader::new(reader),
            writer,
            server,
            closer,
        }
    }

    /// The canonical server root.
    pub fn root(&self) -> &Path {
        self.server.root()
    }

    /// Sends a single-line `<code> <message>\r\n` reply.
    pub async fn send_response(&mut self, code: u16, message: &str) -> io::Result<()> {
        let line = format!("{} {}\r\n", code, message);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }

    /// Reads one command line with the line terminator stripped.
    ///
    /// Returns `Ok(None)` once the client has closed the connection. A line
    /// is at most `CMD_MAX` bytes with its CRLF; anything longer is cut to
    /// `CMD_MAX - 1` bytes and the rest of it is thrown away.
    pub async fn read_command(&mut self) -> io::Result<Option<String>> {
        let mut line = Vec::with_capacity(CMD_MAX);
        let n = (&mut self.reader)
            .take(CMD_MAX as u64)
            .read_until(b'\n', &mut line)
            .await?;

        if n == 0 {
            return Ok(None);
        }

        if line.last() == Some(&b'\n') {
            line.pop();
        } else if n == CMD_MAX {
            warn!("Session {}: command line too long, truncated", self.id);
            line.truncate(CMD_MAX - 1);
            self.discard_line().await?;
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    async fn discard_line(&mut self) -> io::Result<()> {
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(());
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.reader.consume(pos + 1);
                    return Ok(());
                }
                None => {
                    let len = buf.len();
                    self.reader.consume(len);
                }
            }
        }
    }

    /// Parses one command line and runs the matching handler.
    pub async fn dispatch(&mut self, line: &str) -> io::Result<SessionFlow> {
        let Some((verb, arg)) = parse_command_line(line) else {
            return Ok(SessionFlow::Continue);
        };

        debug!("Session {}: received command: {}", self.id, line.trim_start());

        let entry = FtpCommand::from_str(&verb)
            .and_then(|cmd| self.server.commands().get(cmd).copied());
        let Some(entry) = entry else {
            self.send_response(reply::UNKNOWN_COMMAND, &format!("Unknown command: {}", verb))
                .await?;
            return Ok(SessionFlow::Continue);
        };

        if entry.requires_auth && !self.is_authenticated {
            debug!("Session {}: {} refused before login", self.id, entry.command.as_str());
            self.send_response(reply::NOT_LOGGED_IN, "Not logged in.").await?;
            return Ok(SessionFlow::Continue);
        }

        (entry.handler)(self, arg).await
    }

    /// Runs the session until the client leaves, QUIT is handled, the server
    /// stops, or the session is cancelled during shutdown. The session then
    /// releases its sockets and unregisters itself.
    pub async fn run(mut self) {
        match self.send_response(reply::SERVICE_READY, GREETING).await {
            Ok(()) => self.command_loop().await,
            Err(e) => warn!("Session {}: failed to send greeting: {}", self.id, e),
        }
        self.finish().await;
    }

    async fn command_loop(&mut self) {
        let closer = self.closer.clone();

        loop {
            if !self.server.is_running() {
                debug!("Session {}: server stopping, leaving command loop", self.id);
                break;
            }

            let line = tokio::select! {
                _ = closer.cancelled() => break,
                line = self.read_command() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Session {}: client closed the connection", self.id);
                    break;
                }
                Err(e) => {
                    warn!("Session {}: error reading command: {}", self.id, e);
                    break;
                }
            };

            let flow = tokio::select! {
                _ = closer.cancelled() => break,
                flow = self.dispatch(&line) => flow,
            };

            match flow {
                Ok(SessionFlow::Continue) => {}
                Ok(SessionFlow::Disconnect) => break,
                Err(e) => {
                    warn!("Session {}: control connection error: {}", self.id, e);
                    break;
                }
            }
        }
    }

    async fn finish(mut self) {
        if self.data.is_open() {
            debug!("Session {}: dropping open data connection", self.id);
        }
        self.data.close().await;
        if let Err(e) = self.writer.shutdown().await {
            debug!("Session {}: error shutting down control stream: {}", self.id, e);
        }
        self.server.unregister(self.id);

        match &self.username {
            Some(username) => info!("Client {} ({}) disconnected", username, self.peer),
            None => info!("Client {} disconnected", self.peer),
        }
    }
}

/// Splits a command line into the upper-cased verb and the untouched rest.
///
/// The argument is not tokenized further, so file names containing spaces
/// reach the handler whole. Returns `None` for a blank line.
pub fn parse_command_line(line: &str) -> Option<(String, Option<&str>)> {
    let line = line.trim_start();
    if line.is_empty() {
        return None;
    }

    let (verb, rest) = match line.find(char::is_whitespace) {
        Some(pos) => (&line[..pos], line[pos..].trim_start()),
        None => (line, ""),
    };
    let arg = if rest.is_empty() { None } else { Some(rest) };

    Some((verb.to_ascii_uppercase(), arg))
}
