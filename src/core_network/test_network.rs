use crate::config::ServerConfig;
use crate::core_error::FtpdError;
use crate::server::Server;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    server: Arc<Server>,
    addr: SocketAddr,
    handle: JoinHandle<Result<(), FtpdError>>,
    root: PathBuf,
    _dir: TempDir,
}

/// Starts a server on an ephemeral port, serving `<tmp>/root`.
async fn start_server() -> TestServer {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(dir.path().join("secret.txt"), b"outside").unwrap();

    let config = ServerConfig {
        listen_port: 0,
        root_dir: root.to_string_lossy().into_owned(),
        ..ServerConfig::default()
    };
    let server = Server::init(config).unwrap();
    let listener = server.listen().unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.serve(listener).await }
    });

    TestServer {
        server,
        addr: SocketAddr::from(([127, 0, 0, 1], port)),
        handle,
        root,
        _dir: dir,
    }
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connects and consumes the greeting.
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
        };
        let (code, text) = client.reply().await;
        assert_eq!(code, 220);
        assert_eq!(text, "jbox FTP server ready.");
        client
    }

    async fn login(addr: SocketAddr) -> Self {
        let mut client = Self::connect(addr).await;
        assert_eq!(client.cmd("USER alice").await, (230, "User alice logged in.".into()));
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        timeout(WAIT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        line
    }

    async fn reply(&mut self) -> (u16, String) {
        let line = self.read_line().await;
        assert!(line.ends_with("\r\n"), "reply not CRLF terminated: {:?}", line);
        let code = line[..3].parse().unwrap();
        (code, line[4..line.len() - 2].to_string())
    }

    async fn cmd(&mut self, line: &str) -> (u16, String) {
        self.send(line).await;
        self.reply().await
    }

    async fn code(&mut self, line: &str) -> u16 {
        self.cmd(line).await.0
    }

    /// Opens a local listener and announces it with PORT.
    async fn port(&mut self) -> TcpListener {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let arg = format!("PORT 127,0,0,1,{},{}", port >> 8, port & 0xff);
        assert_eq!(self.cmd(&arg).await, (200, "PORT command successful.".into()));
        listener
    }

    async fn expect_eof(&mut self) {
        let mut buf = [0u8; 64];
        let n = timeout(WAIT, self.reader.read(&mut buf))
            .await
            .expect("timed out waiting for close")
            .unwrap_or(0);
        assert_eq!(n, 0);
    }
}

async fn accept_data(listener: &TcpListener) -> TcpStream {
    let (stream, _) = timeout(WAIT, listener.accept())
        .await
        .expect("server never opened the data connection")
        .unwrap();
    stream
}

#[tokio::test]
async fn test_greeting_and_basic_commands() {
    let test = start_server().await;
    let mut client = Client::connect(test.addr).await;

    assert_eq!(client.cmd("SYST").await, (215, "UNIX Type: L8".into()));
    assert_eq!(client.cmd("NOOP").await, (200, "NOOP ok.".into()));
    assert_eq!(client.cmd("FOO bar").await, (500, "Unknown command: FOO".into()));
    assert_eq!(client.code("USER").await, 501);
    assert_eq!(client.cmd("user alice").await, (230, "User alice logged in.".into()));
    assert_eq!(client.cmd("TYPE A").await, (200, "Type set to I (binary).".into()));
    assert_eq!(client.cmd("QUIT").await, (221, "Goodbye.".into()));
    client.expect_eof().await;
}

#[tokio::test]
async fn test_commands_require_login() {
    let test = start_server().await;
    let mut client = Client::connect(test.addr).await;

    assert_eq!(client.cmd("PWD").await, (530, "Not logged in.".into()));
    assert_eq!(client.code("CWD sub").await, 530);
    assert_eq!(client.code("MKD sub").await, 530);
    assert_eq!(client.code("PORT 127,0,0,1,4,1").await, 530);
    assert_eq!(client.code("LIST").await, 530);
    assert!(!test.root.join("sub").exists());

    assert_eq!(client.code("USER alice").await, 230);
    assert_eq!(client.cmd("PWD").await, (257, "\"/\" is current directory.".into()));
    // The rejected PORT left no pending data port behind.
    assert_eq!(client.cmd("STOR a.txt").await, (425, "Use PORT first.".into()));
}

#[tokio::test]
async fn test_directory_navigation() {
    let test = start_server().await;
    let mut client = Client::login(test.addr).await;

    assert_eq!(client.cmd("MKD sub").await, (257, "\"/sub\" directory created.".into()));
    assert!(test.root.join("sub").is_dir());
    assert_eq!(client.code("MKD sub").await, 550);

    assert_eq!(client.cmd("CWD sub").await, (250, "Directory changed.".into()));
    assert_eq!(client.cmd("PWD").await, (257, "\"/sub\" is current directory.".into()));
    assert_eq!(client.code("MKD nested").await, 257);
    assert_eq!(client.code("CWD /sub/nested").await, 250);
    assert_eq!(client.cmd("PWD").await, (257, "\"/sub/nested\" is current directory.".into()));

    assert_eq!(client.code("CWD ../..").await, 250);
    assert_eq!(client.cmd("PWD").await, (257, "\"/\" is current directory.".into()));

    assert_eq!(client.code("CWD missing").await, 550);
    assert_eq!(client.code("CWD").await, 501);
    assert_eq!(client.code("MKD").await, 501);
}

#[tokio::test]
async fn test_paths_cannot_escape_root() {
    let test = start_server().await;
    let mut client = Client::login(test.addr).await;

    assert_eq!(client.code("CWD ..").await, 550);
    assert_eq!(client.code("CWD ../..").await, 550);
    assert_eq!(client.cmd("PWD").await, (257, "\"/\" is current directory.".into()));

    assert_eq!(client.cmd("MKD ../escape").await, (553, "Invalid directory name.".into()));
    assert!(!test.root.parent().unwrap().join("escape").exists());

    let _data = client.port().await;
    assert_eq!(client.cmd("RETR ../secret.txt").await, (550, "File not found.".into()));
    assert_eq!(client.cmd("STOR ../secret.txt").await, (553, "Invalid filename.".into()));
    assert_eq!(
        fs::read(test.root.parent().unwrap().join("secret.txt")).unwrap(),
        b"outside"
    );
}

#[tokio::test]
async fn test_invalid_port_arguments() {
    let test = start_server().await;
    let mut client = Client::login(test.addr).await;

    assert_eq!(client.code("PORT 127,0,0,1,300,1").await, 501);
    assert_eq!(client.code("PORT 127,0,0,1,4").await, 501);
    assert_eq!(client.code("PORT a,b,c,d,e,f").await, 501);
    assert_eq!(client.cmd("PORT 127,0,0,1,0,21").await, (501, "Port must be >= 1024.".into()));
    assert_eq!(client.code("PORT").await, 501);
    assert_eq!(client.cmd("STOR a.txt").await, (425, "Use PORT first.".into()));
    assert_eq!(client.code("RETR a.txt").await, 425);
    assert_eq!(client.code("LIST").await, 425);
}

#[tokio::test]
async fn test_store_then_retrieve() {
    let test = start_server().await;
    let mut client = Client::login(test.addr).await;
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    let listener = client.port().await;
    client.send("STOR data.bin").await;
    let mut data = accept_data(&listener).await;
    assert_eq!(client.reply().await.0, 150);
    data.write_all(&content).await.unwrap();
    drop(data);
    assert_eq!(client.reply().await, (226, "Transfer complete.".into()));

    assert_eq!(fs::read(test.root.join("data.bin")).unwrap(), content);

    // The port is single use.
    assert_eq!(client.code("STOR again.bin").await, 425);

    let listener = client.port().await;
    client.send("RETR data.bin").await;
    let mut data = accept_data(&listener).await;
    assert_eq!(
        client.reply().await,
        (150, "Opening BINARY mode data connection (10000 bytes).".into())
    );
    let mut received = Vec::new();
    data.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, content);
    assert_eq!(client.reply().await, (226, "Transfer complete.".into()));

    assert_eq!(client.code("RETR data.bin").await, 425);
}

#[tokio::test]
async fn test_retrieve_missing_or_directory() {
    let test = start_server().await;
    let mut client = Client::login(test.addr).await;
    fs::create_dir(test.root.join("dir")).unwrap();

    let _data = client.port().await;
    assert_eq!(client.code("RETR nothing.txt").await, 550);
    assert_eq!(
        client.cmd("RETR dir").await,
        (550, "File not found or not a regular file.".into())
    );
    assert_eq!(client.code("RETR").await, 501);
}

#[tokio::test]
async fn test_list_directory() {
    let test = start_server().await;
    let mut client = Client::login(test.addr).await;
    fs::create_dir(test.root.join("empty")).unwrap();
    fs::write(test.root.join("hello.txt"), b"hello").unwrap();

    let listener = client.port().await;
    client.send("LIST -la").await;
    let mut data = accept_data(&listener).await;
    assert_eq!(client.reply().await.0, 150);
    let mut listing = String::new();
    data.read_to_string(&mut listing).await.unwrap();
    assert_eq!(client.reply().await.0, 226);

    let lines: Vec<&str> = listing.split_terminator("\r\n").collect();
    assert_eq!(lines.len(), 2);
    let hello = lines.iter().find(|l| l.ends_with(" hello.txt")).unwrap();
    assert!(hello.starts_with("-rw"));
    assert_eq!(hello.split_whitespace().nth(4), Some("5"));
    let empty = lines.iter().find(|l| l.ends_with(" empty")).unwrap();
    assert!(empty.starts_with('d'));

    let listener = client.port().await;
    client.send("LIST empty").await;
    let mut data = accept_data(&listener).await;
    assert_eq!(client.reply().await.0, 150);
    let mut listing = Vec::new();
    data.read_to_end(&mut listing).await.unwrap();
    assert!(listing.is_empty());
    assert_eq!(client.reply().await.0, 226);

    let _data = client.port().await;
    assert_eq!(client.cmd("LIST hello.txt").await, (550, "Failed to open directory.".into()));
}

#[tokio::test]
async fn test_overlong_command_line_is_truncated() {
    let test = start_server().await;
    let mut client = Client::connect(test.addr).await;

    client.send(&format!("NOOP {}", "x".repeat(1000))).await;
    assert_eq!(client.reply().await.0, 200);
    // Nothing of the discarded tail is interpreted as a second command.
    assert_eq!(client.code("PWD").await, 530);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let test = start_server().await;
    let mut first = Client::login(test.addr).await;
    let mut second = Client::connect(test.addr).await;

    assert_eq!(first.code("MKD shared").await, 257);
    assert_eq!(first.code("CWD shared").await, 250);
    assert_eq!(second.code("PWD").await, 530);
    assert_eq!(second.code("USER bob").await, 230);
    assert_eq!(second.cmd("PWD").await, (257, "\"/\" is current directory.".into()));
    assert_eq!(first.cmd("PWD").await, (257, "\"/shared\" is current directory.".into()));
    assert_eq!(test.server.session_count(), 2);
}

#[tokio::test]
async fn test_stop_finishes_current_command_then_closes() {
    let test = start_server().await;
    let mut client = Client::connect(test.addr).await;

    test.server.stop();
    assert!(!test.server.is_running());
    timeout(WAIT, test.handle).await.unwrap().unwrap().unwrap();

    assert_eq!(client.code("NOOP").await, 200);
    client.expect_eof().await;
    timeout(WAIT, test.server.cleanup()).await.unwrap();
    assert_eq!(test.server.session_count(), 0);
}

#[tokio::test]
async fn test_cleanup_closes_idle_sessions() {
    let test = start_server().await;
    let mut idle = Client::login(test.addr).await;
    let mut fresh = Client::connect(test.addr).await;
    assert_eq!(test.server.session_count(), 2);

    test.server.stop();
    timeout(WAIT, test.handle).await.unwrap().unwrap().unwrap();
    timeout(WAIT, test.server.cleanup()).await.unwrap();

    assert_eq!(test.server.session_count(), 0);
    idle.expect_eof().await;
    fresh.expect_eof().await;
    assert!(TcpStream::connect(test.addr).await.is_err());
}

#[tokio::test]
async fn test_serve_only_once() {
    let test = start_server().await;
    let _client = Client::connect(test.addr).await;

    let listener = crate::core_network::network::bind_listener(0, 4).unwrap();
    assert!(matches!(
        test.server.serve(listener).await,
        Err(FtpdError::AlreadyStarted)
    ));

    test.server.stop();
    test.server.stop();
    timeout(WAIT, test.handle).await.unwrap().unwrap().unwrap();
    timeout(WAIT, test.server.cleanup()).await.unwrap();
}

#[tokio::test]
async fn test_stop_before_start() {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig {
        listen_port: 0,
        root_dir: dir.path().to_string_lossy().into_owned(),
        ..ServerConfig::default()
    };
    let server = Server::init(config).unwrap();
    let listener = server.listen().unwrap();

    server.stop();
    assert!(server.serve(listener).await.is_ok());
    timeout(WAIT, server.cleanup()).await.unwrap();
}

#[test]
fn test_init_rejects_missing_root() {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig {
        root_dir: dir.path().join("missing").to_string_lossy().into_owned(),
        ..ServerConfig::default()
    };
    assert!(matches!(
        Server::init(config),
        Err(FtpdError::RootDirectory { .. })
    ));

    let file = dir.path().join("file");
    fs::write(&file, b"").unwrap();
    let config = ServerConfig {
        root_dir: file.to_string_lossy().into_owned(),
        ..ServerConfig::default()
    };
    assert!(matches!(
        Server::init(config),
        Err(FtpdError::RootNotADirectory(_))
    ));
}

#[tokio::test]
async fn test_command_line_at_length_limit() {
    let test = start_server().await;
    let mut client = Client::login(test.addr).await;
    fs::create_dir(test.root.join("d")).unwrap();

    // 510 bytes plus CRLF fills the line buffer exactly.
    let arg = format!("d{}/", "/.".repeat(252));
    let line = format!("CWD {}", arg);
    assert_eq!(line.len() + 2, 512);
    assert_eq!(client.cmd(&line).await, (250, "Directory changed.".into()));
    assert_eq!(client.cmd("PWD").await, (257, "\"/d\" is current directory.".into()));

    // One byte more: the line is cut to 511 bytes, which drops only the CR.
    assert_eq!(client.code("CWD /").await, 250);
    let line = format!("CWD d{}", "/.".repeat(253));
    assert_eq!(line.len() + 2, 513);
    assert_eq!(client.cmd(&line).await, (250, "Directory changed.".into()));
    assert_eq!(client.cmd("PWD").await, (257, "\"/d\" is current directory.".into()));
}

#[tokio::test]
async fn test_store_onto_directory_aborts_transfer() {
    let test = start_server().await;
    let mut client = Client::login(test.addr).await;
    fs::create_dir(test.root.join("d")).unwrap();

    let listener = client.port().await;
    client.send("STOR d").await;
    let data = accept_data(&listener).await;
    assert_eq!(client.reply().await.0, 150);
    assert_eq!(client.reply().await, (426, "Transfer aborted.".into()));
    drop(data);

    assert!(test.root.join("d").is_dir());
    assert_eq!(client.cmd("STOR d").await, (425, "Use PORT first.".into()));
}

#[tokio::test]
async fn test_failed_data_connect_keeps_port() {
    let test = start_server().await;
    let mut client = Client::login(test.addr).await;
    fs::write(test.root.join("hello.txt"), b"hello").unwrap();

    // Nothing listens on the announced port any more.
    drop(client.port().await);

    let refused = (425, String::from("Can't open data connection."));
    assert_eq!(client.cmd("LIST").await, refused);
    assert_eq!(client.cmd("LIST").await, refused);
    assert_eq!(client.cmd("RETR hello.txt").await, refused);
    assert_eq!(client.cmd("STOR new.txt").await, refused);
    assert!(!test.root.join("new.txt").exists());
}
