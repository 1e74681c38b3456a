// src/constants.rs

/// Default port for the FTP server.
pub const DEFAULT_PORT: u16 = 21021;

/// Default root directory served to clients.
pub const DEFAULT_ROOT_DIR: &str = "srv/ftp";

/// Maximum number of pending connections on the listening socket.
pub const MAX_CLIENTS: u32 = 64;

/// Size of read/write buffers for data transfers.
pub const BUFFER_SIZE: usize = 4096;

/// Maximum length of an FTP command line, terminator included.
pub const CMD_MAX: usize = 512;

/// Maximum length of a username, terminator included.
pub const USERNAME_MAX: usize = 64;

/// Lowest data port a client may advertise with PORT.
pub const MIN_DATA_PORT: u16 = 1024;

pub const GREETING: &str = "jbox FTP server ready.";
pub const SYSTEM_TYPE: &str = "UNIX Type: L8";

/// Reply codes used on the control channel.
pub mod reply {
    pub const OPENING_DATA_CONNECTION: u16 = 150;
    pub const COMMAND_OK: u16 = 200;
    pub const SYSTEM_TYPE: u16 = 215;
    pub const SERVICE_READY: u16 = 220;
    pub const CLOSING_CONTROL: u16 = 221;
    pub const TRANSFER_COMPLETE: u16 = 226;
    pub const LOGGED_IN: u16 = 230;
    pub const FILE_ACTION_OK: u16 = 250;
    pub const PATH_CREATED: u16 = 257;
    pub const CANT_OPEN_DATA_CONNECTION: u16 = 425;
    pub const TRANSFER_ABORTED: u16 = 426;
    pub const UNKNOWN_COMMAND: u16 = 500;
    pub const SYNTAX_ERROR_ARGS: u16 = 501;
    pub const NOT_LOGGED_IN: u16 = 530;
    pub const FILE_UNAVAILABLE: u16 = 550;
    pub const FILE_NAME_NOT_ALLOWED: u16 = 553;
}
