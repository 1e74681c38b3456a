// Here's the list of the FTP commands implemented
pub mod cwd;
pub mod list;
pub mod mkd;
pub mod noop;
pub mod pwd;
pub mod quit;
pub mod retr;
pub mod stor;
pub mod syst;
pub mod type_;
pub mod user;

// Command parsing and the dispatch table
pub mod ftpcommand;
pub mod handlers;
