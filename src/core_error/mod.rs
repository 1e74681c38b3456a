pub mod error;

pub use error::FtpdError;
