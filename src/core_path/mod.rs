//! Client path resolution confined to the server root.
pub mod error;
pub mod resolver;

pub use error::PathError;
pub use resolver::{resolve_client_path, to_display_path};
