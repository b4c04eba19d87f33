//! Service layer for file I/O and output encoding
//!
//! The compositing pipeline never touches the filesystem; these services sit
//! between it and the CLI.

pub mod format;
pub mod io;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
