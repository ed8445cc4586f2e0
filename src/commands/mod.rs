//! # CLI Subcommands
//!
//! Contains modules that run the subcommands.  Each returns the process
//! exit code; hard failures bubble up as errors and exit 3.

pub mod analyse;
pub mod extract;
pub mod write;
pub mod mkdsk;
pub mod text;
pub mod mot2cmd;

#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Command could not be interpreted")]
    InvalidCommand,
    #[error("One of the parameters was out of range")]
    OutOfRange,
    #[error("File already exists")]
    FileExists,
    #[error("File not found")]
    FileNotFound
}
