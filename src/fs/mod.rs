//! # File System Module
//!
//! The `flex` sub-module imposes the FLEX file system on an already
//! decoded sector image.  The file system is represented by a `Session`
//! which takes ownership of some `img::Img` and uses it as storage.
//!
//! Disk structures (the System Information Record, directory entries)
//! are represented by the `DiskStruct` trait, which moves them between
//! their flattened on-disk form and a structured form.

pub mod flex;

/// Enumerates file system level errors.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("file system not compatible with request")]
    FileSystemMismatch,
    #[error("file image format is wrong")]
    FileImageFormat
}

/// Disk structures that can be flattened to, and recovered from, a run
/// of bytes on the disk.
pub trait DiskStruct {
    /// Create an empty structure
    fn new() -> Self where Self: Sized;
    /// Create structure using flattened bytes (typically from disk)
    fn from_bytes(dat: &[u8]) -> Self where Self: Sized;
    /// Return flattened bytes (typically written to disk)
    fn to_bytes(&self) -> Vec<u8>;
    /// Length of the flattened structure
    fn len(&self) -> usize;
}
