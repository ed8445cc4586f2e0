//! # Sector Image Module
//!
//! A FLEX disk image is a simple sequential dump of the already-decoded
//! 256-byte sectors, with no inter-sector headers.  This module owns the
//! raw bytes and exposes them at sector granularity; interpretation of
//! what a sector *means* is left entirely to the `fs` module.

use log::warn;
use crate::DYNERR;

/// Size of a FLEX sector in bytes, also the addressing granularity.
pub const SECTOR_SIZE: usize = 256;

#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("block {0} outside image bounds")]
    BlockAccess(usize),
    #[error("image is empty")]
    Empty
}

/// Wrapper for the raw image bytes.  Any changes are not permanent until
/// the buffer is written back to whatever file system is hosting flexkit.
pub struct Img {
    data: Vec<u8>,
    leftover: usize
}

impl Img {
    /// Create a blank image of `nb_sectors` zeroed sectors.
    pub fn create(nb_sectors: usize) -> Self {
        Self {
            data: vec![0;nb_sectors*SECTOR_SIZE],
            leftover: 0
        }
    }
    /// Wrap an existing byte stream.  Bytes beyond the last whole sector
    /// are kept but never addressed; their count is remembered so the
    /// analyser can report them.
    pub fn from_bytes(dat: &[u8]) -> Result<Self,DYNERR> {
        if dat.len() < SECTOR_SIZE {
            return Err(Box::new(Error::Empty));
        }
        let leftover = dat.len() % SECTOR_SIZE;
        if leftover > 0 {
            warn!("disk size is not a whole number of sectors: {} bytes left",leftover);
        }
        Ok(Self {
            data: dat.to_vec(),
            leftover
        })
    }
    pub fn num_blocks(&self) -> usize {
        self.data.len() / SECTOR_SIZE
    }
    /// leftover bytes beyond the last whole sector
    pub fn leftover(&self) -> usize {
        self.leftover
    }
    pub fn sector(&self,block: usize) -> Result<&[u8],DYNERR> {
        if block >= self.num_blocks() {
            return Err(Box::new(Error::BlockAccess(block)));
        }
        Ok(&self.data[block*SECTOR_SIZE..(block+1)*SECTOR_SIZE])
    }
    pub fn sector_mut(&mut self,block: usize) -> Result<&mut [u8],DYNERR> {
        if block >= self.num_blocks() {
            return Err(Box::new(Error::BlockAccess(block)));
        }
        Ok(&mut self.data[block*SECTOR_SIZE..(block+1)*SECTOR_SIZE])
    }
    /// the link bytes of a sector, `(track,sector)` of the successor
    pub fn link(&self,block: usize) -> Result<[u8;2],DYNERR> {
        let sec = self.sector(block)?;
        Ok([sec[0],sec[1]])
    }
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn sector_bounds() {
        let mut img = Img::create(4);
        assert_eq!(img.num_blocks(),4);
        assert!(img.sector(3).is_ok());
        assert!(img.sector(4).is_err());
        img.sector_mut(1).expect("bad sector")[0] = 0xAA;
        assert_eq!(img.sector(1).expect("bad sector")[0],0xAA);
    }
    #[test]
    fn partial_sector_kept() {
        let img = Img::from_bytes(&vec![0;SECTOR_SIZE*2+100]).expect("bad image");
        assert_eq!(img.num_blocks(),2);
        assert_eq!(img.leftover(),100);
    }
}
