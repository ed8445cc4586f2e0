//! # `flexkit` main library
//!
//! This library manipulates FLEX disk images, the floppy file system of
//! the 6800/6809 microcomputers.  Manipulations can be done at a level as
//! low as raw sectors, or as high as whole files.
//!
//! ## Architecture
//!
//! Disk operations are built around two layers:
//! * `img::Img` holds the raw sector dump, does not try to interpret a
//!   file system
//! * `fs::flex::Session` imposes the FLEX file system on the image
//!
//! When a `Session` is created it takes ownership of some `Img` and uses
//! it as storage.  Any changes are not permanent until the image is saved
//! to whatever file system is hosting flexkit.
//!
//! The heart of the `Session` is the ownership map built by `parse`: an
//! assignment of every physical sector to the free chain, the directory,
//! a file, the reserved area, or nothing.  Validation, repair, insertion
//! and deletion are all expressed against that map.
//!
//! ## Side conversions
//!
//! * `fs::flex::pack` translates between Unix text and FLEX's compressed
//!   CR-terminated text
//! * `srec` converts Motorola S19 streams into FLEX CMD binaries

pub mod fs;
pub mod img;
pub mod srec;
pub mod commands;

use fs::flex;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Given a bytestream return a FLEX session, or Err if the bytestream
/// cannot be interpreted as a FLEX image.
pub fn create_session_from_bytestream(dat: &[u8]) -> Result<flex::Session,DYNERR> {
    let img = img::Img::from_bytes(dat)?;
    flex::Session::from_img(img)
}

/// Calls `create_session_from_bytestream` getting the bytes from a file.
pub fn create_session_from_file(img_path: &str) -> Result<flex::Session,DYNERR> {
    match std::fs::read(img_path) {
        Ok(dat) => create_session_from_bytestream(&dat),
        Err(e) => Err(Box::new(e))
    }
}

/// Save the image file (make changes permanent)
pub fn save_img(session: &flex::Session,img_path: &str) -> STDRESULT {
    std::fs::write(img_path,session.img().to_bytes())?;
    Ok(())
}
