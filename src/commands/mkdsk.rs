//! Write a blank FLEX image: boot pair, SIR, empty directory, and one
//! free chain covering everything else.

use chrono::Local;
use log::warn;
use crate::fs::flex;
use crate::DYNERR;

/// the label defaults to the image file name, coerced to FLEX characters
fn default_label(path: &str) -> String {
    let short = match path.rsplit_once('/') {
        Some((_,base)) => base,
        None => path
    };
    let stem = match short.split_once('.') {
        Some((s,_)) => s,
        None => short
    };
    stem.chars().take(11).map(|c| match c {
        c if c.is_ascii_alphanumeric() || c=='-' || c=='_' => c,
        _ => '_'
    }).collect()
}

pub fn mkdsk(cmd: &clap::ArgMatches) -> Result<i32,DYNERR> {
    let path = cmd.get_one::<String>("dimg").expect("required arg");
    let volnum = *cmd.get_one::<u16>("volume").expect("has default");
    let tracks = *cmd.get_one::<u16>("tracks").expect("has default") as usize;
    let sectors = *cmd.get_one::<u8>("sectors").expect("has default") as usize;
    let dd = cmd.get_flag("dd");
    let label = match cmd.get_one::<String>("label") {
        Some(l) => {
            let coerced: String = l.chars().take(11).map(|c| match c {
                c if c.is_ascii_alphanumeric() || c=='-' || c=='_' => c,
                _ => '_'
            }).collect();
            if coerced != l.chars().take(11).collect::<String>() || l.len() > 11 {
                warn!("volume label stored as {}",coerced);
            }
            coerced
        },
        None => default_label(path)
    };
    if sectors < 6 + 2*(dd as usize) || sectors > 255 {
        eprintln!("number of sectors: 6 to 255 (8 to 255 for double density disks)");
        return Ok(2);
    }
    let track0len = match cmd.get_one::<u8>("track0") {
        Some(ft) => *ft as usize,
        None => match dd {
            true => sectors/2 + 2,
            false => sectors
        }
    };
    if track0len < 6 || track0len > sectors {
        eprintln!("track 0 size must be at least 6 and at most {} sectors",sectors);
        return Ok(2);
    }
    let img = flex::format_img(&label,volnum,tracks,sectors,track0len,Local::now().date_naive())?;
    // never clobber an existing image
    let mut fd = match std::fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(fd) => fd,
        Err(e) => {
            eprintln!("operation aborted: {}: {}",path,e);
            return Ok(2);
        }
    };
    std::io::Write::write_all(&mut fd,&img.to_bytes())?;
    println!("Writing Flex image file {}",path);
    println!("Flex Volume Name '{}' (Vol # {}) with {} tracks of {} sectors, track 0 of {} sectors",
        label,volnum,tracks,sectors,track0len);
    Ok(0)
}
