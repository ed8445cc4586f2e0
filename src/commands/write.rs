//! Copy host files into a disk image, or delete FLEX files from it.
//! Both mutate the free chain, so both insist on a coherent one; run
//! `analyse -r` first on a disk with freelist warnings.

use chrono::{DateTime,Local};
use log::info;
use crate::fs::flex::{Session,types::Error as FlexError};
use crate::DYNERR;

/// exit 2 when the disk refuses all mutation, else None
fn open_for_write(cmd: &clap::ArgMatches) -> Result<Result<Session,i32>,DYNERR> {
    let path = cmd.get_one::<String>("dimg").expect("required arg");
    let force = cmd.get_flag("force");
    let mut sess = match crate::create_session_from_file(path) {
        Ok(sess) => sess,
        Err(e) => {
            eprintln!("{}",e);
            return Ok(Err(2));
        }
    };
    if sess.geometry().unusual && !force {
        eprintln!("unusual geometry found, use -f to accept: {}",sess.geometry().describe());
        return Ok(Err(2));
    }
    sess.parse()?;
    Ok(Ok(sess))
}

pub fn put(cmd: &clap::ArgMatches) -> Result<i32,DYNERR> {
    let path = cmd.get_one::<String>("dimg").expect("required arg");
    let verbose = cmd.get_flag("verbose");
    let files: Vec<&String> = cmd.get_many::<String>("files").expect("required arg").collect();
    let mut sess = match open_for_write(cmd)? {
        Ok(sess) => sess,
        Err(code) => return Ok(code)
    };
    let mut copied = 0;
    let mut skipped = 0;
    for host in files.iter().map(|s| s.as_str()) {
        let dat = match std::fs::read(host) {
            Ok(dat) => dat,
            Err(e) => {
                eprintln!("{}: {}",host,e);
                skipped += 1;
                continue;
            }
        };
        let mtime: DateTime<Local> = match std::fs::metadata(host).and_then(|m| m.modified()) {
            Ok(t) => t.into(),
            Err(_) => Local::now()
        };
        match sess.put_file(host,&dat,mtime.date_naive()) {
            Ok(name) => {
                copied += 1;
                if verbose || name != host {
                    println!("copying file {} as {}",host,name);
                }
            },
            Err(e) => {
                if let Some(FlexError::DamagedDisk) = e.downcast_ref::<FlexError>() {
                    eprintln!("{}: run `analyse -r` first",e);
                    return Ok(2);
                }
                eprintln!("can't copy {}: {}",host,e);
                skipped += 1;
            }
        }
    }
    if copied > 0 {
        crate::save_img(&sess,path)?;
        info!("{} file(s) copied to {}",copied,path);
    }
    Ok(match (copied,skipped) {
        (_,0) => 0,
        (0,_) => 2,
        _ => 1
    })
}

pub fn delete(cmd: &clap::ArgMatches) -> Result<i32,DYNERR> {
    let path = cmd.get_one::<String>("dimg").expect("required arg");
    let verbose = cmd.get_flag("verbose");
    let files: Vec<&String> = cmd.get_many::<String>("files").expect("required arg").collect();
    let mut sess = match open_for_write(cmd)? {
        Ok(sess) => sess,
        Err(code) => return Ok(code)
    };
    let mut deleted = 0;
    let mut missed = 0;
    for name in files.iter().map(|s| s.as_str()) {
        match sess.delete_file(name) {
            Ok(()) => {
                deleted += 1;
                if verbose {
                    println!("File {} deleted",name);
                }
            },
            Err(e) => {
                if let Some(FlexError::DamagedDisk) = e.downcast_ref::<FlexError>() {
                    eprintln!("{}: run `analyse -r` first",e);
                    return Ok(2);
                }
                eprintln!("File to delete not found: {}",name);
                missed += 1;
            }
        }
    }
    if deleted > 0 {
        crate::save_img(&sess,path)?;
    }
    Ok(match (deleted,missed) {
        (_,0) => 0,
        (0,_) => 2,
        _ => 1
    })
}
