//! Dump every usable file out of a disk image into a host directory.
//! Recoverable deleted files come along when asked; their names keep the
//! `?` marker left by the delete.

use std::path::PathBuf;
use log::warn;
use crate::fs::flex::types::FileFlags;
use crate::DYNERR;

pub fn extract(cmd: &clap::ArgMatches) -> Result<i32,DYNERR> {
    let path = cmd.get_one::<String>("dimg").expect("required arg");
    let all = cmd.get_flag("all");
    let basename = cmd.get_flag("basename");
    let mut sess = match crate::create_session_from_file(path) {
        Ok(sess) => sess,
        Err(e) => {
            eprintln!("{}",e);
            return Ok(3);
        }
    };
    sess.parse()?;
    let out_dir = match basename {
        true => {
            let short = match path.rsplit_once('/') {
                Some((_,base)) => base,
                None => path
            };
            let stem = match short.rsplit_once('.') {
                Some((s,_)) if !s.is_empty() => s,
                _ => short
            };
            let dir = PathBuf::from(stem);
            std::fs::create_dir_all(&dir)?;
            dir
        },
        false => PathBuf::from(".")
    };
    let mut count = 0;
    for k in 0..sess.files().len() {
        let f = &sess.files()[k];
        let deleted = f.flags.contains(FileFlags::DELETED);
        let wanted = match deleted {
            false => !f.flags.contains(FileFlags::CORRUPTED),
            true => all && f.flags.contains(FileFlags::RECOVERABLE)
                && !f.flags.contains(FileFlags::CORRUPTED)
        };
        if !wanted || f.length == 0 {
            continue;
        }
        let (dat,truncated) = sess.read_file(k)?;
        let host_path = out_dir.join(&sess.files()[k].name);
        std::fs::write(&host_path,&dat)?;
        if truncated {
            warn!("file '{}' may be truncated",host_path.display());
        }
        count += 1;
    }
    println!("{} file(s) extracted to {}",count,out_dir.display());
    Ok(sess.status() as i32)
}
