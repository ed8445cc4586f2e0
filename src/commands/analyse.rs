//! Parse and validate a disk image, optionally repairing the free chain
//! and compacting the directory.  The report mirrors what the ownership
//! map knows: volume info, geometry guess, findings, and the file table.

use colored::Colorize;
use log::error;
use crate::fs::flex::{Session,types::FileFlags};
use crate::DYNERR;

pub fn analyse(cmd: &clap::ArgMatches) -> Result<i32,DYNERR> {
    let path = cmd.get_one::<String>("dimg").expect("required arg");
    let verbose = cmd.get_flag("verbose");
    let mut quiet = cmd.get_flag("quiet");
    let repair = cmd.get_flag("repair");
    if quiet && verbose {
        eprintln!("options `-q` and `-v` are exclusive, `-q` ignored");
        quiet = false;
    }
    let mut sess = match crate::create_session_from_file(path) {
        Ok(sess) => sess,
        Err(e) => {
            eprintln!("{}",e.to_string().red());
            return Ok(3);
        }
    };
    sess.parse()?;

    if !quiet {
        let short = match path.rsplit_once('/') {
            Some((_,base)) => base,
            None => path
        };
        println!("File name: {}",short);
        println!("Physical number of sectors: {}",sess.img().num_blocks());
        if sess.img().leftover() > 0 {
            println!("[disk size doesn't match an integer number of sectors: {} bytes left]",
                sess.img().leftover());
        }
        let geom = sess.geometry();
        println!("Flex Volume name: {}, {} tracks, {} sectors/track",
            sess.label(),geom.nbtrk+1,geom.nbsec);
        println!("Flex Volume number: {}",sess.sir().volnum);
        println!("Creation Date: {}",sess.sir().date());
        println!("Geometry: {}",geom.describe());
        println!("Number of data sectors: {}",geom.nbtrk*geom.nbsec);
        println!("Free sectors: {} [{} - {}]",sess.sir().free_count,
            sess.sir().free_head,sess.sir().free_tail);
        if sess.sir().free_count == 0 {
            println!("{}","Warning: empty free list".yellow());
        }
        println!("Total number of sectors used by files: {}",sess.used_sector_count());
        println!("Number of sectors used by directory outside track 0: {}",
            sess.dir_sectors_outside_track0());
    }

    if !quiet {
        for f in sess.findings() {
            match f.severity() {
                1 => println!("{}",format!("Warning: {}",f).yellow()),
                _ => println!("{}",format!("ERROR: {}",f).red())
            }
        }
        list_files(&sess,verbose);
    }

    let mut status = sess.status() as i32;
    if repair {
        if status > 1 {
            error!("errors prevent repair, only the free chain can be rebuilt");
            return Ok(status);
        }
        let ndel = sess.deleted_count();
        let report = sess.repair()?;
        if !quiet {
            if ndel > 0 {
                println!("Recovery of {} deleted entries, now {}/{} entries in directory.",
                    report.compacted,sess.files().len(),sess.slot_count());
            }
            match report.modifications {
                0 => println!("Freelist clean: no modification needed"),
                n => println!("New free list of {} sectors created ({} modifications)",
                    report.free_count,n)
            }
        }
        if report.modifications > 0 || report.compacted > 0 {
            crate::save_img(&sess,path)?;
        }
        status = sess.status() as i32;
    }
    Ok(status)
}

fn list_files(sess: &Session,verbose: bool) {
    let files = sess.files();
    if files.is_empty() {
        println!("Empty directory ({} entries).",sess.slot_count());
        return;
    }
    let ndel = sess.deleted_count();
    if verbose {
        println!();
        println!("File list ({} used + {} deleted / {} entries):",
            files.len()-ndel,ndel,sess.slot_count());
        println!(" id       Filename    start    end    size      date    flags");
        for (k,f) in files.iter().enumerate() {
            print!("{:3} {:>14} [{} - {}] {:5}   {}",
                k+1,f.name,f.start,f.end,f.length,f.date);
            if f.flags.contains(FileFlags::RANDOM) {
                print!(" random access");
            }
            if f.flags.contains(FileFlags::DELETED) {
                print!(" DELETED");
            }
            if f.flags.contains(FileFlags::CORRUPTED) {
                print!(" {}","CORRUPTED".red());
            }
            if f.flags.contains(FileFlags::UNUSABLE) {
                print!(" {}","UNUSABLE".yellow());
            }
            if f.flags.contains(FileFlags::RECOVERABLE) {
                print!(" (maybe recoverable)");
            }
            println!();
        }
    } else {
        println!();
        println!("File list ({}/{}):",files.len(),sess.slot_count());
        let mut j = 0;
        for f in files {
            if f.is_unusable() {
                continue;
            }
            print!("{:>12}     ",f.name);
            j += 1;
            if j % 5 == 0 {
                println!();
            }
        }
        println!();
    }
}
