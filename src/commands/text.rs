//! Text filters between Unix form and FLEX form, usable in a pipeline
//! or on named files.

use std::io::{Read,Write};
use crate::fs::flex::pack as textcodec;
use crate::DYNERR;

fn read_input(maybe_path: Option<&String>) -> Result<Vec<u8>,DYNERR> {
    match maybe_path {
        Some(path) => Ok(std::fs::read(path)?),
        None => {
            let mut dat = Vec::new();
            std::io::stdin().read_to_end(&mut dat)?;
            Ok(dat)
        }
    }
}

fn write_output(maybe_path: Option<&String>,dat: &[u8]) -> Result<(),DYNERR> {
    match maybe_path {
        Some(path) => std::fs::write(path,dat)?,
        None => std::io::stdout().write_all(dat)?
    }
    Ok(())
}

pub fn pack(cmd: &clap::ArgMatches) -> Result<i32,DYNERR> {
    let tabstop = *cmd.get_one::<u8>("tabstop").expect("has default") as usize;
    let src = read_input(cmd.get_one::<String>("input"))?;
    write_output(cmd.get_one::<String>("output"),&textcodec::pack(&src,tabstop))?;
    Ok(0)
}

pub fn unpack(cmd: &clap::ArgMatches) -> Result<i32,DYNERR> {
    let src = read_input(cmd.get_one::<String>("input"))?;
    write_output(cmd.get_one::<String>("output"),&textcodec::unpack(&src))?;
    Ok(0)
}
