//! Convert a Motorola S19 file into a FLEX CMD binary.

use log::info;
use crate::srec;
use crate::DYNERR;

/// default output name: up to 8 characters of the input name plus `.CMD`
fn default_output(input: &str) -> String {
    let short = match input.rsplit_once('/') {
        Some((_,base)) => base,
        None => input
    };
    let stem: String = short.chars().take_while(|c| *c != '.').take(8).collect();
    format!("{}.CMD",stem)
}

pub fn mot2cmd(cmd: &clap::ArgMatches) -> Result<i32,DYNERR> {
    let input = cmd.get_one::<String>("input").expect("required arg");
    let output = match cmd.get_one::<String>("output") {
        Some(path) => path.clone(),
        None => default_output(input)
    };
    let src = match std::fs::read(input) {
        Ok(src) => src,
        Err(e) => {
            eprintln!("{}: {}",input,e);
            return Ok(2);
        }
    };
    match srec::s19_to_cmd(&src) {
        Ok(dat) => {
            info!("writing to {}",output);
            std::fs::write(&output,&dat)?;
            Ok(0)
        },
        Err(e) => {
            eprintln!("Error: {}",e);
            Ok(1)
        }
    }
}
