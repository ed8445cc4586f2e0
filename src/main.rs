//! # Command Line Interface
//!
//! Dispatch commands to `commands` module.  Every subcommand resolves to
//! an exit code: 0 clean, 1 warnings or partial success, 2 errors,
//! 3 not a FLEX image or unusable invocation.

use env_logger;
use flexkit::commands;

mod cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // colored warnings and errors only on a color terminal
    let color_term = match std::env::var("TERM") {
        Ok(term) => term.contains("color"),
        Err(_) => false
    };
    if !color_term || !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    let matches = cli::build_cli().get_matches();

    let result = match matches.subcommand() {
        Some(("analyse",cmd)) => commands::analyse::analyse(cmd),
        Some(("extract",cmd)) => commands::extract::extract(cmd),
        Some(("put",cmd)) => commands::write::put(cmd),
        Some(("delete",cmd)) => commands::write::delete(cmd),
        Some(("mkdsk",cmd)) => commands::mkdsk::mkdsk(cmd),
        Some(("pack",cmd)) => commands::text::pack(cmd),
        Some(("unpack",cmd)) => commands::text::unpack(cmd),
        Some(("mot2cmd",cmd)) => commands::mot2cmd::mot2cmd(cmd),
        _ => {
            log::error!("No subcommand was found, try `flexkit --help`");
            Err(Box::new(commands::CommandError::InvalidCommand).into())
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}",e);
            std::process::exit(3);
        }
    }
}
