use clap::{arg, crate_version, Arg, ArgAction, Command, ValueHint};

const TEXT_HELP: &str = "reads standard input when no input file is given,
writes standard output when no output file is given";

pub fn build_cli() -> Command {
    let long_help = "flexkit is always invoked with exactly one of several subcommands.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error
Warnings and errors are colored when TERM contains `color`.

Examples:
---------
create an image:     `flexkit mkdsk -d new.dsk -l GAMES -t 40 -s 10`
check an image:      `flexkit analyse myimg.dsk -v`
repair an image:     `flexkit analyse myimg.dsk -r`
copy files in:       `flexkit put notes.txt loader.cmd -d myimg.dsk`
copy files out:      `flexkit extract myimg.dsk -b`
FLEX text to Unix:   `flexkit unpack STARTUP.TXT startup.txt`";

    let mut main_cmd = Command::new("flexkit")
        .about("Manipulates FLEX disk images of the 6800/6809 microcomputers.")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(
        Command::new("analyse")
            .arg(
                arg!(<dimg> "path to disk image")
                    .value_hint(ValueHint::FilePath),
            )
            .arg(arg!(-r --repair "repair and/or reorder the free sector list").action(ArgAction::SetTrue))
            .arg(arg!(-v --verbose "print a detailed listing of files").action(ArgAction::SetTrue))
            .arg(arg!(-q --quiet "only report the exit status").action(ArgAction::SetTrue))
            .visible_alias("an")
            .about("check the sector chains of a disk image"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("extract")
            .arg(
                arg!(<dimg> "path to disk image")
                    .value_hint(ValueHint::FilePath),
            )
            .arg(arg!(-a --all "also extract recoverable deleted files").action(ArgAction::SetTrue))
            .arg(arg!(-b --basename "write into a directory named after the image").action(ArgAction::SetTrue))
            .visible_alias("x")
            .about("copy every file out of a disk image"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("put")
            .arg(
                arg!(<files> ... "host files to copy in")
                    .value_hint(ValueHint::FilePath),
            )
            .arg(
                arg!(-d --dimg <PATH> "path to disk image")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .arg(arg!(-f --force "accept unusual disk geometry").action(ArgAction::SetTrue))
            .arg(arg!(-v --verbose "list the files copied").action(ArgAction::SetTrue))
            .about("copy host files into a disk image"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("delete")
            .arg(arg!(<files> ... "FLEX file names to delete"))
            .arg(
                arg!(-d --dimg <PATH> "path to disk image")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .arg(arg!(-f --force "accept unusual disk geometry").action(ArgAction::SetTrue))
            .arg(arg!(-v --verbose "list the files deleted").action(ArgAction::SetTrue))
            .visible_alias("del")
            .about("delete files inside a disk image"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("mkdsk")
            .arg(
                arg!(-d --dimg <PATH> "disk image path to create")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .arg(arg!(-l --label <LABEL> "volume label, default is the file name").required(false))
            .arg(
                arg!(-v --volume <NUMBER> "volume number")
                    .value_parser(clap::value_parser!(u16))
                    .required(false)
                    .default_value("1"),
            )
            .arg(
                arg!(-t --tracks <COUNT> "number of tracks")
                    .value_parser(clap::value_parser!(u16).range(2..=256))
                    .required(false)
                    .default_value("40"),
            )
            .arg(
                arg!(-s --sectors <COUNT> "number of sectors per track")
                    .value_parser(clap::value_parser!(u8))
                    .required(false)
                    .default_value("10"),
            )
            .arg(
                arg!(--track0 <COUNT> "sectors in track 0, when different")
                    .value_parser(clap::value_parser!(u8))
                    .required(false),
            )
            .arg(arg!(--dd "double density layout with a single density track 0").action(ArgAction::SetTrue))
            .about("write a blank FLEX disk image to the given path"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("pack")
            .arg(
                Arg::new("tabstop").short('t').long("tabstop").help("tab stop used to expand host tabs").value_name("COLS")
                    .value_parser(clap::value_parser!(u8).range(1..))
                    .default_value("4"),
            )
            .arg(arg!([input] "Unix text file").value_hint(ValueHint::FilePath))
            .arg(arg!([output] "FLEX text file").value_hint(ValueHint::FilePath))
            .about("compress Unix text into FLEX text form")
            .after_help(TEXT_HELP),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("unpack")
            .arg(arg!([input] "FLEX text file").value_hint(ValueHint::FilePath))
            .arg(arg!([output] "Unix text file").value_hint(ValueHint::FilePath))
            .about("expand FLEX text into Unix text form")
            .after_help(TEXT_HELP),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("mot2cmd")
            .arg(arg!(<input> "Motorola S19 file").value_hint(ValueHint::FilePath))
            .arg(arg!([output] "CMD file, default is the input name with extension CMD").value_hint(ValueHint::FilePath))
            .about("convert a Motorola S19 file into a FLEX CMD binary"),
    );
    return main_cmd;
}
