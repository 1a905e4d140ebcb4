mod size;

use std::path::PathBuf;

use clap::{builder::ValueParser, value_parser, Arg, ArgAction, Command};

pub use size::parse_size;

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Split WAV files into independently playable chunks of bounded size")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("size")
                .short('s')
                .long("size")
                .value_name("SIZE")
                .help("Maximum PCM bytes per chunk (e.g. 6000, 512KiB, 1.5MB)")
                .required_unless_present("request")
                .value_parser(ValueParser::new(parse_size)),
        )
        .arg(
            Arg::new("prefix")
                .short('p')
                .long("prefix")
                .value_name("PREFIX")
                .help("Prefix of the generated chunk names [default: input path without extension]"),
        )
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("DIR")
                .help("Directory that relative input paths and prefixes resolve against")
                .default_value(".")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("How to print the chunk report")
                .default_value("text")
                .value_parser(["text", "json"]),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .help("Allow overwriting existing chunk files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("create-dirs")
                .long("create-dirs")
                .help("Create the output directory if it does not exist")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Preview the generated chunks without writing files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("request")
                .long("request")
                .help("Read a JSON split request from stdin and answer with a JSON report")
                .action(ArgAction::SetTrue)
                .conflicts_with_all(["size", "prefix", "format", "dry-run", "file_path"]),
        )
        .arg(
            Arg::new("file_path")
                .value_name("FILE_PATH")
                .help("Path to the input WAV file")
                .required_unless_present("request")
                .value_parser(value_parser!(PathBuf)),
        )
}
