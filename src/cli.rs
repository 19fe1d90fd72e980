use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use std::path::PathBuf;

use crate::capture::{CaptureMethod, WindowId};

fn target_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("window")
                .long("window")
                .short('w')
                .help("Window handle, decimal or 0x-prefixed hex")
                .value_name("HANDLE")
                .value_parser(|s: &str| s.parse::<WindowId>()),
        )
        .arg(
            Arg::new("find")
                .long("find")
                .short('f')
                .help("Use the first window whose process name or title contains KEYWORD")
                .value_name("KEYWORD"),
        )
        .group(
            ArgGroup::new("target")
                .args(["window", "find"])
                .required(true)
                .multiple(false),
        )
        .arg(
            Arg::new("method")
                .long("method")
                .short('m')
                .help("standard, handle, auto, background or smart (default: from config)")
                .value_parser(|s: &str| s.parse::<CaptureMethod>()),
        )
        .arg(
            Arg::new("ocr")
                .long("ocr")
                .help("Run text recognition and save the records next to the image")
                .action(ArgAction::SetTrue),
        )
}

pub fn build_cli() -> Command {
    Command::new("window-capture")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Capture windows of other processes, even minimized or occluded ones")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Config file (default: config.json next to the executable)")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("List visible windows whose process name or title contains KEYWORD")
                .arg(Arg::new("keyword").required(true).index(1))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            target_args(Command::new("capture").about("Capture a window once and save it as PNG"))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file (default: timestamped file in the captures directory)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            target_args(
                Command::new("watch")
                    .about("Capture a window periodically until Enter is pressed"),
            )
            .arg(
                Arg::new("interval")
                    .long("interval")
                    .short('i')
                    .help("Seconds between captures (default: from config)")
                    .value_parser(clap::value_parser!(u64).range(1..)),
            ),
        )
}

/// The window a capture or watch command is aimed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Window(WindowId),
    Find(String),
}

impl Target {
    pub fn from_matches(matches: &ArgMatches) -> Option<Self> {
        if let Some(window) = matches.get_one::<WindowId>("window") {
            return Some(Target::Window(*window));
        }
        matches
            .get_one::<String>("find")
            .map(|keyword| Target::Find(keyword.clone()))
    }
}
