use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

use statbar::commands;
use statbar::commands::monitor::parse_interval_ms;
use statbar::commands::{parse_profile, parse_range};

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_name("FILE")
        .help("Read settings from FILE instead of the user config directory")
        .value_parser(clap::value_parser!(PathBuf))
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Print snapshots as JSON")
        .action(ArgAction::SetTrue)
}

fn sampling_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .value_name("PROFILE")
                .help("Sampling profile: eco (2s), balanced (1s), performance (500ms)")
                .value_parser(parse_profile),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("MS")
                .help("Sampling interval in milliseconds (overrides --profile)")
                .value_parser(parse_interval_ms),
        )
        .arg(
            Arg::new("range")
                .short('r')
                .long("range")
                .value_name("RANGE")
                .help("History window: 5m, 1h or 24h")
                .value_parser(parse_range),
        )
        .arg(config_arg())
        .arg(json_arg())
}

fn build_cli() -> Command {
    Command::new("statbar")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Samples CPU, GPU, memory, disk, network, battery, fan and temperature metrics")
        .subcommand(
            sampling_args(Command::new("monitor").about("Sample continuously and print every tick")).arg(
                Arg::new("count")
                    .short('n')
                    .long("count")
                    .value_name("N")
                    .help("Stop after N snapshots")
                    .value_parser(clap::value_parser!(u64).range(1..)),
            ),
        )
        .subcommand(sampling_args(
            Command::new("snapshot").about("Take one settled reading and exit"),
        ))
        .subcommand(
            Command::new("sensors")
                .about("Show which sensor sources are reachable")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or change saved settings")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("path").about("Print the config file location"))
                .subcommand(
                    Command::new("set")
                        .about("Set a value: profile, range, bridge, probe, cache-ttl")
                        .arg(Arg::new("key").required(true).index(1))
                        .arg(Arg::new("value").required(true).index(2)),
                ),
        )
}

fn main() -> Result<()> {
    statbar::init_logging();

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("monitor", sub_matches)) => commands::monitor::execute(sub_matches),
        Some(("snapshot", sub_matches)) => commands::snapshot::execute(sub_matches),
        Some(("sensors", sub_matches)) => commands::sensors::execute(sub_matches),
        Some(("config", sub_matches)) => commands::config::handle(sub_matches),
        _ => {
            println!("Welcome to statbar!");
            println!("Use 'statbar --help' for more information.");
            Ok(())
        }
    }
}
