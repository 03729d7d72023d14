use std::io::ErrorKind;
use std::process;

use clap::Parser;
use cli::{Args, Command};
use error::{DataverError, DataverResult};
use log::LevelFilter;
use rayon::ThreadPoolBuilder;

mod builder;
mod cli;
mod commands;
mod config;
mod error;
mod inspector;
mod manifest;
mod metadata;
mod prelude;
mod progress;
mod record;
mod shard;
mod source;
mod store;
mod utils;

fn num_threads(args: &Args) -> usize {
    if let Some(num_threads) = args.num_jobs {
        return num_threads;
    }

    0
}

fn init_logger(args: &Args) {
    let level = args
        .cmd
        .verbosity()
        .map(|v| v.level_filter())
        .unwrap_or(LevelFilter::Warn);

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .init();
}

fn run(args: Args) -> DataverResult<()> {
    match args.cmd {
        Command::Archive(cmd) => cmd.execute(),
        Command::Build(cmd) => cmd.execute(),
        Command::Completions(cmd) => cmd.execute(),
        Command::Init(cmd) => cmd.execute(),
        Command::Inspect(cmd) => cmd.execute(),
        Command::List(cmd) => cmd.execute(),
        Command::Remove(cmd) => cmd.execute(),
        Command::Verify(cmd) => cmd.execute(),
    }
}

fn main() {
    let args = Args::parse();
    init_logger(&args);

    if let Err(e) = ThreadPoolBuilder::new()
        .num_threads(num_threads(&args))
        .build_global()
    {
        eprintln!("error: {e:#}");
        process::exit(1);
    }

    match run(args) {
        Ok(()) => process::exit(0),
        Err(DataverError::IO(e)) if e.kind() == ErrorKind::BrokenPipe => {
            process::exit(0)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}
