pub mod commands;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "estuary")]
#[command(about = "Republish RSS/Atom feeds as Mastodon statuses", long_about = None)]
pub struct Cli {
    /// Perform a trial run with no changes made: don't post, don't save config
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file to use
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
