use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsString;

mod args;
mod config;
mod dispatch;
mod env;
mod error;
mod http;
mod limiter;
mod status;
mod store;
mod sync;
#[cfg(test)]
mod test_support;
mod ui;
mod utils;

use crate::args::CLIArgs;
use crate::ui::{print_command_status, CommandStatus};

const CLI_VERSION: &str = env!("HISTSYNC_VERSION_STRING");

#[derive(Debug, Parser)]
#[command(
    name = "histsync",
    about = "Mirror a date-partitioned history API locally and replay it downstream",
    version = CLI_VERSION,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download every partition whose local shard is missing or incomplete
    #[command(alias = "download")]
    Sync(CLIArgs<sync::SyncArgs>),
    /// POST every locally stored record to a destination URL and tally the responses
    #[command(alias = "load")]
    Dispatch(CLIArgs<dispatch::DispatchArgs>),
    /// Summarize the local shards
    Status(CLIArgs<status::StatusArgs>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    env::bootstrap_from_args(&argv)?;
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) => {
            // Usage problems are reported, never escalated.
            err.print()?;
            if err.use_stderr() {
                print_command_status(
                    CommandStatus::Warning,
                    "options are 'sync' or 'dispatch <url> [rate]'",
                );
            }
            return Ok(());
        }
    };

    match cli.command {
        Commands::Sync(cmd) => sync::run(cmd.base, cmd.args).await?,
        Commands::Dispatch(cmd) => dispatch::run(cmd.base, cmd.args).await?,
        Commands::Status(cmd) => status::run(cmd.base, cmd.args).await?,
    }

    Ok(())
}
