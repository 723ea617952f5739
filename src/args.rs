use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct BaseArgs {
    /// Print the run summary as JSON
    #[arg(short = 'j', long, global = true)]
    pub json: bool,

    /// Directory holding one JSON shard per partition (or via HISTSYNC_ROOT) [default: ./json]
    #[arg(long, env = "HISTSYNC_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Base URL of the history API (or via HISTSYNC_API_URL)
    #[arg(
        long,
        env = "HISTSYNC_API_URL",
        hide_env_values = true,
        global = true
    )]
    pub api_url: Option<String>,

    /// Path to a JSON config file (default: ./histsync.json over the global config)
    #[arg(long, env = "HISTSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path to a .env file to load before running commands.
    #[arg(long, env = "HISTSYNC_ENV_FILE", hide_env_values = true, global = true)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct CLIArgs<T: Args> {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub args: T,
}
