use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::args::BaseArgs;
use crate::config::Settings;
use crate::http::{HistoryClient, TotalsIndex};
use crate::limiter::RateLimiter;
use crate::store::{read_shard_file, ShardStore};
use crate::sync::plan_sync;
use crate::ui::{print_command_status, with_spinner, CommandStatus};

#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
    /// Compare local shards against a fresh totals index (one request, nothing is downloaded)
    #[arg(long)]
    check_remote: bool,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct LocalStatus {
    pub shards: usize,
    pub records: usize,
    pub unreadable: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    root: String,
    #[serde(flatten)]
    local: LocalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    incomplete: Option<Vec<String>>,
}

pub async fn run(base: BaseArgs, args: StatusArgs) -> Result<()> {
    let settings = Settings::resolve(&base);
    let store = ShardStore::new(&settings.root);

    let local = if store.root().is_dir() {
        inspect(&store)?
    } else {
        print_command_status(
            CommandStatus::Warning,
            &format!("{} does not exist yet; run sync first", store.root().display()),
        );
        LocalStatus::default()
    };

    let incomplete = if args.check_remote {
        let client = HistoryClient::new(&settings.api_url, Arc::new(RateLimiter::per_second(1)));
        let totals: TotalsIndex =
            with_spinner("Fetching totals index...", client.fetch_totals()).await?;
        Some(plan_sync(&store, &totals).pending)
    } else {
        None
    };

    if settings.json {
        let output = StatusOutput {
            root: store.root().display().to_string(),
            local,
            incomplete,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("root: {}", store.root().display());
    println!("shards: {}", local.shards);
    println!("records: {}", local.records);
    for name in &local.unreadable {
        println!("unreadable: {name}");
    }
    if let Some(incomplete) = incomplete {
        println!("incomplete: {}", incomplete.len());
        for key in incomplete {
            println!("  {key}");
        }
    }
    Ok(())
}

/// Count shards and records without failing on a corrupt shard.
pub fn inspect(store: &ShardStore) -> Result<LocalStatus> {
    let mut status = LocalStatus::default();
    for path in store.list_shards()? {
        status.shards += 1;
        match read_shard_file(&path) {
            Ok(shard) => status.records += shard.len(),
            Err(_) => status.unreadable.push(file_name(&path)),
        }
    }
    Ok(status)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
