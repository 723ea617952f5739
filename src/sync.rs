use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::Args;
use indicatif::ProgressBar;
use serde::Serialize;

use crate::args::BaseArgs;
use crate::config::Settings;
use crate::error::HistError;
use crate::http::{HistoryClient, TotalsIndex};
use crate::limiter::RateLimiter;
use crate::store::ShardStore;
use crate::ui::{bounded_bar, print_command_status, with_spinner, CommandStatus};
use crate::utils::pluralize;

#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    /// Download requests per second, shared by every request of the run [default: 10]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    rate: Option<u32>,

    /// Maximum number of partitions downloading at once [default: 8]
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    workers: Option<usize>,
}

/// Partitions whose local shard does not match the totals index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub partitions: usize,
    pub pending: Vec<String>,
}

impl SyncPlan {
    pub fn already_complete(&self) -> usize {
        self.partitions - self.pending.len()
    }
}

#[derive(Debug)]
pub struct UnitOutcome {
    pub key: String,
    pub result: Result<PathBuf, HistError>,
}

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub partitions: usize,
    pub already_complete: usize,
    pub fetched: Vec<String>,
    pub failed: Vec<FailedPartition>,
}

#[derive(Debug, Serialize)]
pub struct FailedPartition {
    pub key: String,
    pub error: String,
}

impl SyncReport {
    fn record(&mut self, outcome: UnitOutcome) {
        match outcome.result {
            Ok(_) => self.fetched.push(outcome.key),
            Err(err) => self.failed.push(FailedPartition {
                key: outcome.key,
                error: err.to_string(),
            }),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub async fn run(base: BaseArgs, args: SyncArgs) -> Result<()> {
    let settings = Settings::resolve(&base);
    let rate = args.rate.unwrap_or(settings.download_rate);
    let workers = args.workers.unwrap_or(settings.workers);

    let limiter = Arc::new(RateLimiter::per_second(rate));
    let client = HistoryClient::new(&settings.api_url, limiter);
    let store = ShardStore::new(&settings.root);

    print_command_status(
        CommandStatus::Info,
        "Getting the list of all recorded partitions",
    );
    let totals = with_spinner("Fetching totals index...", client.fetch_totals())
        .await
        .context("cannot plan a sync without the totals index")?;
    store.ensure_root()?;

    let plan = plan_sync(&store, &totals);
    print_command_status(
        CommandStatus::Info,
        &format!(
            "{} of {} {} need downloading ({rate} req/s, {workers} {})",
            plan.pending.len(),
            plan.partitions,
            pluralize(&plan.partitions, "partition", None),
            pluralize(&workers, "worker", None),
        ),
    );

    let pb = bounded_bar(plan.pending.len() as u64, "Downloading", "partitions");
    let report = synchronize(&client, &store, plan, workers, &pb).await?;
    pb.finish_and_clear();

    if settings.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Sync complete");
        println!("  Root: {}", store.root().display());
        println!("  Partitions: {}", report.partitions);
        println!("  Already complete: {}", report.already_complete);
        println!("  Downloaded: {}", report.fetched.len());
        println!("  Failed: {}", report.failed.len());
    }
    if report.is_clean() {
        print_command_status(CommandStatus::Success, "COMPLETE! :D");
    } else {
        print_command_status(
            CommandStatus::Warning,
            &format!(
                "{} {} failed; rerun to retry them",
                report.failed.len(),
                pluralize(&report.failed.len(), "partition", None)
            ),
        );
    }
    Ok(())
}

/// Check every partition of the index against its local shard.
pub fn plan_sync(store: &ShardStore, totals: &TotalsIndex) -> SyncPlan {
    let pending = totals
        .iter()
        .filter(|(key, expected)| !store.is_complete(key, **expected))
        .map(|(key, _)| key.clone())
        .collect();
    SyncPlan {
        partitions: totals.len(),
        pending,
    }
}

/// Download every pending partition through a pool of at most `workers`
/// concurrent units. Each unit's failure is recorded and the run goes on.
pub async fn synchronize(
    client: &HistoryClient,
    store: &ShardStore,
    plan: SyncPlan,
    workers: usize,
    pb: &ProgressBar,
) -> Result<SyncReport> {
    let mut report = SyncReport {
        partitions: plan.partitions,
        already_complete: plan.already_complete(),
        ..SyncReport::default()
    };

    let worker_count = workers.max(1);
    let mut pending = plan.pending.into_iter();
    let mut in_flight = tokio::task::JoinSet::new();

    loop {
        while in_flight.len() < worker_count {
            let Some(key) = pending.next() else {
                break;
            };
            let client = client.clone();
            let store = store.clone();
            in_flight.spawn(async move {
                let result = fetch_partition(&client, &store, &key).await;
                UnitOutcome { key, result }
            });
        }

        let Some(joined) = in_flight.join_next().await else {
            break;
        };
        let outcome = joined.context("partition download task failed")?;
        pb.suspend(|| match &outcome.result {
            Ok(_) => print_command_status(
                CommandStatus::Success,
                &format!("Downloaded history for {}", outcome.key),
            ),
            Err(err) => print_command_status(
                CommandStatus::Error,
                &format!("Failed to download partition {}: {err}", outcome.key),
            ),
        });
        pb.inc(1);
        report.record(outcome);
    }

    Ok(report)
}

async fn fetch_partition(
    client: &HistoryClient,
    store: &ShardStore,
    key: &str,
) -> Result<PathBuf, HistError> {
    // Reject keys that cannot be stored before spending a permit on them.
    store.shard_path(key)?;
    let body = client.fetch_history(key).await?;
    store.write_raw(key, &body)
}
