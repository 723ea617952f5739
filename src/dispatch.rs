use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use indicatif::ProgressBar;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::json;

use crate::args::BaseArgs;
use crate::config::Settings;
use crate::error::HistError;
use crate::limiter::RateLimiter;
use crate::store::{MergedRecords, ShardStore};
use crate::ui::{bounded_bar, header, print_command_status, styled_table, CommandStatus};
use crate::utils::pluralize;

const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Args)]
pub struct DispatchArgs {
    /// Destination URL that receives one JSON POST per record
    #[arg(value_parser = parse_destination)]
    url: Url,

    /// Requests per second [default: 1]
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    rate: Option<u32>,

    /// Timeout for each POST, in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,
}

fn parse_destination(value: &str) -> Result<Url> {
    let url = Url::parse(value).with_context(|| format!("{value:?} is not a valid url"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("destination must be an http(s) url, got {}", url.scheme());
    }
    Ok(url)
}

/// Occurrences of each HTTP status returned by the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResponseTally {
    counts: BTreeMap<u16, usize>,
}

impl ResponseTally {
    pub fn record(&mut self, status: StatusCode) {
        *self.counts.entry(status.as_u16()).or_default() += 1;
    }

    #[cfg(test)]
    pub fn get(&self, status: u16) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn render(&self) -> Table {
        let mut table = styled_table();
        table.set_header(vec![header("Response Code"), header("Count")]);
        for (status, count) in &self.counts {
            table.add_row(vec![Cell::new(status), Cell::new(count)]);
        }
        table.add_row(vec![header("Total"), header(&self.total().to_string())]);
        table
    }
}

#[derive(Debug, Serialize)]
pub struct FailedRecord {
    pub id: i32,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct DispatchReport {
    pub records: usize,
    pub responses: ResponseTally,
    pub failed: Vec<FailedRecord>,
}

/// Replays merged records to the destination one at a time, each POST gated
/// by the limiter.
pub struct Dispatcher {
    client: Client,
    destination: Url,
    limiter: RateLimiter,
}

impl Dispatcher {
    pub fn new(destination: Url, rate: u32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            destination,
            limiter: RateLimiter::per_second(rate),
        })
    }

    pub async fn dispatch_all(
        &self,
        records: &MergedRecords,
        pb: &ProgressBar,
    ) -> DispatchReport {
        let mut report = DispatchReport {
            records: records.len(),
            responses: ResponseTally::default(),
            failed: Vec::new(),
        };

        for (&id, hash) in records {
            self.limiter.acquire().await;
            match self.post_record(id, hash).await {
                Ok(status) => report.responses.record(status),
                Err(err) => {
                    pb.suspend(|| print_command_status(CommandStatus::Error, &err.to_string()));
                    report.failed.push(FailedRecord {
                        id,
                        error: err.to_string(),
                    });
                }
            }
            pb.inc(1);
        }

        report
    }

    async fn post_record(&self, id: i32, hash: &str) -> Result<StatusCode, HistError> {
        let response = self
            .client
            .post(self.destination.clone())
            .json(&json!({ "id": id, "hash": hash }))
            .send()
            .await
            .map_err(|err| HistError::Dispatch {
                id,
                cause: err.to_string(),
            })?;
        Ok(response.status())
    }
}

pub async fn run(base: BaseArgs, args: DispatchArgs) -> Result<()> {
    let settings = Settings::resolve(&base);
    let rate = args.rate.unwrap_or(settings.dispatch_rate);
    let store = ShardStore::new(&settings.root);

    let records = store
        .load_merged()
        .with_context(|| format!("cannot dispatch from {}", store.root().display()))?;
    print_command_status(
        CommandStatus::Info,
        &format!(
            "Dispatching {} {} to {} at {rate} req/s",
            records.len(),
            pluralize(&records.len(), "record", None),
            args.url
        ),
    );

    let dispatcher = Dispatcher::new(args.url, rate, Duration::from_secs(args.timeout_secs))?;
    let pb = bounded_bar(records.len() as u64, "Dispatching", "records");
    let report = dispatcher.dispatch_all(&records, &pb).await;
    pb.finish_and_clear();

    if settings.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.responses.render());
    }
    if !report.failed.is_empty() {
        print_command_status(
            CommandStatus::Warning,
            &format!(
                "{} {} never got a response",
                report.failed.len(),
                pluralize(&report.failed.len(), "record", None)
            ),
        );
    }
    Ok(())
}
