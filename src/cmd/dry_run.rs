//! `dry-run` evaluates one trigger file against one block; `cron-check`
//! reports whether a cron trigger is due.

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::json;
use thiserror::Error;

use crate::{
    config::AppConfig,
    engine::{
        ContractMatchError, ContractMatcher, CronError, CronScheduler, EventMatcher,
        TransactionMatcher,
    },
    models::{BlockData, Match, RuleConfigurationError, Trigger, TriggerType},
    providers::{
        ChainClient, DataSourceError, EvmRpcClient, PriceSource, PriceTable, ProviderError,
        create_provider,
    },
};

/// Errors that end a dry run.
#[derive(Error, Debug)]
pub enum DryRunError {
    /// The trigger file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The application configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    /// The trigger file is not a valid trigger.
    #[error("Trigger error: {0}")]
    Rule(#[from] RuleConfigurationError),
    /// The RPC provider could not be created.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    /// Block data could not be fetched.
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),
    /// The contract call could not be evaluated.
    #[error("Contract call error: {0}")]
    Contract(#[from] ContractMatchError),
    /// The cron schedule could not be evaluated.
    #[error("Cron error: {0}")]
    Cron(#[from] CronError),
    /// The report could not be serialized.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Arguments of `dry-run`.
#[derive(Parser, Debug)]
pub struct DryRunArgs {
    /// Path to the trigger JSON file.
    #[arg(short, long)]
    trigger: PathBuf,
    /// The block to evaluate the trigger against.
    #[arg(short, long)]
    block: u64,
    /// Directory holding `app.yaml`. Defaults to `configs`.
    #[arg(short, long)]
    config_dir: Option<String>,
}

/// Arguments of `cron-check`.
#[derive(Parser, Debug)]
pub struct CronCheckArgs {
    /// Path to the trigger JSON file.
    #[arg(short, long)]
    trigger: PathBuf,
    /// The instant to check at, RFC 3339. Defaults to the current time.
    #[arg(short, long)]
    now: Option<DateTime<Utc>>,
}

fn load_trigger(path: &PathBuf) -> Result<Trigger, DryRunError> {
    let document = std::fs::read_to_string(path)?;
    Ok(Trigger::from_json(&document)?)
}

/// Runs `dry-run` and prints every match as JSON.
pub async fn execute(args: DryRunArgs) -> Result<(), DryRunError> {
    let config = AppConfig::new(args.config_dir.as_deref())?;
    let trigger = load_trigger(&args.trigger)?;
    tracing::info!(trigger = %trigger.trigger_name, block_number = args.block, "Starting dry run.");

    let request_timeout = config.rpc.request_timeout_ms;
    let provider = create_provider(config.rpc_urls.clone(), config.rpc.clone())?;
    let client: Arc<dyn ChainClient> = Arc::new(EvmRpcClient::new(provider, request_timeout));
    let prices: Arc<dyn PriceSource> = Arc::new(PriceTable::new(&config.token_prices));

    let matches = evaluate(&trigger, args.block, client, prices, &config).await?;
    tracing::info!(matches = matches.len(), "Dry run finished.");

    let report =
        matches.iter().map(Match::to_persistable).collect::<Result<Vec<_>, serde_json::Error>>()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Evaluates `trigger` against `block_number` with the matcher for its type.
pub async fn evaluate(
    trigger: &Trigger,
    block_number: u64,
    client: Arc<dyn ChainClient>,
    prices: Arc<dyn PriceSource>,
    config: &AppConfig,
) -> Result<Vec<Match>, DryRunError> {
    let matches = match trigger.trigger_type {
        TriggerType::WatchTransactions => {
            let block = fetch_block(client.as_ref(), block_number).await?;
            TransactionMatcher::new(prices).match_transactions(trigger, &block).await
        }
        TriggerType::WatchEvents => {
            let block = fetch_block(client.as_ref(), block_number).await?;
            EventMatcher::new(prices, config.erc20_tokens.iter().copied())
                .match_block(trigger, &block)
                .await
        }
        TriggerType::WatchContracts | TriggerType::CronTrigger => {
            let matcher = ContractMatcher::new(client, prices, config.multicall.clone());
            let outcome = matcher.match_contract(trigger, block_number).await?;
            tracing::info!(
                matched = outcome.matched,
                values = ?outcome.all_values,
                "Contract call evaluated."
            );
            if outcome.matched {
                vec![matcher.into_match(trigger, block_number, outcome)?]
            } else {
                Vec::new()
            }
        }
    };
    Ok(matches)
}

async fn fetch_block(client: &dyn ChainClient, block_number: u64) -> Result<BlockData, DataSourceError> {
    let (block, logs) =
        tokio::try_join!(client.block_by_number(block_number), client.logs(block_number))?;
    Ok(BlockData::from_parts(block, logs))
}

/// Runs `cron-check` and prints the decision as JSON.
pub fn cron_check(args: CronCheckArgs) -> Result<(), DryRunError> {
    let trigger = load_trigger(&args.trigger)?;
    let now = args.now.unwrap_or_else(Utc::now);
    let report = cron_report(&trigger, now)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cron_report(trigger: &Trigger, now: DateTime<Utc>) -> Result<serde_json::Value, DryRunError> {
    let job = trigger.cron_job.as_ref().ok_or(CronError::MissingCronJob)?;
    let due = CronScheduler::is_due(trigger, now)?;
    let next = job.schedule.next_after(trigger.last_fired.unwrap_or(now));
    Ok(json!({
        "trigger": trigger.trigger_name,
        "rule": job.rule,
        "timezone": job.timezone,
        "last_fired": trigger.last_fired,
        "now": now,
        "due": due,
        "next": next,
    }))
}
