use chainwatch::cmd::{CronCheckArgs, DryRunArgs, dry_run};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluates a single trigger against one block and prints the matches.
    DryRun(DryRunArgs),
    /// Reports whether a cron trigger is due.
    CronCheck(CronCheckArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::DryRun(args) => dry_run::execute(args).await?,
        Commands::CronCheck(args) => dry_run::cron_check(args)?,
    }

    Ok(())
}
