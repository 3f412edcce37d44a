use clap::{Parser, Subcommand};
use anyhow::Result;
use dotenvy::dotenv;

mod output;
mod telemetry;
mod store;
mod sources;
mod sync;

#[derive(Parser)]
#[command(name = "subsync", about = "Merge video source subscriptions into config.json")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Sync(sync::SyncCmd),
    Ls(sources::LsCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // logs go to stderr. Respect RUST_LOG and SUBSYNC_LOG_FORMAT
    telemetry::config::init_tracing();

    match cli.command.unwrap_or_else(|| Commands::Sync(sync::SyncCmd::default())) {
        Commands::Sync(args) => sync::run(args).await?,
        Commands::Ls(args) => sources::run(args).await?,
    }

    Ok(())
}
