use clap::{Parser, Subcommand};
use anyhow::Result;
use dotenvy::dotenv;

mod config;
mod convert;
mod document;
mod enrich;
mod error;
mod inspect;
mod migrate;
mod normalize;
mod telemetry;
mod wp;

#[derive(Parser)]
#[command(name = "wpm", about = "WordPress to headless-CMS content migration")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Migrate(migrate::MigrateCmd),
    Inspect(inspect::InspectCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and WPM_LOG_FORMAT
    telemetry::config::init_tracing();

    match cli.command {
        Commands::Migrate(args) => migrate::run(args).await?,
        Commands::Inspect(args) => inspect::run(args).await?,
    }

    Ok(())
}
