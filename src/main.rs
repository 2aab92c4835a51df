//! junggo - secondhand iPhone listing collector and market analytics

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use junggo::cli::{Cli, Commands};
use junggo::config::Config;
use junggo::error::Result;

mod commands;
mod utils;

fn main() {
    let cli = Cli::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => fail(e),
    };
    init_logging(&config);

    if let Err(e) = run(cli, config) {
        fail(e);
    }
}

fn fail(e: junggo::JunggoError) -> ! {
    eprintln!("Error: {}", e);
    if let Some(hint) = e.hint() {
        eprintln!("Hint: {}", hint);
    }
    std::process::exit(1);
}

/// RUST_LOG wins over the configured level
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Crawl { query, pages, no_details, dry_run, json } => {
            commands::cmd_crawl(&config, query, pages, no_details, dry_run, json)
        }
        Commands::Ingest { file, dry_run, json } => commands::cmd_ingest(&config, &file, dry_run, json),
        Commands::Report { platform, model, from, to, json } => {
            commands::cmd_report(&config, &platform, &model, from, to, json)
        }
        Commands::Export { file } => commands::cmd_export(&file),
        Commands::Doctor => commands::cmd_doctor(&config),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
