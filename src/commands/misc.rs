//! Miscellaneous commands: doctor, completions

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;

use junggo::cli::{Cli, CompletionShell};
use junggo::config::Config;
use junggo::db::Database;
use junggo::error::Result;
use junggo::region_map::RegionMap;

/// Check configuration, database and region lookup table
pub fn cmd_doctor(config: &Config) -> Result<()> {
    println!("\njunggo doctor\n");

    println!("  junggo binary: v{}", env!("CARGO_PKG_VERSION"));

    match Config::config_path() {
        Ok(path) if path.exists() => println!("  Config: {}", path.display()),
        Ok(path) => println!("  Config: {} (not found, using defaults)", path.display()),
        Err(e) => println!("  Config: ERROR - {}", e),
    }
    println!(
        "  Pipeline: iPhone {}, min price {}원, delivery-only {}, no-region {}",
        config.target_generation,
        config.min_price,
        if config.exclude_delivery_only { "excluded" } else { "kept" },
        if config.exclude_no_region { "excluded" } else { "kept" },
    );

    match Config::db_path() {
        Ok(path) => println!("  Database path: {}", path.display()),
        Err(e) => println!("  Database path: ERROR - {}", e),
    }
    match Database::open().and_then(|db| db.count_posts()) {
        Ok(count) => println!("  Database: OK ({} listings)", count),
        Err(e) => println!("  Database: {} - {}", "ERROR".red(), e),
    }

    match config.region_map_path() {
        Ok(path) => match RegionMap::load(&path) {
            Ok(map) if map.is_empty() => println!(
                "  Region table: {} ({})",
                "empty, every district shows as unmapped".yellow(),
                path.display()
            ),
            Ok(map) => println!("  Region table: {} entries ({})", map.len(), path.display()),
            Err(e) => println!("  Region table: {} - {}", "ERROR".red(), e),
        },
        Err(e) => println!("  Region table: ERROR - {}", e),
    }

    println!();
    Ok(())
}

/// Generate shell completions
pub fn cmd_completions(shell: CompletionShell) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = match shell {
        CompletionShell::Bash => Shell::Bash,
        CompletionShell::Zsh => Shell::Zsh,
        CompletionShell::Fish => Shell::Fish,
        CompletionShell::Powershell => Shell::PowerShell,
    };
    generate(shell, &mut cmd, "junggo", &mut io::stdout());
    Ok(())
}
