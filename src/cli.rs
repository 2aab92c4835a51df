use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "junggo")]
#[command(author, version, about = "Collect and analyze secondhand iPhone listings", long_about = None)]
#[command(after_help = r#"Examples:
  junggo crawl                              Collect new Bunjang listings
  junggo ingest listings.jsonl              Normalize listings from any collector
  junggo report --model "iPhone 16"         Market summary for the last 30 days
  junggo export posts.csv                   Export stored posts for spreadsheets

Quick Start:
  1. junggo doctor
  2. junggo crawl --pages 2
  3. junggo report
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch listings from the Bunjang search API and store them
    #[command(after_help = r#"Examples:
  junggo crawl                       Use the [crawl] settings from config
  junggo crawl --query "아이폰 15"    Different search query
  junggo crawl --pages 1 --no-details   Quick pass without detail pages
  junggo crawl --dry-run --json      Print records instead of storing them
"#)]
    Crawl {
        /// Search query (overrides config)
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Maximum search pages (overrides config)
        #[arg(long)]
        pages: Option<u32>,

        /// Skip detail pages; use search results only
        #[arg(long)]
        no_details: bool,

        /// Normalize but do not write to the database
        #[arg(long)]
        dry_run: bool,

        /// Output records and statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize raw listings from a JSON Lines file (one listing per line)
    #[command(after_help = r#"Each line is a raw listing, for example:
  {"platform":"daangn","post_id":"88","url":"https://...","title":"아이폰 16 256GB 블랙",
   "price":"450,000원","location":"서울특별시 노원구 상계동","posted":"3일 전"}

Optional fields: description, image_url, payload (JSON), html (detail page)
"#)]
    Ingest {
        /// Input file ("-" for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Normalize but do not write to the database
        #[arg(long)]
        dry_run: bool,

        /// Output statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show market statistics for stored listings
    #[command(after_help = r#"Examples:
  junggo report                                   iPhone 16, all platforms, last 30 days
  junggo report --platform 번개장터 --model "iPhone 16 Pro"
  junggo report --from 2025-11-01 --to 2025-11-30
  junggo report --json | jq '.districts'
"#)]
    Report {
        /// Platform name (번개장터, 중고나라, 당근마켓) or "전체"
        #[arg(long, default_value = "전체")]
        platform: String,

        /// iPhone 14, iPhone 14 Pro, iPhone 15, iPhone 15 Pro, iPhone 16, iPhone 16 Pro
        #[arg(long, default_value = "iPhone 16")]
        model: String,

        /// First posting date (YYYY-MM-DD), default 30 days ago
        #[arg(long)]
        from: Option<String>,

        /// Last posting date (YYYY-MM-DD), default today
        #[arg(long)]
        to: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export stored listings as CSV
    Export {
        /// Output file ("-" for stdout)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Check configuration, database and region lookup table
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}
