//! Collection commands: crawl, ingest

use std::path::Path;

use chrono::Utc;
use colored::Colorize;
use serde_json::json;

use junggo::config::Config;
use junggo::db::Database;
use junggo::error::Result;
use junggo::extract::date::kst;
use junggo::fetch::Fetcher;
use junggo::listing::RawListing;
use junggo::pipeline::{Batch, Normalizer};

use crate::utils::read_input;

/// Crawl Bunjang search results, normalize and store them
pub fn cmd_crawl(
    config: &Config,
    query: Option<String>,
    pages: Option<u32>,
    no_details: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let mut crawl = config.crawl.clone();
    if let Some(query) = query {
        crawl.query = query;
    }
    if let Some(pages) = pages {
        crawl.max_pages = pages;
    }
    if no_details {
        crawl.fetch_details = false;
    }

    let pipeline = config.pipeline();
    let normalizer = Normalizer::new(&pipeline, Utc::now().with_timezone(&kst()))?;
    let fetcher = Fetcher::new(&crawl);

    if !json {
        println!("\n  Searching Bunjang for \"{}\"...", crawl.query);
    }
    let mut listings = fetcher.collect();
    if !json {
        println!("  Found {} listings.", listings.len());
    }

    if crawl.fetch_details && !listings.is_empty() {
        // only listings that pass the title check are worth a page fetch
        let fetched = fetcher.enrich(&mut listings, |l| normalizer.screen(l).is_ok());
        if !json {
            println!("  Fetched {} detail pages.", fetched);
        }
    }

    let batch = normalizer.run(listings);
    finish(batch, dry_run, json)
}

/// Normalize raw listings from a JSON Lines file
pub fn cmd_ingest(config: &Config, file: &Path, dry_run: bool, json: bool) -> Result<()> {
    let input = read_input(file)?;

    let mut listings = Vec::new();
    let mut unreadable = 0;
    for (n, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawListing>(line) {
            Ok(listing) => listings.push(listing),
            Err(e) => {
                tracing::warn!("Line {}: not a listing: {}", n + 1, e);
                unreadable += 1;
            }
        }
    }

    let pipeline = config.pipeline();
    let normalizer = Normalizer::new(&pipeline, Utc::now().with_timezone(&kst()))?;
    let mut batch = normalizer.run(listings);
    batch.stats.seen += unreadable;
    batch.stats.failed += unreadable;
    finish(batch, dry_run, json)
}

fn finish(batch: Batch, dry_run: bool, json: bool) -> Result<()> {
    let stored = if dry_run {
        0
    } else {
        let db = Database::open()?;
        db.upsert_records(&batch.records)?
    };

    if json {
        let output = if dry_run {
            json!({ "stats": batch.stats, "records": batch.records })
        } else {
            json!({ "stats": batch.stats, "stored": stored })
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let stats = &batch.stats;
    println!();
    println!("  Seen:      {}", stats.seen);
    println!("  Accepted:  {}", stats.accepted.to_string().green());
    println!("  Rejected:  {}", stats.rejected_total());
    for (rejection, count) in &stats.rejected {
        println!("    {:<22} {}", rejection.describe(), count);
    }
    if stats.failed > 0 {
        println!("  Failed:    {}", stats.failed.to_string().yellow());
    }

    if dry_run {
        println!("\n  Dry run; nothing stored.");
        for record in &batch.records {
            println!(
                "    {} {} {} {}",
                record.post_id.dimmed(),
                record.title,
                record.price,
                record.region_id()
            );
        }
    } else {
        println!("\n  Stored {} records.", stored);
    }
    println!();
    Ok(())
}
