//! Reporting commands: report, export

use std::io::Write;
use std::path::Path;

use chrono::{Duration, Utc};
use colored::Colorize;

use junggo::analytics::{Dashboard, ModelSelector, PlatformFilter, QueryFilter};
use junggo::config::Config;
use junggo::db::Database;
use junggo::error::{JunggoError, Result};
use junggo::export::write_csv;
use junggo::extract::date::kst;
use junggo::region_map::{RegionMap, UNMAPPED};

use crate::utils::{format_krw, parse_date_arg, truncate_str};

/// Days covered when no range is given
const DEFAULT_RANGE_DAYS: i64 = 30;

/// Market statistics for stored listings
pub fn cmd_report(
    config: &Config,
    platform: &str,
    model: &str,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> Result<()> {
    let platform = PlatformFilter::parse(platform).ok_or_else(|| {
        JunggoError::QueryError(format!("Unknown platform '{}'", platform))
    })?;
    let model = ModelSelector::parse(model)
        .ok_or_else(|| JunggoError::QueryError(format!("Unsupported model '{}'", model)))?;

    let today = Utc::now().with_timezone(&kst()).date_naive();
    let to = match to {
        Some(s) => parse_date_arg(&s)?,
        None => today,
    };
    let from = match from {
        Some(s) => parse_date_arg(&s)?,
        None => to - Duration::days(DEFAULT_RANGE_DAYS - 1),
    };
    let filter = QueryFilter::new(platform, model, from, to)?;

    let mut warnings = Vec::new();
    let map = match config.region_map_path() {
        Ok(path) => {
            let (map, problem) = RegionMap::load_or_empty(&path);
            warnings.extend(problem);
            map
        }
        Err(e) => {
            warnings.push(format!("region lookup table: {}", e));
            RegionMap::default()
        }
    };

    let mut dashboard = match Database::open() {
        Ok(db) => Dashboard::build(&db, &map, &filter),
        Err(e) => {
            tracing::warn!("Database unavailable: {}", e);
            Dashboard::unavailable(format!("database: {}", e))
        }
    };
    dashboard.warnings.extend(warnings);

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    print_dashboard(&filter, &dashboard, map.is_empty());
    Ok(())
}

fn print_dashboard(filter: &QueryFilter, dashboard: &Dashboard, map_empty: bool) {
    println!(
        "\n  {} | {} | {} ~ {}\n",
        filter.model.to_string().bold(),
        filter.platform,
        filter.from,
        filter.to
    );

    let summary = &dashboard.summary;
    println!("  Listings:         {}", summary.count.to_string().bold());
    match summary.avg_price {
        Some(avg) => println!("  Average price:    {}", format_krw(avg).bold()),
        None => println!("  Average price:    {}", "-".dimmed()),
    }
    match &dashboard.top_district {
        Some(district) => println!("  Top district:     {}", district),
        None => println!("  Top district:     {}", "-".dimmed()),
    }

    if !dashboard.districts.is_empty() {
        println!("\n  {}", "By district".bold());
        for row in &dashboard.districts {
            let name = if row.district == UNMAPPED {
                row.district.yellow().to_string()
            } else {
                row.district.clone()
            };
            println!("    {:<16} {:>5}", name, row.count);
        }
    }

    if !dashboard.unmapped.is_empty() {
        println!(
            "\n  {} ({} listings)",
            "Unmapped neighborhoods".bold(),
            dashboard.unmapped_count()
        );
        for row in &dashboard.unmapped {
            println!("    {:<16} {:>5}", truncate_str(&row.dong, 16), row.count);
        }
        if map_empty {
            println!("    {}", "Region lookup table is empty; see `junggo doctor`".yellow());
        }
    }

    if !dashboard.platforms.is_empty() {
        println!("\n  {}", "By platform (all platforms)".bold());
        for row in &dashboard.platforms {
            println!("    {:<16} {:>5}", row.platform, row.count);
        }
    }

    if !dashboard.trend.is_empty() {
        println!("\n  {}", "Average price by posting date".bold());
        for point in &dashboard.trend {
            println!("    {}  {:>12}", point.date, format_krw(point.avg_price));
        }
    }

    for warning in &dashboard.warnings {
        println!("\n  {} {}", "Warning:".yellow(), warning);
    }
    println!();
}

/// Export stored listings as CSV
pub fn cmd_export(file: &Path) -> Result<()> {
    let db = Database::open()?;
    let rows = db.list_posts()?;

    if file == Path::new("-") {
        let stdout = std::io::stdout();
        write_csv(stdout.lock(), &rows)?;
        return Ok(());
    }

    let out = std::fs::File::create(file)?;
    let mut out = std::io::BufWriter::new(out);
    write_csv(&mut out, &rows)?;
    out.flush()?;
    eprintln!("  Exported {} listings to {}", rows.len(), file.display());
    Ok(())
}
