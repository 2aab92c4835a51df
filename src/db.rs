use std::cell::Cell;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};

use crate::analytics::{
    ModelSelector, PlatformCount, PlatformFilter, PricePoint, QueryFilter, RegionRow, Summary,
};
use crate::config::Config;
use crate::error::Result;
use crate::listing::{CanonicalRecord, Platform};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// One stored post, flattened for export
#[derive(Debug, Clone, PartialEq)]
pub struct PostRow {
    pub platform: String,
    pub post_id: String,
    pub price: i64,
    pub url: String,
    pub model: String,
    pub title: String,
    pub storage: String,
    pub sido: String,
    pub sigungu: String,
    pub dong: String,
    pub color: String,
    pub posted_date: Option<String>,
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
    /// Bumped on every write; readers compare it to drop stale query results
    generation: Cell<u64>,
}

impl Database {
    /// Open or create the configured database
    pub fn open() -> Result<Self> {
        let db_path = Config::db_path()?;
        Self::open_at(&db_path)
    }

    /// Open or create a database file at `path`
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        embedded::migrations::runner().run(&mut conn)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn, generation: Cell::new(0) })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    fn bump_generation(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    // ========== Writes ==========

    /// Insert or update one record keyed by (platform, post_id)
    pub fn upsert_record(&self, record: &CanonicalRecord) -> Result<()> {
        self.write_record(record)?;
        self.bump_generation();
        Ok(())
    }

    /// Upsert a batch in one transaction
    pub fn upsert_records(&self, records: &[CanonicalRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            self.write_record(record)?;
        }
        tx.commit()?;
        self.bump_generation();
        tracing::debug!("Upserted {} records", records.len());
        Ok(records.len())
    }

    fn write_record(&self, record: &CanonicalRecord) -> Result<()> {
        let platform_id = self.platform_id(record.platform)?;
        let product_id = self.product_id(record)?;
        let region_id = self.region_id(record)?;

        self.conn.execute(
            "INSERT INTO posts (platform_id, post_id, product_id, region_id, title, price_krw,
             posted_date, posted_at, url, image_url, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (platform_id, post_id) DO UPDATE SET
                product_id = excluded.product_id,
                region_id = excluded.region_id,
                title = excluded.title,
                price_krw = excluded.price_krw,
                posted_date = excluded.posted_date,
                posted_at = excluded.posted_at,
                url = excluded.url,
                image_url = excluded.image_url,
                scraped_at = excluded.scraped_at",
            params![
                platform_id,
                record.post_id,
                product_id,
                region_id,
                record.title,
                i64::try_from(record.price).unwrap_or(i64::MAX),
                record.posted_at.as_ref().map(|p| p.date_string()),
                record.posted_at.as_ref().map(|p| p.iso_string()),
                record.url,
                record.image_url,
                record.scraped_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn platform_id(&self, platform: Platform) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO platforms (name) VALUES (?1)",
            params![platform.name()],
        )?;
        let id = self.conn.query_row(
            "SELECT platform_id FROM platforms WHERE name = ?1",
            params![platform.name()],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn product_id(&self, record: &CanonicalRecord) -> Result<i64> {
        let color = record.color.map(|c| c.as_str()).unwrap_or("");
        self.conn.execute(
            "INSERT OR IGNORE INTO products (model, storage, storage_gb, color) VALUES (?1, ?2, ?3, ?4)",
            params![record.product_model, record.storage.label(), record.storage.gb(), color],
        )?;
        let id = self.conn.query_row(
            "SELECT product_id FROM products WHERE model = ?1 AND storage = ?2 AND color = ?3",
            params![record.product_model, record.storage.label(), color],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Region row for the record, or None when nothing is known
    fn region_id(&self, record: &CanonicalRecord) -> Result<Option<i64>> {
        let region = &record.region;
        if region.is_empty() {
            return Ok(None);
        }
        let sido = region.sido.as_deref().unwrap_or("");
        let sigungu = region.sigungu.as_deref().unwrap_or("");
        let dong = region.dong.as_deref().unwrap_or("");
        self.conn.execute(
            "INSERT OR IGNORE INTO regions (sido, sigungu, dong) VALUES (?1, ?2, ?3)",
            params![sido, sigungu, dong],
        )?;
        let id = self.conn.query_row(
            "SELECT region_id FROM regions WHERE sido = ?1 AND sigungu = ?2 AND dong = ?3",
            params![sido, sigungu, dong],
            |row| row.get(0),
        )?;
        Ok(Some(id))
    }

    // ========== Reads ==========

    pub fn count_posts(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Every stored post, newest first
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT pf.name, p.post_id, p.price_krw, p.url, pr.model, p.title, pr.storage,
                    COALESCE(r.sido, ''), COALESCE(r.sigungu, ''), COALESCE(r.dong, ''),
                    pr.color, p.posted_date
             FROM posts AS p
             JOIN platforms AS pf ON p.platform_id = pf.platform_id
             JOIN products AS pr ON p.product_id = pr.product_id
             LEFT JOIN regions AS r ON p.region_id = r.region_id
             ORDER BY p.posted_date DESC, p.scraped_at DESC, p.post_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PostRow {
                    platform: row.get(0)?,
                    post_id: row.get(1)?,
                    price: row.get(2)?,
                    url: row.get(3)?,
                    model: row.get(4)?,
                    title: row.get(5)?,
                    storage: row.get(6)?,
                    sido: row.get(7)?,
                    sigungu: row.get(8)?,
                    dong: row.get(9)?,
                    color: row.get(10)?,
                    posted_date: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ========== Aggregation queries ==========

    /// Count and average of known prices
    pub fn summary(&self, filter: &QueryFilter) -> Result<Summary> {
        let (clause, values) = where_clause(filter, true);
        let sql = format!(
            "SELECT COUNT(*), AVG(NULLIF(p.price_krw, 0)) {} {}",
            POSTS_FROM, clause
        );
        let (count, avg_price) = self.conn.query_row(&sql, params_from_iter(values), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<f64>>(1)?))
        })?;
        Ok(Summary { count: count as usize, avg_price })
    }

    /// District and neighborhood of every matching post
    pub fn region_rows(&self, filter: &QueryFilter) -> Result<Vec<RegionRow>> {
        let (clause, values) = where_clause(filter, true);
        let sql = format!(
            "SELECT COALESCE(r.sigungu, ''), COALESCE(r.dong, '') {} {}",
            POSTS_FROM, clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(RegionRow { sigungu: row.get(0)?, dong: row.get(1)? })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Posts per platform. The platform selector is ignored so the result
    /// always shows every platform's share.
    pub fn platform_counts(&self, filter: &QueryFilter) -> Result<Vec<PlatformCount>> {
        let (clause, values) = where_clause(filter, false);
        let sql = format!(
            "SELECT pf.name, COUNT(*) AS count {} {} GROUP BY pf.name ORDER BY count DESC, pf.name",
            POSTS_FROM, clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(PlatformCount { platform: row.get(0)?, count: row.get::<_, i64>(1)? as usize })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Average known price per posting date, oldest first
    pub fn price_trend(&self, filter: &QueryFilter) -> Result<Vec<PricePoint>> {
        let (clause, values) = where_clause(filter, true);
        let sql = format!(
            "SELECT p.posted_date, AVG(NULLIF(p.price_krw, 0)) {} {}
             GROUP BY p.posted_date ORDER BY p.posted_date ASC",
            POSTS_FROM, clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let points = rows
            .into_iter()
            .filter_map(|(date, avg)| {
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
                Some(PricePoint { date, avg_price: avg? })
            })
            .collect();
        Ok(points)
    }
}

const POSTS_FROM: &str = "FROM posts AS p
     JOIN platforms AS pf ON p.platform_id = pf.platform_id
     JOIN products AS pr ON p.product_id = pr.product_id
     LEFT JOIN regions AS r ON p.region_id = r.region_id";

/// WHERE clause and bound values for a query filter
fn where_clause(filter: &QueryFilter, with_platform: bool) -> (String, Vec<SqlValue>) {
    let mut clause = String::from("WHERE p.posted_date BETWEEN ? AND ?");
    let mut values = vec![
        SqlValue::Text(filter.from.format("%Y-%m-%d").to_string()),
        SqlValue::Text(filter.to.format("%Y-%m-%d").to_string()),
    ];

    if let (true, PlatformFilter::Only(platform)) = (with_platform, filter.platform) {
        clause.push_str(" AND pf.name = ?");
        values.push(SqlValue::Text(platform.name().to_string()));
    }

    let ModelSelector { generation, pro } = filter.model;
    clause.push_str(" AND (pr.model LIKE ? OR pr.model LIKE ?)");
    if pro {
        values.push(SqlValue::Text(format!("%iPhone {} Pro%", generation)));
        values.push(SqlValue::Text(format!("%아이폰 {} 프로%", generation)));
    } else {
        values.push(SqlValue::Text(format!("%iPhone {}%", generation)));
        values.push(SqlValue::Text(format!("%아이폰 {}%", generation)));
        clause.push_str(" AND pr.model NOT LIKE '%Pro%' AND pr.model NOT LIKE '%프로%'");
    }
    (clause, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::date::{self, kst};
    use crate::extract::{Color, Region, Storage};
    use chrono::TimeZone;

    fn record(platform: Platform, post_id: &str, price: u64, day: &str) -> CanonicalRecord {
        let now = kst().with_ymd_and_hms(2025, 11, 9, 12, 0, 0).unwrap();
        CanonicalRecord {
            platform,
            post_id: post_id.to_string(),
            product_model: "iPhone 16".to_string(),
            title: "iPhone 16 256GB 블랙".to_string(),
            storage: Storage::from_gb(256),
            color: Color::parse("블랙"),
            price,
            region: Region::new("서울특별시", "노원구", "상계동"),
            posted_at: date::parse(day, now),
            url: format!("https://m.bunjang.co.kr/products/{}", post_id),
            image_url: None,
            scraped_at: now,
        }
    }

    fn filter() -> QueryFilter {
        QueryFilter {
            platform: PlatformFilter::All,
            model: ModelSelector::new(16, false),
            from: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
        }
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let r = record(Platform::Bunjang, "1", 450_000, "2025-11-05");
        db.upsert_record(&r).unwrap();
        db.upsert_record(&r).unwrap();
        assert_eq!(db.count_posts().unwrap(), 1);

        let mut changed = r.clone();
        changed.price = 430_000;
        db.upsert_record(&changed).unwrap();
        let rows = db.list_posts().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, 430_000);
        assert_eq!(rows[0].sigungu, "노원구");
    }

    #[test]
    fn test_same_id_on_other_platform_is_distinct() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_records(&[
            record(Platform::Bunjang, "1", 450_000, "2025-11-05"),
            record(Platform::Joongna, "1", 450_000, "2025-11-05"),
        ])
        .unwrap();
        assert_eq!(db.count_posts().unwrap(), 2);
    }

    #[test]
    fn test_generation_changes_on_write() {
        let db = Database::open_in_memory().unwrap();
        let before = db.generation();
        db.upsert_record(&record(Platform::Bunjang, "1", 450_000, "2025-11-05")).unwrap();
        assert!(db.generation() > before);
        let after = db.generation();
        db.upsert_records(&[]).unwrap();
        assert_eq!(db.generation(), after);
    }

    #[test]
    fn test_summary_ignores_unknown_prices() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_records(&[
            record(Platform::Bunjang, "1", 400_000, "2025-11-05"),
            record(Platform::Bunjang, "2", 0, "2025-11-05"),
            record(Platform::Bunjang, "3", 500_000, "2025-11-06"),
        ])
        .unwrap();
        let summary = db.summary(&filter()).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.avg_price, Some(450_000.0));
    }

    #[test]
    fn test_filters() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_records(&[
            record(Platform::Bunjang, "1", 400_000, "2025-11-05"),
            record(Platform::Daangn, "2", 420_000, "2025-11-05"),
            record(Platform::Bunjang, "3", 500_000, "2025-10-20"),
        ])
        .unwrap();

        let only_bunjang = QueryFilter { platform: PlatformFilter::Only(Platform::Bunjang), ..filter() };
        assert_eq!(db.summary(&only_bunjang).unwrap().count, 1);
        // platform breakdown ignores the platform selector
        assert_eq!(db.platform_counts(&only_bunjang).unwrap().len(), 2);

        let pro = QueryFilter { model: ModelSelector::new(16, true), ..filter() };
        assert_eq!(db.summary(&pro).unwrap().count, 0);
    }

    #[test]
    fn test_price_trend_sorted_by_date() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_records(&[
            record(Platform::Bunjang, "1", 400_000, "2025-11-07"),
            record(Platform::Bunjang, "2", 500_000, "2025-11-05"),
            record(Platform::Bunjang, "3", 300_000, "2025-11-05"),
        ])
        .unwrap();
        let trend = db.price_trend(&filter()).unwrap();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2025, 11, 5).unwrap());
        assert_eq!(trend[0].avg_price, 400_000.0);
    }
}
