use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::info;

use crate::record::{CanonicalRecord, Category, Dimension};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS category_registrations (
            id            INTEGER PRIMARY KEY,
            date          TEXT NOT NULL,
            year          INTEGER NOT NULL,
            month         INTEGER NOT NULL,
            quarter       INTEGER NOT NULL CHECK(quarter BETWEEN 1 AND 4),
            category      TEXT NOT NULL,
            registrations INTEGER NOT NULL CHECK(registrations >= 0),
            region        TEXT NOT NULL DEFAULT 'All India',
            updated_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(date, category, region)
        );
        CREATE INDEX IF NOT EXISTS idx_cat_date ON category_registrations(date);
        CREATE INDEX IF NOT EXISTS idx_cat_category ON category_registrations(category);
        CREATE INDEX IF NOT EXISTS idx_cat_year_quarter ON category_registrations(year, quarter);

        CREATE TABLE IF NOT EXISTS manufacturer_registrations (
            id            INTEGER PRIMARY KEY,
            date          TEXT NOT NULL,
            year          INTEGER NOT NULL,
            month         INTEGER NOT NULL,
            quarter       INTEGER NOT NULL CHECK(quarter BETWEEN 1 AND 4),
            manufacturer  TEXT NOT NULL,
            category      TEXT NOT NULL,
            registrations INTEGER NOT NULL CHECK(registrations >= 0),
            region        TEXT NOT NULL DEFAULT 'All India',
            updated_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(date, manufacturer, category, region)
        );
        CREATE INDEX IF NOT EXISTS idx_mfr_date ON manufacturer_registrations(date);
        CREATE INDEX IF NOT EXISTS idx_mfr_name ON manufacturer_registrations(manufacturer);
        CREATE INDEX IF NOT EXISTS idx_mfr_category ON manufacturer_registrations(category);
        CREATE INDEX IF NOT EXISTS idx_mfr_year_quarter ON manufacturer_registrations(year, quarter);
        ",
    )?;
    Ok(())
}

// ── Writes ──

/// Insert or overwrite each record under its identity key. Aggregate and
/// manufacturer records go to their own tables; the whole batch is one
/// transaction. Returns the number of rows written.
pub fn upsert_records(conn: &Connection, records: &[CanonicalRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut cat_stmt = tx.prepare(
            "INSERT INTO category_registrations
             (date, year, month, quarter, category, registrations, region)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(date, category, region) DO UPDATE SET
                registrations = excluded.registrations,
                updated_at = datetime('now')",
        )?;
        let mut mfr_stmt = tx.prepare(
            "INSERT INTO manufacturer_registrations
             (date, year, month, quarter, manufacturer, category, registrations, region)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(date, manufacturer, category, region) DO UPDATE SET
                registrations = excluded.registrations,
                updated_at = datetime('now')",
        )?;

        for r in records {
            let registrations = i64::try_from(r.registrations)
                .with_context(|| format!("registration count {} out of range", r.registrations))?;
            count += match &r.manufacturer {
                None => cat_stmt.execute(rusqlite::params![
                    r.date, r.year(), r.month(), r.quarter(), r.category.as_str(),
                    registrations, r.region,
                ])?,
                Some(m) => mfr_stmt.execute(rusqlite::params![
                    r.date, r.year(), r.month(), r.quarter(), m, r.category.as_str(),
                    registrations, r.region,
                ])?,
            };
        }
    }
    tx.commit()?;
    info!("Upserted {} registration records", count);
    Ok(count)
}

// ── Reads ──

/// Optional filters applied by storage before analytics see the data.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub category: Option<Category>,
    /// Only consulted for the manufacturer dimension; empty means all.
    pub manufacturers: Vec<String>,
}

/// Records for one dimension, newest first.
pub fn fetch_records(
    conn: &Connection,
    dim: Dimension,
    filter: &RecordFilter,
) -> Result<Vec<CanonicalRecord>> {
    let (table, maker_col) = match dim {
        Dimension::Category => ("category_registrations", "NULL"),
        Dimension::Manufacturer => ("manufacturer_registrations", "manufacturer"),
    };

    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(start) = filter.start {
        conditions.push(format!("date >= ?{}", params.len() + 1));
        params.push(Box::new(start));
    }
    if let Some(end) = filter.end {
        conditions.push(format!("date <= ?{}", params.len() + 1));
        params.push(Box::new(end));
    }
    if let Some(c) = &filter.category {
        conditions.push(format!("category = ?{}", params.len() + 1));
        params.push(Box::new(c.as_str().to_string()));
    }
    if dim == Dimension::Manufacturer && !filter.manufacturers.is_empty() {
        let placeholders: Vec<String> = filter
            .manufacturers
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", params.len() + i + 1))
            .collect();
        conditions.push(format!("manufacturer IN ({})", placeholders.join(",")));
        for m in &filter.manufacturers {
            params.push(Box::new(m.clone()));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT date, category, {}, registrations, region
         FROM {}{}
         ORDER BY date DESC, id",
        maker_col, table, where_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            let category: String = row.get(1)?;
            let registrations: i64 = row.get(3)?;
            Ok(CanonicalRecord {
                date: row.get(0)?,
                category: Category::from_canonical(&category),
                manufacturer: row.get(2)?,
                registrations: u64::try_from(registrations)
                    .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(3, registrations))?,
                region: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_manufacturers(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT manufacturer FROM manufacturer_registrations ORDER BY manufacturer",
    )?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub category_rows: usize,
    pub manufacturer_rows: usize,
    pub manufacturers: usize,
    pub latest_date: Option<NaiveDate>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let category_rows: usize =
        conn.query_row("SELECT COUNT(*) FROM category_registrations", [], |r| r.get(0))?;
    let manufacturer_rows: usize =
        conn.query_row("SELECT COUNT(*) FROM manufacturer_registrations", [], |r| r.get(0))?;
    let manufacturers: usize = conn.query_row(
        "SELECT COUNT(DISTINCT manufacturer) FROM manufacturer_registrations",
        [],
        |r| r.get(0),
    )?;
    let latest_date: Option<NaiveDate> =
        conn.query_row("SELECT MAX(date) FROM category_registrations", [], |r| r.get(0))?;
    Ok(Stats {
        category_rows,
        manufacturer_rows,
        manufacturers,
        latest_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn mem() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn upsert_overwrites_same_key() {
        let conn = mem();
        let first = CanonicalRecord::new(d(2024, 1, 1), Category::FourWheeler, 100);
        let second = CanonicalRecord::new(d(2024, 1, 1), Category::FourWheeler, 250);
        upsert_records(&conn, &[first]).unwrap();
        upsert_records(&conn, &[second]).unwrap();

        let rows = fetch_records(&conn, Dimension::Category, &RecordFilter::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].registrations, 250);
    }

    #[test]
    fn manufacturer_key_includes_maker() {
        let conn = mem();
        let base = CanonicalRecord::new(d(2024, 1, 1), Category::TwoWheeler, 10);
        upsert_records(
            &conn,
            &[
                base.clone().with_manufacturer("TVS"),
                base.clone().with_manufacturer("Honda"),
                base.clone().with_manufacturer("TVS").with_region("Goa"),
                CanonicalRecord { registrations: 12, ..base.clone().with_manufacturer("TVS") },
            ],
        )
        .unwrap();

        let rows = fetch_records(&conn, Dimension::Manufacturer, &RecordFilter::default()).unwrap();
        assert_eq!(rows.len(), 3);
        let tvs_national = rows
            .iter()
            .find(|r| r.manufacturer.as_deref() == Some("TVS") && r.region == "All India")
            .unwrap();
        assert_eq!(tvs_national.registrations, 12);
        // aggregate table untouched
        assert!(fetch_records(&conn, Dimension::Category, &RecordFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn filters_and_ordering() {
        let conn = mem();
        let mut batch = Vec::new();
        for m in 1..=6 {
            batch.push(CanonicalRecord::new(d(2024, m, 1), Category::TwoWheeler, m as u64));
            batch.push(CanonicalRecord::new(d(2024, m, 1), Category::FourWheeler, 10 * m as u64));
        }
        upsert_records(&conn, &batch).unwrap();

        let filter = RecordFilter {
            start: Some(d(2024, 2, 1)),
            end: Some(d(2024, 4, 1)),
            category: Some(Category::FourWheeler),
            ..Default::default()
        };
        let rows = fetch_records(&conn, Dimension::Category, &filter).unwrap();
        let counts: Vec<u64> = rows.iter().map(|r| r.registrations).collect();
        assert_eq!(counts, vec![40, 30, 20]);
        assert!(rows.iter().all(|r| r.manufacturer.is_none()));
    }

    #[test]
    fn manufacturer_list_filter() {
        let conn = mem();
        let base = CanonicalRecord::new(d(2024, 1, 1), Category::FourWheeler, 5);
        upsert_records(
            &conn,
            &[
                base.clone().with_manufacturer("Kia"),
                base.clone().with_manufacturer("Tata"),
                base.clone().with_manufacturer("Hyundai"),
            ],
        )
        .unwrap();

        let filter = RecordFilter {
            manufacturers: vec!["Kia".into(), "Hyundai".into()],
            ..Default::default()
        };
        let rows = fetch_records(&conn, Dimension::Manufacturer, &filter).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(fetch_manufacturers(&conn).unwrap(), vec!["Hyundai", "Kia", "Tata"]);
    }

    #[test]
    fn stats_on_empty_and_filled() {
        let conn = mem();
        let s = get_stats(&conn).unwrap();
        assert_eq!(s.category_rows, 0);
        assert!(s.latest_date.is_none());

        upsert_records(
            &conn,
            &[
                CanonicalRecord::new(d(2023, 12, 1), Category::ThreeWheeler, 1),
                CanonicalRecord::new(d(2024, 2, 1), Category::ThreeWheeler, 1),
                CanonicalRecord::new(d(2024, 2, 1), Category::ThreeWheeler, 1).with_manufacturer("Piaggio"),
            ],
        )
        .unwrap();
        let s = get_stats(&conn).unwrap();
        assert_eq!(s.category_rows, 2);
        assert_eq!(s.manufacturer_rows, 1);
        assert_eq!(s.manufacturers, 1);
        assert_eq!(s.latest_date, Some(d(2024, 2, 1)));
    }
}
