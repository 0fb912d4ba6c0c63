use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::cache::traits::{FreshnessEntry, NameMatch, PackageFilter, PackageStore};
use crate::error::CacheError;
use crate::parser::PackageRecord;

const PACKAGE_COLUMNS: &str =
    "full_name, name, version, release, arch, epoch, summary, size, pkg_group, source_id";

/// SQLite-backed package cache.
///
/// Every source's packages live in one shared table partitioned by a
/// `source_id` column; ids are always bound as parameters.
pub struct Cache {
    conn: Mutex<Connection>,
}

impl Cache {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;

        // Enable WAL mode so readers never see a source mid-repopulation
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");

        let cache = Self {
            conn: Mutex::new(conn),
        };

        cache.create_schema()?;
        info!("Cache initialized successfully");

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Get current timestamp in milliseconds since UNIX epoch
    fn current_timestamp_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS freshness (
                source_id TEXT PRIMARY KEY NOT NULL,
                stored_mtime INTEGER NOT NULL DEFAULT 0,
                refreshed_at INTEGER,
                package_count INTEGER NOT NULL DEFAULT 0
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id TEXT NOT NULL,
                full_name TEXT NOT NULL,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                release TEXT NOT NULL,
                arch TEXT NOT NULL,
                epoch TEXT NOT NULL,
                summary TEXT,
                size INTEGER NOT NULL,
                pkg_group TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_packages_source_name ON packages(source_id, name)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_packages_summary ON packages(source_id, summary)",
            [],
        )?;

        debug!("Database schema created successfully");
        Ok(())
    }

    fn row_to_package(row: &Row<'_>) -> rusqlite::Result<PackageRecord> {
        Ok(PackageRecord {
            full_name: row.get(0)?,
            name: row.get(1)?,
            version: row.get(2)?,
            release: row.get(3)?,
            arch: row.get(4)?,
            epoch: row.get(5)?,
            summary: row.get(6)?,
            size: row.get(7)?,
            group: row.get(8)?,
            source_id: row.get(9)?,
        })
    }

    fn row_to_freshness(row: &Row<'_>) -> rusqlite::Result<FreshnessEntry> {
        Ok(FreshnessEntry {
            source_id: row.get(0)?,
            stored_mtime: row.get(1)?,
            refreshed_at: row.get(2)?,
            package_count: row.get(3)?,
        })
    }
}

impl PackageStore for Cache {
    fn register_source(&self, source_id: &str) -> Result<i64, CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            "INSERT OR IGNORE INTO freshness (source_id, stored_mtime) VALUES (?1, 0)",
            [source_id],
        )?;

        let stored_mtime = conn.query_row(
            "SELECT stored_mtime FROM freshness WHERE source_id = ?1",
            [source_id],
            |row| row.get(0),
        )?;

        Ok(stored_mtime)
    }

    fn freshness(&self, source_id: &str) -> Result<Option<FreshnessEntry>, CacheError> {
        let conn = self.lock_conn()?;
        let entry = conn
            .query_row(
                r#"
                SELECT source_id, stored_mtime, refreshed_at, package_count
                FROM freshness WHERE source_id = ?1
                "#,
                [source_id],
                Self::row_to_freshness,
            )
            .optional()?;

        Ok(entry)
    }

    fn freshness_entries(&self) -> Result<Vec<FreshnessEntry>, CacheError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT source_id, stored_mtime, refreshed_at, package_count
            FROM freshness ORDER BY source_id
            "#,
        )?;

        let entries = stmt
            .query_map([], Self::row_to_freshness)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn replace_packages(
        &self,
        source_id: &str,
        packages: &[PackageRecord],
        mtime: i64,
    ) -> Result<(), CacheError> {
        debug!("Saving {} packages for {}", packages.len(), source_id);

        let now = Self::current_timestamp_ms();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM packages WHERE source_id = ?1", [source_id])?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO packages
                    (source_id, full_name, name, version, release, arch, epoch, summary, size, pkg_group)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;
            for package in packages {
                stmt.execute((
                    source_id,
                    &package.full_name,
                    &package.name,
                    &package.version,
                    &package.release,
                    &package.arch,
                    &package.epoch,
                    &package.summary,
                    package.size,
                    &package.group,
                ))?;
            }
        }

        // Only reached when every insert succeeded; an early return drops
        // the transaction, which rolls it back and keeps the old mtime
        tx.execute(
            r#"
            INSERT INTO freshness (source_id, stored_mtime, refreshed_at, package_count)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(source_id) DO UPDATE SET
                stored_mtime = excluded.stored_mtime,
                refreshed_at = excluded.refreshed_at,
                package_count = excluded.package_count
            "#,
            (source_id, mtime, now, packages.len() as i64),
        )?;

        tx.commit()?;

        debug!("Successfully saved packages for {}", source_id);
        Ok(())
    }

    fn find_packages(
        &self,
        source_id: &str,
        filter: &PackageFilter,
    ) -> Result<Vec<PackageRecord>, CacheError> {
        let (predicate, value) = match (&filter.name, filter.search_summary) {
            (NameMatch::Exact(v), false) => ("name = ?2", v),
            (NameMatch::Exact(v), true) => ("(name = ?2 OR summary = ?2)", v),
            (NameMatch::Like(v), false) => (r"name LIKE ?2 ESCAPE '\'", v),
            (NameMatch::Like(v), true) => {
                (r"(name LIKE ?2 ESCAPE '\' OR summary LIKE ?2 ESCAPE '\')", v)
            }
        };

        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages WHERE source_id = ?1 AND {predicate} ORDER BY name, id"
        );

        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let packages = stmt
            .query_map((source_id, value), Self::row_to_package)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(packages)
    }

    fn forget_source(&self, source_id: &str) -> Result<(), CacheError> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM packages WHERE source_id = ?1", [source_id])?;
        tx.execute("DELETE FROM freshness WHERE source_id = ?1", [source_id])?;

        tx.commit()?;
        info!("Removed cached packages for {}", source_id);
        Ok(())
    }
}
