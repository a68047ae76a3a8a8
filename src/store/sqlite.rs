use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, TrendError};
use crate::domain::{CompositeTrend, FetchJob, Language, Period, RepoResult, Repository, TrendEntry};
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            TrendError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
        let s: String = row.get(idx)?;
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    /// Move every reference from `old` to `new` inside `tx`. When `new` already
    /// has a row the two are merged, keeping the earliest `first_seen`.
    fn migrate_repository(tx: &Transaction<'_>, old: &str, new: &str) -> Result<bool> {
        let old_first: Option<String> = tx
            .query_row(
                "SELECT first_seen FROM repositories WHERE repo_name = ?1",
                params![old],
                |row| row.get(0),
            )
            .optional()?;

        let Some(old_first) = old_first else {
            return Ok(false);
        };

        let new_first: Option<String> = tx
            .query_row(
                "SELECT first_seen FROM repositories WHERE repo_name = ?1",
                params![new],
                |row| row.get(0),
            )
            .optional()?;

        match new_first {
            None => {
                // trend_entries follow through ON UPDATE CASCADE
                tx.execute(
                    "UPDATE repositories SET repo_name = ?1 WHERE repo_name = ?2",
                    params![new, old],
                )?;
            }
            Some(new_first) => {
                tx.execute(
                    "UPDATE trend_entries SET repo_name = ?1 WHERE repo_name = ?2",
                    params![new, old],
                )?;
                let first_seen = old_first.min(new_first);
                tx.execute(
                    "UPDATE repositories SET first_seen = ?1 WHERE repo_name = ?2",
                    params![first_seen, new],
                )?;
                tx.execute(
                    "DELETE FROM repositories WHERE repo_name = ?1",
                    params![old],
                )?;
            }
        }

        Ok(true)
    }
}

impl Store for SqliteStore {
    fn upsert_languages(&self, languages: &[Language]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO languages (machine_name, display_name) VALUES (?1, ?2)
                 ON CONFLICT(machine_name) DO UPDATE SET display_name = excluded.display_name",
            )?;
            for language in languages {
                stmt.execute(params![language.machine_name, language.display_name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_periods(&self, periods: &[Period]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO periods (machine_name, display_name, url_suffix) VALUES (?1, ?2, ?3)
                 ON CONFLICT(machine_name) DO UPDATE SET
                     display_name = excluded.display_name,
                     url_suffix = excluded.url_suffix",
            )?;
            for period in periods {
                stmt.execute(params![
                    period.machine_name,
                    period.display_name,
                    period.url_suffix
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_languages(&self) -> Result<Vec<Language>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT machine_name, display_name FROM languages ORDER BY machine_name",
        )?;

        let languages = stmt
            .query_map([], |row| {
                Ok(Language {
                    machine_name: row.get(0)?,
                    display_name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(languages)
    }

    fn list_periods(&self) -> Result<Vec<Period>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT machine_name, display_name, url_suffix FROM periods ORDER BY rowid",
        )?;

        let periods = stmt
            .query_map([], |row| {
                Ok(Period {
                    machine_name: row.get(0)?,
                    display_name: row.get(1)?,
                    url_suffix: row.get(2)?,
                    all_url: String::new(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(periods)
    }

    fn record_snapshot(&self, job: &FetchJob, date: NaiveDate) -> Result<usize> {
        if !job.is_fetched() {
            return Ok(0);
        }

        let day = date.to_string();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO repositories (repo_name, first_seen, last_seen)
                 VALUES (?1, ?2, ?2)",
            )?;
            for (_, repo_name) in job.ranked() {
                stmt.execute(params![repo_name, day])?;
            }
        }

        // Only this facet's rows for this date are replaced; history stays.
        tx.execute(
            "DELETE FROM trend_entries WHERE language = ?1 AND period = ?2 AND date = ?3",
            params![job.language.machine_name, job.period.machine_name, day],
        )?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO trend_entries (language, period, repo_name, rank, date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (rank, repo_name) in job.ranked() {
                count += stmt.execute(params![
                    job.language.machine_name,
                    job.period.machine_name,
                    repo_name,
                    rank,
                    day
                ])?;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    fn composite_view(&self, language: &str, period: &str) -> Result<Vec<CompositeTrend>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT t.language, l.display_name, t.period, p.display_name, t.rank, t.date,
                    t.repo_name, r.description, r.readme_html, r.first_seen, r.last_seen
             FROM trend_entries t
             JOIN repositories r ON r.repo_name = t.repo_name
             JOIN languages l ON l.machine_name = t.language
             JOIN periods p ON p.machine_name = t.period
             WHERE t.language = ?1 AND t.period = ?2
               AND t.date = (SELECT MAX(date) FROM trend_entries
                             WHERE language = ?1 AND period = ?2)
             ORDER BY t.rank ASC",
        )?;

        let rows = stmt
            .query_map(params![language, period], |row| {
                Ok(CompositeTrend {
                    language: row.get(0)?,
                    language_name: row.get(1)?,
                    period: row.get(2)?,
                    period_name: row.get(3)?,
                    rank: row.get(4)?,
                    date: Self::parse_date(row, 5)?,
                    repo_name: row.get(6)?,
                    description: row.get(7)?,
                    readme_html: row.get(8)?,
                    first_seen: Self::parse_date(row, 9)?,
                    last_seen: Self::parse_date(row, 10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn trend_history(&self, repo_name: &str) -> Result<Vec<TrendEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT language, period, repo_name, rank, date FROM trend_entries
             WHERE repo_name = ?1
             ORDER BY date, language, period, rank",
        )?;

        let entries = stmt
            .query_map(params![repo_name], |row| {
                Ok(TrendEntry {
                    language: row.get(0)?,
                    period: row.get(1)?,
                    repo_name: row.get(2)?,
                    rank: row.get(3)?,
                    date: Self::parse_date(row, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn repository(&self, repo_name: &str) -> Result<Option<Repository>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                "SELECT repo_name, description, readme_html, first_seen, last_seen
                 FROM repositories WHERE repo_name = ?1",
                params![repo_name],
                |row| {
                    Ok(Repository {
                        repo_name: row.get(0)?,
                        description: row.get(1)?,
                        readme_html: row.get(2)?,
                        first_seen: Self::parse_date(row, 3)?,
                        last_seen: Self::parse_date(row, 4)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn repositories_missing_metadata(&self) -> Result<BTreeSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT repo_name FROM repositories
             WHERE description IS NULL OR readme_html IS NULL
             UNION
             SELECT t.repo_name FROM trend_entries t
             LEFT JOIN repositories r ON r.repo_name = t.repo_name
             WHERE r.repo_name IS NULL",
        )?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;

        Ok(names)
    }

    fn apply_repository_result(&self, result: &RepoResult, date: NaiveDate) -> Result<()> {
        let day = date.to_string();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if let Some((old, new)) = result.rename() {
            if Self::migrate_repository(&tx, old, new)? {
                tracing::info!("Renamed repository {} -> {}", old, new);
            }
        }

        tx.execute(
            "INSERT INTO repositories (repo_name, description, readme_html, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(repo_name) DO UPDATE SET
                 description = excluded.description,
                 readme_html = excluded.readme_html,
                 last_seen = excluded.last_seen",
            params![result.repo_name, result.description, result.readme_html, day],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn api_token(&self) -> Result<Option<String>> {
        let conn = self.lock()?;
        let token = conn
            .query_row(
                "SELECT token FROM api_credentials WHERE id = 0",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(token)
    }

    fn set_api_token(&self, token: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO api_credentials (id, token) VALUES (0, ?1)
             ON CONFLICT(id) DO UPDATE SET token = excluded.token",
            params![token],
        )?;
        Ok(())
    }
}
