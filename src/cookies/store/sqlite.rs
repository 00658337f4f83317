//! SQLite-backed cookie store.
//!
//! `SqliteCookieStore` keeps the cookie records of one jar in a single SQLite
//! table (`cookies`), one row per cookie, keyed by the cookie identity
//! (domain, path, name).
//!
//! ## Design
//! - Database access is via an `r2d2` pool for safe multi-threaded use.
//! - `save` **rewrites** the table (DELETE + INSERT) inside one transaction, so
//!   readers never observe a half written jar.
//! - List valued attributes (ports, extra attributes) are stored as JSON text.
use std::collections::BTreeMap;
use std::path::PathBuf;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::params;
use r2d2_sqlite::SqliteConnectionManager;

use crate::cookies::store::CookieStore;
use crate::cookies::Cookie;
use crate::errors::StoreError;

/// A SQLite-based cookie store.
pub struct SqliteCookieStore {
    /// Connection pool for SQLite database (so it can run multithreaded)
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteCookieStore {
    /// Opens (or creates) a SQLite database at `path` and ensures the schema exists.
    pub fn new(path: PathBuf) -> Result<Self, StoreError> {
        Self::with_manager(SqliteConnectionManager::file(path))
    }

    /// In-memory database, mostly useful for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        // Every pooled connection would get its own private memory database
        let pool = Pool::builder().max_size(1).build(SqliteConnectionManager::memory())?;
        Self::with_pool(pool)
    }

    fn with_manager(manager: SqliteConnectionManager) -> Result<Self, StoreError> {
        Self::with_pool(Pool::new(manager)?)
    }

    fn with_pool(pool: Pool<SqliteConnectionManager>) -> Result<Self, StoreError> {
        {
            let conn = pool.get()?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS cookies (
                    domain TEXT NOT NULL,
                    path TEXT NOT NULL,
                    name TEXT NOT NULL,
                    value TEXT NOT NULL,
                    max_age INTEGER,
                    expires INTEGER,
                    version TEXT,
                    secure INTEGER NOT NULL,
                    discard INTEGER NOT NULL,
                    http_only INTEGER NOT NULL,
                    comment TEXT,
                    comment_url TEXT,
                    ports TEXT NOT NULL,
                    attributes TEXT NOT NULL,
                    PRIMARY KEY (domain, path, name)
                );",
            )?;
        }

        Ok(Self { pool })
    }

    /// Borrows a pooled SQLite connection.
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }
}

/// Row as read from the database, before the JSON columns are decoded.
struct Row {
    cookie: Cookie,
    ports: String,
    attributes: String,
}

impl CookieStore for SqliteCookieStore {
    fn load(&self) -> Result<Vec<Cookie>, StoreError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT domain, path, name, value, max_age, expires, version, secure, discard,
                    http_only, comment, comment_url, ports, attributes
             FROM cookies ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            let cookie = Cookie {
                domain: row.get(0)?,
                path: row.get(1)?,
                name: row.get(2)?,
                value: row.get(3)?,
                max_age: row.get(4)?,
                expires: row.get(5)?,
                version: row.get(6)?,
                secure: row.get::<_, i64>(7)? != 0,
                discard: row.get::<_, i64>(8)? != 0,
                http_only: row.get::<_, i64>(9)? != 0,
                comment: row.get(10)?,
                comment_url: row.get(11)?,
                ports: Vec::new(),
                attributes: BTreeMap::new(),
            };
            Ok(Row {
                cookie,
                ports: row.get(12)?,
                attributes: row.get(13)?,
            })
        })?;

        let mut cookies = Vec::new();
        for row in rows {
            let Row {
                mut cookie,
                ports,
                attributes,
            } = row?;
            cookie.ports = serde_json::from_str(&ports)?;
            cookie.attributes = serde_json::from_str(&attributes)?;
            cookies.push(cookie);
        }

        Ok(cookies)
    }

    fn save(&self, cookies: &[Cookie]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM cookies", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO cookies (domain, path, name, value, max_age, expires, version, secure,
                                      discard, http_only, comment, comment_url, ports, attributes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;

            for cookie in cookies {
                stmt.execute(params![
                    cookie.domain,
                    cookie.path,
                    cookie.name,
                    cookie.value,
                    cookie.max_age,
                    cookie.expires,
                    cookie.version,
                    cookie.secure as i64,
                    cookie.discard as i64,
                    cookie.http_only as i64,
                    cookie.comment,
                    cookie.comment_url,
                    serde_json::to_string(&cookie.ports)?,
                    serde_json::to_string(&cookie.attributes)?,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.conn()?.execute("DELETE FROM cookies", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Cookie> {
        let mut with_extras = Cookie::new("b", "2")
            .with_domain("example.org")
            .with_path("/shop")
            .with_expires(2_000_000_000)
            .with_http_only(true);
        with_extras.ports = vec![80, 8080];
        with_extras.comment = Some("cart".to_string());
        with_extras.attributes.insert("SameSite".to_string(), "Lax".to_string());

        vec![
            Cookie::new("a", "1").with_domain("example.com").with_expires(2_000_000_000),
            with_extras,
        ]
    }

    #[test]
    fn save_then_load_in_memory() {
        let store = SqliteCookieStore::in_memory().unwrap();
        assert!(store.load().unwrap().is_empty());

        let cookies = sample();
        store.save(&cookies).unwrap();
        assert_eq!(store.load().unwrap(), cookies);

        // A second save replaces everything
        store.save(&cookies[..1]).unwrap();
        assert_eq!(store.load().unwrap(), cookies[..1].to_vec());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn survives_reopening_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.db");

        SqliteCookieStore::new(path.clone()).unwrap().save(&sample()).unwrap();
        let reopened = SqliteCookieStore::new(path).unwrap();
        assert_eq!(reopened.load().unwrap(), sample());
    }
}
