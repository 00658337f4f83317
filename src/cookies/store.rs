//! Cookie store infrastructure.
//!
//! A **cookie store** is the persistence layer behind a
//! [`PersistentCookieJar`](crate::cookies::PersistentCookieJar). The jar keeps
//! the live state in memory and hands the store a snapshot of its persistable
//! cookies after every mutation.
//!
//! This module exports two reference implementations:
//! - [`JsonCookieStore`]: file-backed JSON store (good for simple setups).
//! - [`SqliteCookieStore`]: SQLite-backed store, behind the
//!   `sqlite_cookie_store` feature.
//!
//! ## Design notes
//! - A store only moves cookie records around; which cookies are worth
//!   persisting is decided by the jar.
//! - Implementations must be `Send + Sync` and do their own synchronization,
//!   all trait methods take `&self`.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use gosub_http::cookies::{DefaultCookieJar, JsonCookieStore, PersistentCookieJar};
//!
//! let store = Arc::new(JsonCookieStore::new("cookies.json".into()));
//! let jar = PersistentCookieJar::open(Box::new(DefaultCookieJar::new()), store).unwrap();
//! ```
mod json;
#[cfg(feature = "sqlite_cookie_store")]
mod sqlite;

use std::sync::Arc;

use crate::cookies::Cookie;
use crate::errors::StoreError;

/// File-backed JSON cookie store.
pub use json::JsonCookieStore;
/// SQLite-backed cookie store.
#[cfg(feature = "sqlite_cookie_store")]
pub use sqlite::SqliteCookieStore;

/// A handle to a cookie store trait.
pub type CookieStoreHandle = Arc<dyn CookieStore + Send + Sync>;

/// Durable storage for cookie records.
pub trait CookieStore: Send + Sync {
    /// Reads all stored cookies. An empty or not yet created store loads as no
    /// cookies at all.
    fn load(&self) -> Result<Vec<Cookie>, StoreError>;

    /// Replaces the stored cookies with `cookies`.
    fn save(&self, cookies: &[Cookie]) -> Result<(), StoreError>;

    /// Removes all stored cookies.
    fn clear(&self) -> Result<(), StoreError> {
        self.save(&[])
    }
}
