//! JSON-backed cookie store.
//!
//! `JsonCookieStore` keeps the cookie records of one jar in a single JSON file:
//! an array of records in the format described in
//! [`Cookie`](crate::cookies::Cookie).
//!
//! ### I/O characteristics & caveats
//! - Every `save` rewrites the entire file. For large datasets, consider the
//!   SQLite-backed store.
//! - A missing or empty file loads as an empty jar; a file that is not a valid
//!   record array is an error, it is never silently discarded.
//! - Writes go to a temporary sibling file that is renamed over the target.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::cookies::store::CookieStore;
use crate::cookies::Cookie;
use crate::errors::StoreError;

/// A JSON file based cookie store.
pub struct JsonCookieStore {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,
    /// Serializes file access of this store.
    lock: Mutex<()>,
}

impl JsonCookieStore {
    /// Creates a store for `path`. The file is created on first save.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CookieStore for JsonCookieStore {
    fn load(&self) -> Result<Vec<Cookie>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, cookies: &[Cookie]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let contents = serde_json::to_string_pretty(cookies)?;
        let tmp = self.temp_path();
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;

        log::trace!("Saved {} cookies to {}", cookies.len(), self.path.display());
        Ok(())
    }
}
