use url::Url;

use crate::cookies::{Cookie, CookieJar, CookieStoreHandle};
use crate::errors::CookieError;

/// A `CookieJar` decorator that persists changes after each mutation.
///
/// This type is *transparent* for reads but *eagerly* persists after writes.
/// Persisting after a mutation is best-effort: failures are logged and the
/// in-memory state stays authoritative. Use [`flush`](Self::flush) to persist
/// and observe errors.
pub struct PersistentCookieJar {
    /// Inner cookie jar that holds the actual cookie state.
    inner: Box<dyn CookieJar>,
    /// Handle to the cookie store responsible for persistence.
    store: CookieStoreHandle,
}

impl PersistentCookieJar {
    /// Wraps `jar` without reading the store.
    pub fn new(jar: Box<dyn CookieJar>, store: CookieStoreHandle) -> Self {
        Self { inner: jar, store }
    }

    /// Wraps `jar` and replaces its contents with the cookies in the store.
    ///
    /// Stored records are added one by one, so invalid records are dropped
    /// and a strict jar fails with the first validation error.
    pub fn open(mut jar: Box<dyn CookieJar>, store: CookieStoreHandle) -> Result<Self, CookieError> {
        let cookies = store.load()?;
        let loaded = cookies.len();
        let stored = jar.replace_all(cookies)?;
        log::debug!("Loaded {} of {} cookies from store", stored, loaded);

        Ok(Self::new(jar, store))
    }

    /// Writes the persistable cookies of the inner jar to the store.
    pub fn flush(&self) -> Result<(), CookieError> {
        self.store.save(&self.inner.persistable_cookies())?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            log::warn!("Failed to persist cookies: {}", e);
        }
    }

    fn persist_if(&self, changed: bool) {
        if changed {
            self.persist();
        }
    }
}

impl CookieJar for PersistentCookieJar {
    fn add(&mut self, cookie: Cookie) -> Result<bool, CookieError> {
        let stored = self.inner.add(cookie)?;
        self.persist_if(stored);
        Ok(stored)
    }

    fn matching_cookies(&self, url: &Url) -> Vec<Cookie> {
        self.inner.matching_cookies(url)
    }

    fn remove_expired(&mut self) -> usize {
        let removed = self.inner.remove_expired();
        self.persist_if(removed > 0);
        removed
    }

    fn remove_temporary(&mut self) -> usize {
        let removed = self.inner.remove_temporary();
        self.persist_if(removed > 0);
        removed
    }

    fn remove(&mut self, domain: Option<&str>, path: Option<&str>, name: Option<&str>) -> usize {
        let removed = self.inner.remove(domain, path, name);
        self.persist_if(removed > 0);
        removed
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.persist();
    }

    fn cookies(&self) -> Vec<Cookie> {
        self.inner.cookies()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn persistable_cookies(&self) -> Vec<Cookie> {
        self.inner.persistable_cookies()
    }

    fn replace_all(&mut self, cookies: Vec<Cookie>) -> Result<usize, CookieError> {
        let result = self.inner.replace_all(cookies);
        self.persist();
        result
    }
}
