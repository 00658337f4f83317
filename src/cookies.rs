//! Cookies: [`Cookie`], [`CookieJar`], [`CookieStore`] and backends.

mod cookie;
mod cookie_jar;
mod persistent_cookie_jar;
mod store;
mod subscriber;

pub use cookie::Cookie;
pub(crate) use cookie::now_timestamp;

pub use cookie_jar::CookieJar;
pub use cookie_jar::CookieJarHandle;
pub use cookie_jar::DefaultCookieJar;
pub use cookie_jar::ValidationMode;
pub use persistent_cookie_jar::PersistentCookieJar;

pub use store::CookieStore;
pub use store::CookieStoreHandle;
pub use store::JsonCookieStore;
#[cfg(feature = "sqlite_cookie_store")]
pub use store::SqliteCookieStore;

pub use subscriber::CookieSubscriber;
