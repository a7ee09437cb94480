//! Key-value store adapters
//!
//! Two redundant persistence stores back the client's flag cache: a
//! cookie-shaped jar that honours TTLs and a plain local store that
//! ignores them. Both survive restarts as JSON files in the application
//! data directory; the in-memory variant serves tests.

mod cookie_file;
mod local_file;
mod memory;

pub use cookie_file::FileCookieStore;
pub use local_file::FileLocalStore;
pub use memory::MemoryKeyValueStore;

pub const DEFAULT_COOKIE_FILE: &str = "cookies.json";
pub const DEFAULT_LOCAL_STORE_FILE: &str = "local_store.json";
