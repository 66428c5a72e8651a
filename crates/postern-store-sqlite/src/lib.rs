//! SQLite backend for the postern stores.
//!
//! One [`SqliteStore`] implements all three storage traits (rate limiter,
//! credential store, directory) over a single database file. Wraps
//! [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
