//! Error types for `postern-core`.

use thiserror::Error;

/// A boxed failure from a concrete backend implementation.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync>;

/// A failure reported by one of the engine's collaborators.
///
/// Rate-limited outcomes and not-found lookups are normal results, not
/// errors; only store and dispatch failures surface here.
#[derive(Debug, Error)]
pub enum Error {
  #[error("rate limiter unavailable: {0}")]
  Limiter(#[source] BoxedCause),

  #[error("credential store unavailable: {0}")]
  Credentials(#[source] BoxedCause),

  #[error("directory unavailable: {0}")]
  Directory(#[source] BoxedCause),

  #[error("notification dispatch failed: {0}")]
  Dispatch(#[source] BoxedCause),
}

impl Error {
  pub fn limiter(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Limiter(Box::new(cause))
  }

  pub fn credentials(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Credentials(Box::new(cause))
  }

  pub fn directory(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Directory(Box::new(cause))
  }

  pub fn dispatch(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Dispatch(Box::new(cause))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
