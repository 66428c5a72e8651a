//! The storage traits the engine is wired with, and their record types.
//!
//! Implemented by storage backends (`postern-store-sqlite`, the in-memory
//! backends in [`crate::memory`]). Higher layers depend on these
//! abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::{fmt, future::Future};

use chrono::{DateTime, Duration, Utc};

use crate::{
  passcode::Passcode,
  subject::{DirectoryEntry, SubjectId},
};

// ─── Rate limiting ───────────────────────────────────────────────────────────

/// Identifies the (notification class, subject) pair whose notification
/// frequency is bounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LimitKey {
  /// Per-subject limit on known-visitor notifications.
  Known(SubjectId),
  /// Single global limit on unknown-visitor notifications.
  UnknownGlobal,
}

impl fmt::Display for LimitKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LimitKey::Known(id) => write!(f, "known:{id}"),
      LimitKey::UnknownGlobal => f.write_str("unknown:global"),
    }
  }
}

/// A claimed rate-limit window, as persisted by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
  pub key:        String,
  pub expires_at: DateTime<Utc>,
}

/// Bounds repeat notifications to at most one per key per window.
pub trait RateLimiter: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Atomically claim `key` until `now + window`.
  ///
  /// Returns `true` and writes the new window expiry if the key is free or
  /// its previous window has lapsed; returns `false` without writing while
  /// a window is still open. The check and the write must be one atomic
  /// operation in the backend — two callers racing on the same key must
  /// never both see `true`.
  fn try_acquire(
    &self,
    key: LimitKey,
    window: Duration,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Keyed storage for issued passcodes.
pub trait CredentialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `passcode` under its code. An existing record under the same
  /// code is overwritten (see [`crate::otp`] on code collisions).
  fn put(
    &self,
    passcode: Passcode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Fetch the record stored under `code`, expired or not.
  ///
  /// Backends may still be holding rows their expiry sweep has not reached;
  /// callers must treat a past `expires_at` as absent
  /// ([`crate::otp::lookup`] does).
  fn get(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<Passcode>, Self::Error>> + Send + '_;

  /// Remove `code` so further lookups miss. Used by single-use redemption.
  fn invalidate(
    &self,
    code: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// Read-mostly mapping from subject identifier to profile data.
pub trait Directory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the profile for `subject_id`, if the directory knows it.
  fn entry(
    &self,
    subject_id: SubjectId,
  ) -> impl Future<Output = Result<Option<DirectoryEntry>, Self::Error>> + Send + '_;

  /// Record a minimal entry for a just-approved visitor so later
  /// redemptions can resolve a display name. Never overwrites an existing
  /// entry.
  fn insert_placeholder(
    &self,
    entry: DirectoryEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
