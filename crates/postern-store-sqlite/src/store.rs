//! [`SqliteStore`] — the SQLite implementation of the storage traits.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension as _;

use postern_core::{
  passcode::Passcode,
  store::{CredentialStore, Directory, LimitKey, RateLimiter},
  subject::{DirectoryEntry, SubjectId},
};

use crate::{
  Error, Result,
  encode::{decode_dt, decode_epoch, encode_dt, encode_epoch},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// All three postern stores backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Delete rows whose expiry has passed; returns how many went.
  ///
  /// Lookups already ignore expired rows, so this only keeps the tables
  /// from growing.
  pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
    let cutoff = encode_epoch(now);
    let purged = self
      .conn
      .call(move |conn| {
        let codes = conn.execute(
          "DELETE FROM passcodes WHERE expires_at <= ?1",
          rusqlite::params![cutoff],
        )?;
        let windows = conn.execute(
          "DELETE FROM rate_limits WHERE expires_at <= ?1",
          rusqlite::params![cutoff],
        )?;
        Ok(codes + windows)
      })
      .await?;
    Ok(purged)
  }

  /// Insert or replace a full directory entry.
  ///
  /// Seeding/admin helper. The engine only reads the directory, and the
  /// registration flow inserts placeholders that never replace.
  pub async fn upsert_visitor(&self, entry: DirectoryEntry) -> Result<()> {
    let subject_id = entry.subject_id.as_str().to_owned();
    let display_name = entry.display_name;
    let contact_hint = entry.contact_hint;
    let created_at = encode_dt(entry.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO visitors (subject_id, display_name, contact_hint, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(subject_id) DO UPDATE SET
             display_name = excluded.display_name,
             contact_hint = excluded.contact_hint",
          rusqlite::params![subject_id, display_name, contact_hint, created_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RateLimiter impl ────────────────────────────────────────────────────────

impl RateLimiter for SqliteStore {
  type Error = Error;

  /// One conditional upsert: the INSERT claims a free key, the DO UPDATE
  /// re-claims a lapsed one, and the update's WHERE leaves an open window
  /// untouched. The changed-row count is the verdict, so two concurrent
  /// acquires on one key can never both see 1.
  async fn try_acquire(
    &self,
    key: LimitKey,
    window: Duration,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    let id = key.to_string();
    let now_s = encode_epoch(now);
    let until = encode_epoch(now + window);

    let changed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO rate_limits (id, expires_at) VALUES (?1, ?2)
           ON CONFLICT(id) DO UPDATE SET expires_at = excluded.expires_at
           WHERE rate_limits.expires_at <= ?3",
          rusqlite::params![id, until, now_s],
        )?;
        Ok(changed)
      })
      .await?;
    Ok(changed == 1)
  }
}

// ─── CredentialStore impl ────────────────────────────────────────────────────

impl CredentialStore for SqliteStore {
  type Error = Error;

  async fn put(&self, passcode: Passcode) -> Result<()> {
    let code = passcode.code;
    let subject_id = passcode.subject_id.as_str().to_owned();
    let expires_at = encode_epoch(passcode.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO passcodes (code, subject_id, expires_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(code) DO UPDATE SET
             subject_id = excluded.subject_id,
             expires_at = excluded.expires_at",
          rusqlite::params![code, subject_id, expires_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get(&self, code: String) -> Result<Option<Passcode>> {
    let row = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT code, subject_id, expires_at FROM passcodes WHERE code = ?1",
            rusqlite::params![code],
            |r| {
              Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
              ))
            },
          )
          .optional()?;
        Ok(row)
      })
      .await?;

    row
      .map(|(code, subject_id, expires_at)| {
        Ok(Passcode {
          code,
          subject_id: SubjectId::new(subject_id),
          expires_at: decode_epoch(expires_at)?,
        })
      })
      .transpose()
  }

  async fn invalidate(&self, code: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM passcodes WHERE code = ?1",
          rusqlite::params![code],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Directory impl ──────────────────────────────────────────────────────────

impl Directory for SqliteStore {
  type Error = Error;

  async fn entry(&self, subject_id: SubjectId) -> Result<Option<DirectoryEntry>> {
    let id = subject_id.as_str().to_owned();
    let row = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(
            "SELECT subject_id, display_name, contact_hint, created_at
             FROM visitors WHERE subject_id = ?1",
            rusqlite::params![id],
            |r| {
              Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, String>(3)?,
              ))
            },
          )
          .optional()?;
        Ok(row)
      })
      .await?;

    row
      .map(|(subject_id, display_name, contact_hint, created_at)| {
        Ok(DirectoryEntry {
          subject_id: SubjectId::new(subject_id),
          display_name,
          contact_hint,
          created_at: decode_dt(&created_at)?,
        })
      })
      .transpose()
  }

  async fn insert_placeholder(&self, entry: DirectoryEntry) -> Result<()> {
    let subject_id = entry.subject_id.as_str().to_owned();
    let display_name = entry.display_name;
    let contact_hint = entry.contact_hint;
    let created_at = encode_dt(entry.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO visitors (subject_id, display_name, contact_hint, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(subject_id) DO NOTHING",
          rusqlite::params![subject_id, display_name, contact_hint, created_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
