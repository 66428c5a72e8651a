//! In-memory reference implementations of the storage and dispatch traits.
//!
//! Used throughout the test suites and handy for running the engine without
//! external infrastructure. Every shared map sits behind a `Mutex`, and
//! cloning an instance shares its state, so one backend can be handed to
//! several services at once.
//!
//! [`MemoryRateLimiter::try_acquire`] does its whole check-and-write under a
//! single lock, which gives it the same atomicity the SQLite backend gets
//! from its single conditional statement — but only within one process.
//! Deployments spanning processes need a shared backend.

use std::{
  collections::{HashMap, hash_map::Entry},
  convert::Infallible,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};

use crate::{
  dispatch::{Dispatcher, Notification},
  passcode::Passcode,
  store::{
    CredentialStore, Directory, LimitKey, RateLimitEntry, RateLimiter,
  },
  subject::{DirectoryEntry, SubjectId},
};

// ─── Rate limiter ────────────────────────────────────────────────────────────

/// Rate limiter holding windows in a process-local map.
#[derive(Clone, Default)]
pub struct MemoryRateLimiter {
  windows: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

impl MemoryRateLimiter {
  pub fn new() -> Self {
    Self::default()
  }
}

impl RateLimiter for MemoryRateLimiter {
  type Error = Infallible;

  async fn try_acquire(
    &self,
    key: LimitKey,
    window: Duration,
    now: DateTime<Utc>,
  ) -> Result<bool, Infallible> {
    let key = key.to_string();
    let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
    match windows.entry(key.clone()) {
      Entry::Occupied(open) if open.get().expires_at > now => Ok(false),
      Entry::Occupied(mut lapsed) => {
        lapsed.get_mut().expires_at = now + window;
        Ok(true)
      }
      Entry::Vacant(free) => {
        free.insert(RateLimitEntry { key, expires_at: now + window });
        Ok(true)
      }
    }
  }
}

// ─── Credential store ────────────────────────────────────────────────────────

/// Passcode storage in a process-local map, keyed by code.
///
/// Holds expired records until [`purge_expired`](Self::purge_expired) runs,
/// like a real backend whose sweep lags; [`crate::otp::lookup`] re-checks
/// expiry regardless.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
  codes: Arc<Mutex<HashMap<String, Passcode>>>,
}

impl MemoryCredentialStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every record currently held, expired or not.
  pub fn stored(&self) -> Vec<Passcode> {
    self
      .codes
      .lock()
      .expect("credential store lock poisoned")
      .values()
      .cloned()
      .collect()
  }

  /// Drop records past their expiry; returns how many went.
  pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
    let mut codes = self.codes.lock().expect("credential store lock poisoned");
    let before = codes.len();
    codes.retain(|_, passcode| !passcode.is_expired(now));
    before - codes.len()
  }
}

impl CredentialStore for MemoryCredentialStore {
  type Error = Infallible;

  async fn put(&self, passcode: Passcode) -> Result<(), Infallible> {
    self
      .codes
      .lock()
      .expect("credential store lock poisoned")
      .insert(passcode.code.clone(), passcode);
    Ok(())
  }

  async fn get(&self, code: String) -> Result<Option<Passcode>, Infallible> {
    Ok(
      self
        .codes
        .lock()
        .expect("credential store lock poisoned")
        .get(&code)
        .cloned(),
    )
  }

  async fn invalidate(&self, code: String) -> Result<(), Infallible> {
    self
      .codes
      .lock()
      .expect("credential store lock poisoned")
      .remove(&code);
    Ok(())
  }
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// Visitor directory in a process-local map.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
  entries: Arc<Mutex<HashMap<SubjectId, DirectoryEntry>>>,
}

impl MemoryDirectory {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or replace a full entry. Seeding helper; the trait's
  /// [`insert_placeholder`](Directory::insert_placeholder) never replaces.
  pub fn insert(&self, entry: DirectoryEntry) {
    self
      .entries
      .lock()
      .expect("directory lock poisoned")
      .insert(entry.subject_id.clone(), entry);
  }
}

impl Directory for MemoryDirectory {
  type Error = Infallible;

  async fn entry(
    &self,
    subject_id: SubjectId,
  ) -> Result<Option<DirectoryEntry>, Infallible> {
    Ok(
      self
        .entries
        .lock()
        .expect("directory lock poisoned")
        .get(&subject_id)
        .cloned(),
    )
  }

  async fn insert_placeholder(
    &self,
    entry: DirectoryEntry,
  ) -> Result<(), Infallible> {
    self
      .entries
      .lock()
      .expect("directory lock poisoned")
      .entry(entry.subject_id.clone())
      .or_insert(entry);
    Ok(())
  }
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Dispatcher that records every notification instead of delivering it.
#[derive(Clone, Default)]
pub struct MemoryDispatcher {
  sent: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryDispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Everything dispatched so far, in order.
  pub fn sent(&self) -> Vec<Notification> {
    self.sent.lock().expect("dispatcher lock poisoned").clone()
  }
}

impl Dispatcher for MemoryDispatcher {
  type Error = Infallible;

  async fn dispatch(&self, notification: Notification) -> Result<(), Infallible> {
    self
      .sent
      .lock()
      .expect("dispatcher lock poisoned")
      .push(notification);
    Ok(())
  }
}
