//! Subject — the identity a passcode is issued to.
//!
//! A subject holds only an opaque identifier. Profile data (display name,
//! contact hint) lives in the visitor directory and is resolved on read.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier for a recognized or synthetic entity.
///
/// Known subjects carry the identifier assigned by the upstream recognition
/// system. Approved unknown visitors get a synthetic identifier derived from
/// the approval time. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  /// Mint an identifier for a visitor approved without a recognition match.
  pub fn synthetic(now: DateTime<Utc>) -> Self {
    Self(format!("unknown-{}", now.timestamp()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SubjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for SubjectId {
  fn from(id: &str) -> Self { Self(id.to_owned()) }
}

impl From<String> for SubjectId {
  fn from(id: String) -> Self { Self(id) }
}

/// Profile data for one subject, owned by the visitor directory.
///
/// The engine only reads entries; the registration flow inserts minimal
/// placeholders so a later redemption can resolve a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
  pub subject_id:   SubjectId,
  pub display_name: String,
  /// Where to reach the visitor, if known. Placeholder entries have none.
  pub contact_hint: Option<String>,
  pub created_at:   DateTime<Utc>,
}

impl DirectoryEntry {
  /// The minimal entry recorded when an unknown visitor is approved.
  pub fn placeholder(
    subject_id: SubjectId,
    display_name: impl Into<String>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      subject_id,
      display_name: display_name.into(),
      contact_hint: None,
      created_at: now,
    }
  }
}
