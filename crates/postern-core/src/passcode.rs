//! Passcode — the short-lived credential issued per access event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subject::SubjectId;

/// Fixed validity for issued codes, in seconds (five minutes).
pub const CODE_TTL_SECONDS: i64 = 300;

/// An issued one-time passcode.
///
/// Stored keyed by `code`, not by subject: codes issued for the same subject
/// in separate windows coexist until each expires. A code absent from the
/// store or past `expires_at` is invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passcode {
  /// Six decimal digits, zero-padded.
  pub code:       String,
  pub subject_id: SubjectId,
  /// Always issue time plus [`CODE_TTL_SECONDS`].
  pub expires_at: DateTime<Utc>,
}

impl Passcode {
  /// Whether the code is past its validity, regardless of what the backing
  /// store still holds.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }
}
