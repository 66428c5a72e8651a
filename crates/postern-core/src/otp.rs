//! OTP generation, issuance, and lookup.

use chrono::{DateTime, Duration, Utc};
use rand::Rng as _;
use rand::rngs::OsRng;

use crate::{
  error::{Error, Result},
  passcode::{CODE_TTL_SECONDS, Passcode},
  store::CredentialStore,
  subject::SubjectId,
};

/// Produce a fresh six-digit code, zero-padded, uniform over the full
/// 000000–999999 range.
///
/// Codes are not checked against other live codes. A collision overwrites
/// the earlier record and the later write wins; with a five-minute validity
/// and low issue volume the odds stay small.
pub fn generate_code() -> String {
  format!("{:06}", OsRng.gen_range(0..=999_999))
}

/// Generate a code for `subject_id` and persist it with the fixed TTL.
pub async fn issue<C>(
  credentials: &C,
  subject_id: SubjectId,
  now: DateTime<Utc>,
) -> Result<Passcode>
where
  C: CredentialStore,
{
  let passcode = Passcode {
    code:       generate_code(),
    subject_id,
    expires_at: now + Duration::seconds(CODE_TTL_SECONDS),
  };
  credentials
    .put(passcode.clone())
    .await
    .map_err(Error::credentials)?;
  tracing::debug!(
    subject_id = %passcode.subject_id,
    expires_at = %passcode.expires_at,
    "issued passcode"
  );
  Ok(passcode)
}

/// Fetch a live passcode.
///
/// A record the backend still holds past its `expires_at` is treated as
/// absent: validity is decided here, not by the backend's expiry sweep.
pub async fn lookup<C>(
  credentials: &C,
  code: &str,
  now: DateTime<Utc>,
) -> Result<Option<Passcode>>
where
  C: CredentialStore,
{
  let found = credentials
    .get(code.to_owned())
    .await
    .map_err(Error::credentials)?;
  Ok(found.filter(|passcode| !passcode.is_expired(now)))
}
