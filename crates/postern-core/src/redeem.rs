//! Redemption — turning a submitted code back into an identity.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  error::Result,
  otp,
  passcode::Passcode,
  store::{CredentialStore, Directory},
  subject::SubjectId,
};

/// Display name reported when a valid code's subject cannot be resolved.
const FALLBACK_DISPLAY_NAME: &str = "Visitor";

/// Behavior switches for redemption.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedemptionPolicy {
  /// When set, the first successful redemption deletes the code, so a
  /// second submission of the same code reports invalid. Off by default: a
  /// code stays redeemable for its whole five minutes.
  pub single_use: bool,
}

/// The answer to a redemption request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
  pub valid: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
}

impl Redemption {
  fn invalid() -> Self {
    Self { valid: false, display_name: None }
  }
}

/// Looks submitted codes up and resolves who they belong to.
pub struct RedemptionService<C, D> {
  credentials: C,
  directory:   D,
  policy:      RedemptionPolicy,
}

impl<C, D> RedemptionService<C, D>
where
  C: CredentialStore,
  D: Directory,
{
  pub fn new(credentials: C, directory: D, policy: RedemptionPolicy) -> Self {
    Self { credentials, directory, policy }
  }

  /// Redeem `code` at `now`.
  ///
  /// Validity is decided solely by the code being present and fresh. A
  /// directory miss — or failure — after a valid code still redeems, with a
  /// generic display name.
  pub async fn redeem(&self, code: &str, now: DateTime<Utc>) -> Result<Redemption> {
    let Some(passcode) = self.lookup_with_retry(code, now).await? else {
      tracing::info!("redemption rejected, code unknown or expired");
      return Ok(Redemption::invalid());
    };

    let display_name = self.resolve_display_name(&passcode.subject_id).await;

    if self.policy.single_use {
      self.invalidate(&passcode).await;
    }

    tracing::info!(subject_id = %passcode.subject_id, "passcode redeemed");
    Ok(Redemption { valid: true, display_name: Some(display_name) })
  }

  /// Credential lookups get one retry on a store failure; a second failure
  /// surfaces as unavailable.
  async fn lookup_with_retry(
    &self,
    code: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<Passcode>> {
    match otp::lookup(&self.credentials, code, now).await {
      Ok(found) => Ok(found),
      Err(first) => {
        tracing::debug!(error = %first, "credential lookup failed, retrying");
        otp::lookup(&self.credentials, code, now).await
      }
    }
  }

  /// Directory resolution is best-effort: one retry, then the fallback
  /// name. A redeemed code is never rejected over a directory problem.
  async fn resolve_display_name(&self, subject_id: &SubjectId) -> String {
    for attempt in 0..2 {
      match self.directory.entry(subject_id.clone()).await {
        Ok(Some(entry)) => return entry.display_name,
        Ok(None) => return FALLBACK_DISPLAY_NAME.to_owned(),
        Err(error) => tracing::warn!(
          subject_id = %subject_id,
          attempt,
          error = %error,
          "directory read failed during redemption"
        ),
      }
    }
    FALLBACK_DISPLAY_NAME.to_owned()
  }

  /// A failed delete only means the code stays live until expiry; the
  /// redemption already granted stands.
  async fn invalidate(&self, passcode: &Passcode) {
    if let Err(error) = self.credentials.invalidate(passcode.code.clone()).await {
      tracing::warn!(error = %error, "failed to invalidate redeemed code");
    }
  }
}
