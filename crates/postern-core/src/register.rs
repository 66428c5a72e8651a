//! The approval flow for unknown visitors.
//!
//! Invoked by a human operator after an unknown-visitor notification:
//! creates a synthetic subject, issues a code right away, and tells the
//! operator what to hand to the visitor. Deliberately not rate limited —
//! each call is an explicit one-shot human action, not a pipeline event.

use chrono::{DateTime, Utc};

use crate::{
  dispatch::{Audience, Dispatcher, Notification},
  error::{Error, Result},
  otp,
  store::{CredentialStore, Directory},
  subject::{DirectoryEntry, SubjectId},
};

/// An operator's approval of an unknown visitor.
#[derive(Debug, Clone)]
pub struct Approval {
  pub display_name: String,
  pub note:         Option<String>,
}

/// Handles approvals end to end.
pub struct RegistrationService<C, D, N> {
  credentials: C,
  directory:   D,
  dispatcher:  N,
}

impl<C, D, N> RegistrationService<C, D, N>
where
  C: CredentialStore,
  D: Directory,
  N: Dispatcher,
{
  pub fn new(credentials: C, directory: D, dispatcher: N) -> Self {
    Self { credentials, directory, dispatcher }
  }

  /// Approve a visitor at `now`; returns the synthetic subject the code was
  /// issued to.
  ///
  /// This is a single user-initiated request, so unlike batch event
  /// processing any step failing fails the whole approval.
  pub async fn approve(
    &self,
    approval: Approval,
    now: DateTime<Utc>,
  ) -> Result<SubjectId> {
    let subject_id = SubjectId::synthetic(now);
    let passcode = otp::issue(&self.credentials, subject_id.clone(), now).await?;

    self
      .dispatcher
      .dispatch(approval_notification(&approval, &passcode.code))
      .await
      .map_err(Error::dispatch)?;

    // Record a name for the synthetic subject so redemption can resolve it.
    self
      .directory
      .insert_placeholder(DirectoryEntry::placeholder(
        subject_id.clone(),
        approval.display_name,
        now,
      ))
      .await
      .map_err(Error::directory)?;

    tracing::info!(subject_id = %subject_id, "unknown visitor approved, code issued");
    Ok(subject_id)
  }
}

fn approval_notification(approval: &Approval, code: &str) -> Notification {
  let note = approval.note.as_deref().unwrap_or("(no note)");
  Notification {
    audience:      Audience::Operator,
    subject_label: format!("Passcode for approved visitor {}", approval.display_name),
    body:          format!(
      "Unknown visitor approved.\nName: {}\nNote: {note}\n\nPasscode: {code}\n\nShare this passcode with the visitor so they can open the door.",
      approval.display_name,
    ),
  }
}
