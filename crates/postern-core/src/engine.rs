//! The access decision engine.
//!
//! Consumes decoded match events and decides, per event, whether to issue a
//! passcode and notify the operator, or to stay quiet because a
//! notification for the same key already went out within the window.
//!
//! The engine holds no mutable state of its own. Everything shared lives
//! behind the injected stores, so any number of engines — in any number of
//! processes — can run against the same backends; serialisation happens in
//! the rate limiter's atomic acquire, never in application-level locking.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{
  dispatch::{Audience, Dispatcher, Notification},
  error::{Error, Result},
  event::MatchEvent,
  otp,
  store::{CredentialStore, Directory, LimitKey, RateLimiter},
  subject::{DirectoryEntry, SubjectId},
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Tunable knobs for the engine.
#[derive(Debug, Clone)]
pub struct EnginePolicy {
  /// Minimum spacing between notifications for one rate-limit key.
  pub notify_window: Duration,
  /// Where the operator can approve an unknown visitor; included in
  /// unknown-visitor notifications when set.
  pub approval_hint: Option<String>,
}

impl Default for EnginePolicy {
  fn default() -> Self {
    Self {
      notify_window: Duration::seconds(300),
      approval_hint: None,
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What the engine decided for one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  /// Known subject: a code was issued and the operator notified.
  Notified { subject_id: SubjectId, code: String },
  /// Unknown visitor: the operator was told someone unrecognized is at the
  /// door. No code exists yet; issuance happens via the approval flow.
  UnknownReported,
  /// A notification for this key already went out within the window.
  Suppressed { key: LimitKey },
  /// Known to the recognizer but absent from the directory; nobody to name
  /// in a notification, so none is sent.
  Unlisted { subject_id: SubjectId },
}

/// Counts for one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
  pub processed:  usize,
  pub notified:   usize,
  pub suppressed: usize,
  pub failed:     usize,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Orchestrates the rate limiter, directory, issuer, and dispatcher.
pub struct AccessEngine<L, C, D, N> {
  limiter:     L,
  credentials: C,
  directory:   D,
  dispatcher:  N,
  policy:      EnginePolicy,
}

impl<L, C, D, N> AccessEngine<L, C, D, N>
where
  L: RateLimiter,
  C: CredentialStore,
  D: Directory,
  N: Dispatcher,
{
  pub fn new(
    limiter: L,
    credentials: C,
    directory: D,
    dispatcher: N,
    policy: EnginePolicy,
  ) -> Self {
    Self { limiter, credentials, directory, dispatcher, policy }
  }

  /// Process a batch of events in order.
  ///
  /// Each event is an independent unit of work: a failure is logged and
  /// counted, never allowed to stop the rest of the batch.
  pub async fn process_batch(&self, events: Vec<MatchEvent>) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for event in events {
      summary.processed += 1;
      match self.handle_event(event, Utc::now()).await {
        Ok(Outcome::Notified { .. } | Outcome::UnknownReported) => {
          summary.notified += 1;
        }
        Ok(Outcome::Suppressed { .. }) => summary.suppressed += 1,
        Ok(Outcome::Unlisted { .. }) => {}
        Err(error) => {
          summary.failed += 1;
          tracing::warn!(error = %error, "event processing failed");
        }
      }
    }
    summary
  }

  /// Decide one event at `now`.
  pub async fn handle_event(
    &self,
    event: MatchEvent,
    now: DateTime<Utc>,
  ) -> Result<Outcome> {
    match event {
      MatchEvent::Known { subject_id, confidence } => {
        self.handle_known(subject_id, confidence, now).await
      }
      MatchEvent::Unknown => self.handle_unknown(now).await,
    }
  }

  async fn handle_known(
    &self,
    subject_id: SubjectId,
    confidence: f64,
    now: DateTime<Utc>,
  ) -> Result<Outcome> {
    tracing::debug!(subject_id = %subject_id, confidence, "known match");

    let key = LimitKey::Known(subject_id.clone());
    if !self.acquire(&key, now).await {
      tracing::info!(key = %key, "notification suppressed, window still open");
      return Ok(Outcome::Suppressed { key });
    }

    let Some(entry) = self.directory_entry(subject_id.clone()).await? else {
      tracing::info!(subject_id = %subject_id, "match has no directory entry");
      return Ok(Outcome::Unlisted { subject_id });
    };

    // Issue before dispatch, so a notification never names a code that
    // failed to persist.
    let passcode = otp::issue(&self.credentials, subject_id.clone(), now).await?;

    self
      .dispatcher
      .dispatch(known_visitor_notification(&entry, &passcode.code))
      .await
      .map_err(Error::dispatch)?;

    tracing::info!(
      subject_id = %subject_id,
      display_name = %entry.display_name,
      "passcode issued and operator notified"
    );
    Ok(Outcome::Notified { subject_id, code: passcode.code })
  }

  async fn handle_unknown(&self, now: DateTime<Utc>) -> Result<Outcome> {
    let key = LimitKey::UnknownGlobal;
    if !self.acquire(&key, now).await {
      tracing::info!(key = %key, "notification suppressed, window still open");
      return Ok(Outcome::Suppressed { key });
    }

    self
      .dispatcher
      .dispatch(unknown_visitor_notification(self.policy.approval_hint.as_deref()))
      .await
      .map_err(Error::dispatch)?;

    tracing::info!("operator notified of unknown visitor");
    Ok(Outcome::UnknownReported)
  }

  /// A rate-limiter error closes the window: the acquire is never retried,
  /// and the event is suppressed rather than risking a duplicate
  /// notification.
  async fn acquire(&self, key: &LimitKey, now: DateTime<Utc>) -> bool {
    let window = self.policy.notify_window;
    match self.limiter.try_acquire(key.clone(), window, now).await {
      Ok(acquired) => acquired,
      Err(error) => {
        tracing::warn!(key = %key, error = %error, "rate limiter error, treating window as closed");
        false
      }
    }
  }

  /// Directory reads get one retry; a second failure propagates.
  async fn directory_entry(
    &self,
    subject_id: SubjectId,
  ) -> Result<Option<DirectoryEntry>> {
    match self.directory.entry(subject_id.clone()).await {
      Ok(entry) => Ok(entry),
      Err(first) => {
        tracing::debug!(subject_id = %subject_id, error = %first, "directory read failed, retrying");
        self.directory.entry(subject_id).await.map_err(Error::directory)
      }
    }
  }
}

// ─── Notification bodies ─────────────────────────────────────────────────────

fn known_visitor_notification(entry: &DirectoryEntry, code: &str) -> Notification {
  Notification {
    audience:      Audience::Operator,
    subject_label: format!("Door passcode for {}", entry.display_name),
    body:          format!(
      "Hello {},\n\nYour one-time passcode is: {code}\n\nIt is valid for 5 minutes.",
      entry.display_name,
    ),
  }
}

fn unknown_visitor_notification(approval_hint: Option<&str>) -> Notification {
  let mut body = String::from("An unknown visitor was detected at the door.\n");
  if let Some(hint) = approval_hint {
    body.push_str(&format!(
      "\nTo approve this visitor and issue a passcode, open:\n{hint}\n"
    ));
  }
  Notification {
    audience:      Audience::Operator,
    subject_label: "Unknown visitor at the door".to_owned(),
    body,
  }
}
