//! Notification dispatch — the channel that reaches a human.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Who a notification is addressed to.
///
/// Passcodes for known visitors go to the operator, not the visitor: a
/// supervising human decides whether to pass the code on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
  Operator,
  Visitor,
}

/// A formatted message ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub audience:      Audience,
  /// Short line naming what the notification is about.
  pub subject_label: String,
  pub body:          String,
}

/// Delivers notifications to a human.
///
/// Best-effort from the engine's viewpoint: a failed dispatch is reported
/// but never retried by the caller. Retry policy, if any, belongs to the
/// implementation behind this trait.
pub trait Dispatcher: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn dispatch(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
