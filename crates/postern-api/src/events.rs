//! Handler for `POST /events` — ingest a batch of match events.

use axum::{Json, extract::State};
use postern_core::{
  dispatch::Dispatcher,
  engine::BatchSummary,
  event::MatchEvent,
  store::{CredentialStore, Directory, RateLimiter},
  subject::SubjectId,
};
use serde::Deserialize;

use crate::AppState;

/// One event as the recognition pipeline posts it. A present `subjectId`
/// marks a known match; an empty object is an unknown visitor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
  pub subject_id: Option<String>,
  pub confidence: Option<f64>,
}

impl From<EventBody> for MatchEvent {
  fn from(body: EventBody) -> Self {
    match body.subject_id {
      Some(id) => MatchEvent::Known {
        subject_id: SubjectId::new(id),
        confidence: body.confidence.unwrap_or(0.0),
      },
      None => MatchEvent::Unknown,
    }
  }
}

/// `POST /events` — body: JSON array of events, processed in order.
///
/// Always answers 200 with the batch counts: per-event failures are
/// isolated inside the engine and show up in `failed`.
pub async fn ingest<L, C, D, N>(
  State(state): State<AppState<L, C, D, N>>,
  Json(events): Json<Vec<EventBody>>,
) -> Json<BatchSummary>
where
  L: RateLimiter + 'static,
  C: CredentialStore + 'static,
  D: Directory + 'static,
  N: Dispatcher + 'static,
{
  let events: Vec<MatchEvent> = events.into_iter().map(Into::into).collect();
  Json(state.engine.process_batch(events).await)
}
