//! Handler for `POST /register` — approve an unknown visitor.

use axum::{Json, extract::State};
use chrono::Utc;
use postern_core::{
  dispatch::Dispatcher,
  register::Approval,
  store::{CredentialStore, Directory, RateLimiter},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
  pub display_name: Option<String>,
  pub note:         Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
  pub accepted: bool,
}

/// `POST /register` — body: `{"displayName":"...", "note":"..."}`.
///
/// A missing or empty display name is rejected before any store access.
pub async fn handler<L, C, D, N>(
  State(state): State<AppState<L, C, D, N>>,
  Json(body): Json<RegisterBody>,
) -> Result<Json<RegisterResponse>, ApiError>
where
  L: RateLimiter + 'static,
  C: CredentialStore + 'static,
  D: Directory + 'static,
  N: Dispatcher + 'static,
{
  let display_name = body
    .display_name
    .map(|name| name.trim().to_owned())
    .filter(|name| !name.is_empty())
    .ok_or_else(|| ApiError::BadRequest("displayName is required".to_owned()))?;

  state
    .registration
    .approve(Approval { display_name, note: body.note }, Utc::now())
    .await?;

  Ok(Json(RegisterResponse { accepted: true }))
}
