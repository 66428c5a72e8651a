//! Handler for `POST /verify` — redeem a submitted passcode.

use axum::{Json, extract::State};
use chrono::Utc;
use postern_core::{
  dispatch::Dispatcher,
  redeem::Redemption,
  store::{CredentialStore, Directory, RateLimiter},
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  pub code: Option<String>,
}

/// `POST /verify` — body: `{"code":"123456"}`.
///
/// A missing or empty code is rejected before any store access.
pub async fn handler<L, C, D, N>(
  State(state): State<AppState<L, C, D, N>>,
  Json(body): Json<VerifyBody>,
) -> Result<Json<Redemption>, ApiError>
where
  L: RateLimiter + 'static,
  C: CredentialStore + 'static,
  D: Directory + 'static,
  N: Dispatcher + 'static,
{
  let code = body
    .code
    .as_deref()
    .map(str::trim)
    .filter(|code| !code.is_empty())
    .ok_or_else(|| ApiError::BadRequest("code is required".to_owned()))?;

  let redemption = state.redemption.redeem(code, Utc::now()).await?;
  Ok(Json(redemption))
}
