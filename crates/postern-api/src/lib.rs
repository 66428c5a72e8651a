//! JSON API for postern.
//!
//! Exposes an axum [`Router`] over the access engine, redemption, and
//! registration services, generic over the storage and dispatch traits.
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/events`   | Batch of decoded match events |
//! | `POST` | `/verify`   | Redeem a submitted passcode |
//! | `POST` | `/register` | Approve an unknown visitor |

pub mod error;
pub mod events;
pub mod register;
pub mod verify;

use std::sync::Arc;

use axum::{Router, routing::post};
use postern_core::{
  dispatch::Dispatcher,
  engine::AccessEngine,
  redeem::RedemptionService,
  register::RegistrationService,
  store::{CredentialStore, Directory, RateLimiter},
};

pub use error::ApiError;

/// Shared state threaded through all handlers.
///
/// The services are built over clones of the same backends, so they observe
/// one consistent world.
pub struct AppState<L, C, D, N>
where
  L: RateLimiter,
  C: CredentialStore,
  D: Directory,
  N: Dispatcher,
{
  pub engine:       Arc<AccessEngine<L, C, D, N>>,
  pub redemption:   Arc<RedemptionService<C, D>>,
  pub registration: Arc<RegistrationService<C, D, N>>,
}

// Not derived: the fields are all `Arc`s, so no `Clone` bound on the type
// parameters is needed.
impl<L, C, D, N> Clone for AppState<L, C, D, N>
where
  L: RateLimiter,
  C: CredentialStore,
  D: Directory,
  N: Dispatcher,
{
  fn clone(&self) -> Self {
    Self {
      engine:       Arc::clone(&self.engine),
      redemption:   Arc::clone(&self.redemption),
      registration: Arc::clone(&self.registration),
    }
  }
}

impl<L, C, D, N> AppState<L, C, D, N>
where
  L: RateLimiter,
  C: CredentialStore,
  D: Directory,
  N: Dispatcher,
{
  pub fn new(
    engine: AccessEngine<L, C, D, N>,
    redemption: RedemptionService<C, D>,
    registration: RegistrationService<C, D, N>,
  ) -> Self {
    Self {
      engine:       Arc::new(engine),
      redemption:   Arc::new(redemption),
      registration: Arc::new(registration),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<L, C, D, N>(state: AppState<L, C, D, N>) -> Router<()>
where
  L: RateLimiter + 'static,
  C: CredentialStore + 'static,
  D: Directory + 'static,
  N: Dispatcher + 'static,
{
  Router::new()
    .route("/events", post(events::ingest::<L, C, D, N>))
    .route("/verify", post(verify::handler::<L, C, D, N>))
    .route("/register", post(register::handler::<L, C, D, N>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
