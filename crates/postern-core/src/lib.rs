//! Core types and trait definitions for the postern door-access engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod memory;
pub mod otp;
pub mod passcode;
pub mod redeem;
pub mod register;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
