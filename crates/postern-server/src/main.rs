//! postern server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, wires the access engine, and serves the JSON
//! API.
//!
//! # Seeding the directory
//!
//! Known visitors are enrolled out of band. To record one locally:
//!
//! ```
//! cargo run -p postern-server -- --add-visitor '<faceId>:Alice'
//! ```

mod dispatch;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use postern_api::AppState;
use postern_core::{
  engine::{AccessEngine, EnginePolicy},
  redeem::{RedemptionPolicy, RedemptionService},
  register::RegistrationService,
  subject::{DirectoryEntry, SubjectId},
};
use postern_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use dispatch::ServerDispatcher;

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
struct ServerConfig {
  host:       String,
  port:       u16,
  store_path: PathBuf,

  /// Deliver notifications by POSTing them as JSON to this URL. When
  /// unset, notifications go to the log only.
  webhook_url: Option<String>,

  /// Approval-page location included in unknown-visitor notifications.
  approval_url: Option<String>,

  /// Delete codes on first successful redemption.
  #[serde(default)]
  single_use_codes: bool,
}

#[derive(Parser)]
#[command(author, version, about = "postern door-access notification server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Record a directory entry (`<subjectId>:<display name>`) and exit.
  #[arg(long, value_name = "ID:NAME")]
  add_visitor: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("POSTERN"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open the SQLite store.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", server_cfg.store_path)
    })?;

  // Helper mode: seed a known visitor and exit.
  if let Some(pair) = cli.add_visitor {
    let (id, name) = pair
      .split_once(':')
      .context("expected `<subjectId>:<display name>`")?;
    store
      .upsert_visitor(DirectoryEntry {
        subject_id:   SubjectId::new(id),
        display_name: name.to_owned(),
        contact_hint: None,
        created_at:   chrono::Utc::now(),
      })
      .await
      .context("failed to record visitor")?;
    println!("recorded visitor {id}");
    return Ok(());
  }

  // Select the notification channel.
  let dispatcher = match &server_cfg.webhook_url {
    Some(url) => ServerDispatcher::webhook(url.clone())?,
    None => ServerDispatcher::log(),
  };

  let policy = EnginePolicy {
    approval_hint: server_cfg.approval_url.clone(),
    ..EnginePolicy::default()
  };

  // Build application state. All services share the one store.
  let state = AppState::new(
    AccessEngine::new(
      store.clone(),
      store.clone(),
      store.clone(),
      dispatcher.clone(),
      policy,
    ),
    RedemptionService::new(
      store.clone(),
      store.clone(),
      RedemptionPolicy { single_use: server_cfg.single_use_codes },
    ),
    RegistrationService::new(store.clone(), store.clone(), dispatcher),
  );

  // Hourly sweep of expired rows; lookups never depend on it.
  {
    let store = store.clone();
    tokio::spawn(async move {
      let mut tick =
        tokio::time::interval(std::time::Duration::from_secs(3600));
      loop {
        tick.tick().await;
        match store.purge_expired(chrono::Utc::now()).await {
          Ok(0) => {}
          Ok(purged) => tracing::debug!(purged, "swept expired rows"),
          Err(error) => tracing::warn!(error = %error, "expiry sweep failed"),
        }
      }
    });
  }

  let app = postern_api::api_router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
