//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, TimeZone, Utc};

use postern_core::{
  passcode::Passcode,
  store::{CredentialStore, Directory, LimitKey, RateLimiter},
  subject::{DirectoryEntry, SubjectId},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn t0() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn after(seconds: i64) -> DateTime<Utc> {
  t0() + Duration::seconds(seconds)
}

fn window() -> Duration {
  Duration::seconds(300)
}

fn passcode(code: &str, subject: &str, expires_at: DateTime<Utc>) -> Passcode {
  Passcode {
    code:       code.to_owned(),
    subject_id: SubjectId::new(subject),
    expires_at,
  }
}

// ─── Rate limiter ────────────────────────────────────────────────────────────

#[tokio::test]
async fn acquire_on_a_fresh_key_succeeds() {
  let s = store().await;
  let acquired = s
    .try_acquire(LimitKey::Known("face-a".into()), window(), t0())
    .await
    .unwrap();
  assert!(acquired);
}

#[tokio::test]
async fn acquire_within_an_open_window_is_denied() {
  let s = store().await;
  let key = LimitKey::Known("face-a".into());

  assert!(s.try_acquire(key.clone(), window(), t0()).await.unwrap());
  assert!(!s.try_acquire(key.clone(), window(), after(1)).await.unwrap());
  assert!(!s.try_acquire(key.clone(), window(), after(299)).await.unwrap());
}

#[tokio::test]
async fn denied_acquires_do_not_extend_the_window() {
  let s = store().await;
  let key = LimitKey::Known("face-a".into());

  assert!(s.try_acquire(key.clone(), window(), t0()).await.unwrap());
  // Repeated denials must leave the original expiry in place...
  for seconds in [60, 120, 180, 240] {
    assert!(!s.try_acquire(key.clone(), window(), after(seconds)).await.unwrap());
  }
  // ...so the window still opens 300s after the first acquire.
  assert!(s.try_acquire(key.clone(), window(), after(300)).await.unwrap());
}

#[tokio::test]
async fn acquire_after_the_window_lapses_succeeds_and_resets() {
  let s = store().await;
  let key = LimitKey::UnknownGlobal;

  assert!(s.try_acquire(key.clone(), window(), t0()).await.unwrap());
  assert!(s.try_acquire(key.clone(), window(), after(301)).await.unwrap());
  // The second acquire opened a new window ending at 301 + 300.
  assert!(!s.try_acquire(key.clone(), window(), after(600)).await.unwrap());
  assert!(s.try_acquire(key.clone(), window(), after(601)).await.unwrap());
}

#[tokio::test]
async fn distinct_keys_do_not_interfere() {
  let s = store().await;

  assert!(
    s.try_acquire(LimitKey::Known("face-a".into()), window(), t0())
      .await
      .unwrap()
  );
  assert!(
    s.try_acquire(LimitKey::Known("face-b".into()), window(), t0())
      .await
      .unwrap()
  );
  assert!(s.try_acquire(LimitKey::UnknownGlobal, window(), t0()).await.unwrap());
}

#[tokio::test]
async fn concurrent_acquires_on_one_key_have_a_single_winner() {
  let s = store().await;
  let now = t0();

  let mut handles = Vec::new();
  for _ in 0..16 {
    let s = s.clone();
    handles.push(tokio::spawn(async move {
      s.try_acquire(LimitKey::UnknownGlobal, window(), now).await.unwrap()
    }));
  }

  let mut winners = 0;
  for handle in handles {
    if handle.await.unwrap() {
      winners += 1;
    }
  }
  assert_eq!(winners, 1);
}

// ─── Credential store ────────────────────────────────────────────────────────

#[tokio::test]
async fn put_and_get_round_trip() {
  let s = store().await;
  let stored = passcode("123456", "face-a", after(300));

  s.put(stored.clone()).await.unwrap();
  let found = s.get("123456".to_owned()).await.unwrap();
  assert_eq!(found, Some(stored));
}

#[tokio::test]
async fn get_missing_code_returns_none() {
  let s = store().await;
  let found = s.get("000000".to_owned()).await.unwrap();
  assert_eq!(found, None);
}

#[tokio::test]
async fn colliding_code_overwrites_the_earlier_record() {
  let s = store().await;

  s.put(passcode("123456", "face-a", after(300))).await.unwrap();
  s.put(passcode("123456", "face-b", after(400))).await.unwrap();

  let found = s.get("123456".to_owned()).await.unwrap().unwrap();
  assert_eq!(found.subject_id, SubjectId::new("face-b"));
  assert_eq!(found.expires_at, after(400));
}

#[tokio::test]
async fn invalidate_removes_the_record() {
  let s = store().await;
  s.put(passcode("123456", "face-a", after(300))).await.unwrap();

  s.invalidate("123456".to_owned()).await.unwrap();
  assert_eq!(s.get("123456".to_owned()).await.unwrap(), None);
}

#[tokio::test]
async fn get_returns_expired_records_verbatim() {
  // Validity is the caller's call; the store hands back whatever it holds.
  let s = store().await;
  let stale = passcode("123456", "face-a", t0());

  s.put(stale.clone()).await.unwrap();
  assert_eq!(s.get("123456".to_owned()).await.unwrap(), Some(stale));
}

// ─── Directory ───────────────────────────────────────────────────────────────

fn entry(subject: &str, name: &str) -> DirectoryEntry {
  DirectoryEntry {
    subject_id:   SubjectId::new(subject),
    display_name: name.to_owned(),
    contact_hint: None,
    created_at:   t0(),
  }
}

#[tokio::test]
async fn missing_entry_returns_none() {
  let s = store().await;
  assert_eq!(s.entry(SubjectId::new("face-z")).await.unwrap(), None);
}

#[tokio::test]
async fn placeholder_round_trip() {
  let s = store().await;
  let placeholder = entry("unknown-1714564800", "Carol");

  s.insert_placeholder(placeholder.clone()).await.unwrap();
  let found = s.entry(placeholder.subject_id.clone()).await.unwrap();
  assert_eq!(found, Some(placeholder));
}

#[tokio::test]
async fn placeholder_never_replaces_an_existing_entry() {
  let s = store().await;

  s.upsert_visitor(entry("face-a", "Alice")).await.unwrap();
  s.insert_placeholder(entry("face-a", "Impostor")).await.unwrap();

  let found = s.entry(SubjectId::new("face-a")).await.unwrap().unwrap();
  assert_eq!(found.display_name, "Alice");
}

#[tokio::test]
async fn upsert_replaces_name_and_contact() {
  let s = store().await;

  s.upsert_visitor(entry("face-a", "Alice")).await.unwrap();
  let mut updated = entry("face-a", "Alice Liddell");
  updated.contact_hint = Some("alice@example.com".to_owned());
  s.upsert_visitor(updated).await.unwrap();

  let found = s.entry(SubjectId::new("face-a")).await.unwrap().unwrap();
  assert_eq!(found.display_name, "Alice Liddell");
  assert_eq!(found.contact_hint.as_deref(), Some("alice@example.com"));
}

// ─── Expiry sweep ────────────────────────────────────────────────────────────

#[tokio::test]
async fn purge_drops_only_expired_rows() {
  let s = store().await;

  s.put(passcode("111111", "face-a", after(100))).await.unwrap();
  s.put(passcode("222222", "face-b", after(400))).await.unwrap();
  assert!(
    s.try_acquire(LimitKey::Known("face-a".into()), Duration::seconds(100), t0())
      .await
      .unwrap()
  );

  let purged = s.purge_expired(after(200)).await.unwrap();
  assert_eq!(purged, 2); // one passcode, one rate-limit row

  assert_eq!(s.get("111111".to_owned()).await.unwrap(), None);
  assert!(s.get("222222".to_owned()).await.unwrap().is_some());
  // The purged key is free again.
  assert!(
    s.try_acquire(LimitKey::Known("face-a".into()), window(), after(200))
      .await
      .unwrap()
  );
}
