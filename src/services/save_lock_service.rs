use std::env;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::Document;
use thiserror::Error;

use crate::db::lock_store::LockStore;
use crate::db::StoreError;
use crate::services::staleness_service;

const SAVE_LOCK_TTL_MINUTES: i64 = 10;

#[derive(Clone)]
pub struct SaveLockConfig {
    /// Age past which a persisted marker is presumed orphaned by a save that
    /// never ran its cleanup path.
    pub ttl: Duration,
}

impl Default for SaveLockConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(SAVE_LOCK_TTL_MINUTES),
        }
    }
}

impl SaveLockConfig {
    pub fn from_env() -> Self {
        let minutes = env::var("SAVE_LOCK_TTL_MINUTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(SAVE_LOCK_TTL_MINUTES);

        Self {
            ttl: Duration::minutes(minutes),
        }
    }
}

#[derive(Debug, Error)]
pub enum SaveLockError {
    #[error("an itinerary save already appears to be in flight")]
    Busy,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Proof that `acquire` succeeded. Hand it back to `release` when the save
/// finishes.
#[derive(Debug)]
pub struct SaveLockToken {
    acquired_at: DateTime<Utc>,
}

impl SaveLockToken {
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum MarkerDisposition {
    Absent,
    Active,
    Stale,
    Unparseable,
}

/// What startup cleanup should do with a persisted marker. A payload that
/// does not parse can never be trusted, so it is discarded no matter how
/// young it is.
pub fn classify_marker(
    marker: Option<&Document>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> MarkerDisposition {
    let Some(doc) = marker else {
        return MarkerDisposition::Absent;
    };
    let Ok(raw) = doc.get_str("acquired_at") else {
        return MarkerDisposition::Unparseable;
    };
    let Ok(acquired_at) = DateTime::parse_from_rfc3339(raw) else {
        return MarkerDisposition::Unparseable;
    };

    if staleness_service::lock_stale(acquired_at.with_timezone(&Utc), now, ttl) {
        MarkerDisposition::Stale
    } else {
        MarkerDisposition::Active
    }
}

/// Advisory flag that keeps one process from running two itinerary saves at
/// once. It is a crash-recovery heuristic, not mutual exclusion: nothing
/// stops a second process from acquiring its own lock, and the embedded
/// timestamp exists so a human can tell how old a marker is.
pub struct AdvisorySaveLock {
    store: Arc<dyn LockStore>,
    config: SaveLockConfig,
    held: Mutex<Option<DateTime<Utc>>>,
}

impl AdvisorySaveLock {
    pub fn new(store: Arc<dyn LockStore>, config: SaveLockConfig) -> Self {
        Self {
            store,
            config,
            held: Mutex::new(None),
        }
    }

    /// Runs once per process start. A marker from a very recent prior
    /// session is preserved in case that save is genuinely still in flight.
    pub async fn cleanup_on_startup(&self) -> Result<(), StoreError> {
        let marker = self.store.load().await?;
        match classify_marker(marker.as_ref(), Utc::now(), self.config.ttl) {
            MarkerDisposition::Absent => {}
            MarkerDisposition::Active => {
                println!("Preserving save-lock marker from a recent session");
            }
            MarkerDisposition::Stale => {
                eprintln!("Discarding stale save-lock marker");
                self.store.clear().await?;
            }
            MarkerDisposition::Unparseable => {
                eprintln!("Discarding unparseable save-lock marker");
                self.store.clear().await?;
            }
        }
        Ok(())
    }

    pub async fn acquire(&self) -> Result<SaveLockToken, SaveLockError> {
        let now = Utc::now();
        {
            let mut held = self.held.lock().unwrap();
            if let Some(acquired_at) = *held {
                if !staleness_service::lock_stale(acquired_at, now, self.config.ttl) {
                    return Err(SaveLockError::Busy);
                }
                // A save that errored without releasing left this behind
                eprintln!("Reclaiming stale in-process save lock from {}", acquired_at);
            }
            *held = Some(now);
        }

        if let Err(err) = self.store.save(now).await {
            *self.held.lock().unwrap() = None;
            return Err(SaveLockError::Store(err));
        }

        Ok(SaveLockToken { acquired_at: now })
    }

    pub async fn release(&self, _token: SaveLockToken) -> Result<(), StoreError> {
        *self.held.lock().unwrap() = None;
        self.store.clear().await
    }
}
