use chrono::{DateTime, Duration, Utc};

use crate::models::job::JobStatus;

/// Whether a processing job should be presumed orphaned. The worker that
/// would normally move it to a terminal status can be killed without running
/// its cleanup path, so age since the last update is the only signal left.
pub fn job_abandoned(
    status: JobStatus,
    updated_at: DateTime<Utc>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> bool {
    status == JobStatus::Processing && now - updated_at >= threshold
}

/// Whether a persisted save-lock marker is old enough to discard. A marker
/// younger than the TTL may belong to a save that is genuinely in flight.
pub fn lock_stale(acquired_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - acquired_at >= ttl
}
