use chrono::{DateTime, Duration, Utc};
use engagement_core::model::WorkQueueItem;

/// Exponential backoff for soft-failure retries (spec §4.2
/// `enqueue_retry`: "push a Work Queue Item with exponential backoff"),
/// e.g. transcript-not-yet-materialized. Base 1 minute, doubling per
/// attempt, capped at 24h so a perpetually-failing item doesn't starve
/// the queue indefinitely.
pub fn backoff_duration(attempts: u32) -> Duration {
    let capped_attempts = attempts.min(10);
    let minutes = 1i64.saturating_mul(1 << capped_attempts);
    Duration::minutes(minutes).min(Duration::hours(24))
}

/// Whether `item` has waited out its backoff and is eligible to be
/// reclaimed again.
pub fn is_due(item: &WorkQueueItem, now: DateTime<Utc>) -> bool {
    let due_at = item.created_at + backoff_duration(item.attempts);
    now >= due_at
}
