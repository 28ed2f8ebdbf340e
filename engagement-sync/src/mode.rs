use chrono::{DateTime, Duration, Utc};
use engagement_core::CoreConfig;

/// `catch_up` vs `incremental`, chosen per spec §4.2's normative rule.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectedMode {
    CatchUp { window_days: i64 },
    Incremental { cursor: Option<String> },
}

impl SelectedMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CatchUp { .. } => "catch_up",
            Self::Incremental { .. } => "incremental",
        }
    }
}

/// ```text
/// age = now - last_successful_sync
/// if last_successful_sync is null OR age > 36h:
///     mode = catch_up(window=30d)
/// else:
///     mode = incremental(cursor=stored_cursor_or_time_min)
/// ```
/// (spec §4.2, normative). The "skip if expiring within 1 hour" bug this
/// replaces is explicitly forbidden — token freshness is `acquire`'s job,
/// never a reason to skip a sync here.
pub fn select_mode(
    last_successful_sync: Option<DateTime<Utc>>,
    cursor: Option<String>,
    now: DateTime<Utc>,
    config: &CoreConfig,
) -> SelectedMode {
    let threshold = Duration::hours(config.catch_up_threshold_hours);
    let stale = match last_successful_sync {
        None => true,
        Some(last) => now - last > threshold,
    };

    if stale {
        SelectedMode::CatchUp {
            window_days: config.catch_up_window_days,
        }
    } else {
        SelectedMode::Incremental { cursor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_last_sync_is_catch_up() {
        let mode = select_mode(None, None, Utc::now(), &CoreConfig::default());
        assert_eq!(mode, SelectedMode::CatchUp { window_days: 30 });
    }

    #[test]
    fn stale_last_sync_is_catch_up() {
        let now = Utc::now();
        let last = now - Duration::hours(48);
        let mode = select_mode(Some(last), Some("cursor-1".into()), now, &CoreConfig::default());
        assert_eq!(mode, SelectedMode::CatchUp { window_days: 30 });
    }

    #[test]
    fn recent_last_sync_is_incremental() {
        let now = Utc::now();
        let last = now - Duration::hours(1);
        let mode = select_mode(Some(last), Some("cursor-1".into()), now, &CoreConfig::default());
        assert_eq!(
            mode,
            SelectedMode::Incremental {
                cursor: Some("cursor-1".into())
            }
        );
    }

    #[test]
    fn exactly_at_threshold_boundary_is_still_incremental() {
        let now = Utc::now();
        let last = now - Duration::hours(36);
        let mode = select_mode(Some(last), None, now, &CoreConfig::default());
        assert_eq!(mode, SelectedMode::Incremental { cursor: None });
    }
}
