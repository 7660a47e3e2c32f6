use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// An interval whose first tick fires one `period` from now rather than immediately.
///
/// Ticks missed while the session was busy are skipped instead of fired in a burst.
pub fn ticker(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

/// Wait for the next tick of an optional timer; a stopped timer never ticks.
pub async fn next_tick(timer: &mut Option<Interval>) -> Instant {
    match timer {
        Some(timer) => timer.tick().await,
        None => std::future::pending().await,
    }
}

/// Parse durations such as `5s` or `1500ms` from configuration.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}
