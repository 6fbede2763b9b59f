use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

pub type GuildId = i64;
pub type ChannelId = i64;
pub type AuthorId = i64;

/// Inclusive range of calendar days. Invariant: `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "window start must not follow its end");
        Self { start, end }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// UTC instant at which the window opens (start of `start`).
    pub fn start_datetime(&self) -> DateTime<Utc> {
        self.start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc()
    }

    /// First UTC instant after the window (start of the day after `end`).
    /// Queries treat the window as `[start_datetime, end_exclusive)`.
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        (self.end + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc()
    }
}

/// Adjacent equal-length windows: `previous` ends the day before
/// `current` begins.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PeriodComparison {
    pub current: TimeWindow,
    pub previous: TimeWindow,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    /// Absolute relative change, percent, always >= 0.
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthComponents {
    pub activity: i64,
    pub engagement: i64,
    pub trend: i64,
    pub consistency: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthScore {
    pub score: i64,
    pub components: HealthComponents,
    pub trend: TrendResult,
    pub avg_messages_per_day: f64,
    pub active_authors: i64,
    pub interpretation: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChannelActivity {
    pub channel_id: ChannelId,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSlot {
    pub slot_start: u32,
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsBundle {
    pub window: TimeWindow,
    pub message_count: i64,
    pub active_authors: i64,
    pub new_authors: i64,
    pub top_channels: Vec<ChannelActivity>,
    pub peak_slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Activity,
    Channel,
    Activation,
}

/// Severity in descending urgency; `rank` is the explicit sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Critical,
    Warning,
    Info,
}

impl AlertLevel {
    pub fn rank(&self) -> u8 {
        match self {
            AlertLevel::Critical => 0,
            AlertLevel::Warning => 1,
            AlertLevel::Info => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "CRITICAL",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Info => "INFO",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub level: AlertLevel,
    pub title: String,
    pub description: String,
    pub channel_id: Option<ChannelId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: &'static str,
    /// Lower value means more urgent.
    pub priority: u8,
    pub title: String,
    pub description: String,
    pub example: String,
    pub target_channel: Option<String>,
}

/// A channel that was meaningfully active in the previous period and has
/// since gone mostly silent.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuietChannel {
    pub channel_id: ChannelId,
    pub previous_count: i64,
    pub current_count: i64,
    pub drop_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_day_count_is_inclusive() {
        let window = TimeWindow::new(
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 7).unwrap(),
        );
        assert_eq!(window.days(), 7);
    }

    #[test]
    fn window_bounds_are_half_open() {
        let window = TimeWindow::new(
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 7).unwrap(),
        );
        assert_eq!(
            window.start_datetime().to_rfc3339(),
            "2026-03-01T00:00:00+00:00"
        );
        assert_eq!(
            window.end_exclusive().to_rfc3339(),
            "2026-03-08T00:00:00+00:00"
        );
    }

    #[test]
    fn severity_ranks_are_ordered() {
        assert!(AlertLevel::Critical.rank() < AlertLevel::Warning.rank());
        assert!(AlertLevel::Warning.rank() < AlertLevel::Info.rank());
    }
}
