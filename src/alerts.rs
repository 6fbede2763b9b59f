use anyhow::Result;
use serde::Serialize;

use crate::health::compute_trend;
use crate::models::{
    Alert, AlertKind, AlertLevel, ChannelActivity, GuildId, TrendDirection,
};
use crate::period;
use crate::source::ActivitySource;

/// Tuning knobs for the alert rules. Percentages are drops relative to
/// the previous 7-day period.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AlertThresholds {
    /// Guild-wide drop that raises an alert at all.
    pub activity_drop_percent: f64,
    /// Guild-wide drop that escalates to CRITICAL.
    pub activity_critical_percent: f64,
    /// Previous-period floor below which a channel is too small to judge.
    pub channel_min_previous: i64,
    /// Per-channel drop that raises an alert.
    pub channel_drop_percent: f64,
    /// Per-channel drop that escalates to CRITICAL.
    pub channel_critical_percent: f64,
    /// Current-period message volume above which silence from newcomers
    /// is worth flagging.
    pub activation_min_messages: i64,
    /// Maximum first-time authors still considered "stagnant".
    pub activation_max_new_authors: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            activity_drop_percent: 30.0,
            activity_critical_percent: 50.0,
            channel_min_previous: 50,
            channel_drop_percent: 50.0,
            channel_critical_percent: 80.0,
            activation_min_messages: 50,
            activation_max_new_authors: 1,
        }
    }
}

/// Rule evaluation over already-fetched period aggregates. Rules run in
/// a fixed order (guild-wide, per-channel, activation) and the result is
/// stable-sorted by severity, so equal-severity alerts keep that order.
pub fn evaluate_alerts(
    current_total: i64,
    previous_total: i64,
    current_channels: &[ChannelActivity],
    previous_channels: &[ChannelActivity],
    new_authors: i64,
    thresholds: &AlertThresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    let trend = compute_trend(current_total, previous_total);
    if trend.direction == TrendDirection::Down
        && trend.percentage >= thresholds.activity_drop_percent
    {
        let level = if trend.percentage >= thresholds.activity_critical_percent {
            AlertLevel::Critical
        } else {
            AlertLevel::Warning
        };
        alerts.push(Alert {
            kind: AlertKind::Activity,
            level,
            title: "Server activity is dropping".to_string(),
            description: format!(
                "Messages are down {:.0}% versus the previous 7 days ({} vs {}).",
                trend.percentage, current_total, previous_total
            ),
            channel_id: None,
        });
    }

    let current_by_channel: std::collections::HashMap<i64, i64> = current_channels
        .iter()
        .map(|c| (c.channel_id, c.count))
        .collect();
    for previous in previous_channels {
        if previous.count < thresholds.channel_min_previous {
            continue;
        }
        let current = current_by_channel
            .get(&previous.channel_id)
            .copied()
            .unwrap_or(0);
        let drop_percent = (previous.count - current) as f64 / previous.count as f64 * 100.0;
        if drop_percent >= thresholds.channel_drop_percent {
            let level = if drop_percent >= thresholds.channel_critical_percent {
                AlertLevel::Critical
            } else {
                AlertLevel::Warning
            };
            alerts.push(Alert {
                kind: AlertKind::Channel,
                level,
                title: "Channel going quiet".to_string(),
                description: format!(
                    "Channel {} dropped {:.0}% versus the previous 7 days ({} vs {}).",
                    previous.channel_id, drop_percent, current, previous.count
                ),
                channel_id: Some(previous.channel_id),
            });
        }
    }

    if current_total > thresholds.activation_min_messages
        && new_authors <= thresholds.activation_max_new_authors
    {
        alerts.push(Alert {
            kind: AlertKind::Activation,
            level: AlertLevel::Info,
            title: "New members are not activating".to_string(),
            description: format!(
                "{} messages this week but only {} first-time poster(s).",
                current_total, new_authors
            ),
            channel_id: None,
        });
    }

    alerts.sort_by_key(|a| a.level.rank());
    alerts
}

/// Evaluate the alert rules against the last 7 days versus the 7 days
/// before. Freshly computed every call; suppression of repeats is the
/// caller's business.
pub async fn generate_alerts<S: ActivitySource>(
    source: &S,
    guild_id: GuildId,
    thresholds: &AlertThresholds,
) -> Result<Vec<Alert>> {
    let pair = period::comparison_periods(7);

    let (current_total, previous_total, current_channels, previous_channels, new_authors) =
        tokio::try_join!(
            source.message_count(guild_id, &pair.current),
            source.message_count(guild_id, &pair.previous),
            source.channel_activity(guild_id, &pair.current),
            source.channel_activity(guild_id, &pair.previous),
            source.new_authors_count(guild_id, &pair.current),
        )?;

    let alerts = evaluate_alerts(
        current_total,
        previous_total,
        &current_channels,
        &previous_channels,
        new_authors,
        thresholds,
    );
    if !alerts.is_empty() {
        tracing::debug!(guild_id, count = alerts.len(), "alerts raised");
    }
    Ok(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fixture::{FixtureMessage, FixtureSource};
    use chrono::{Duration, Utc};

    fn chan(channel_id: i64, count: i64) -> ChannelActivity {
        ChannelActivity { channel_id, count }
    }

    fn defaults() -> AlertThresholds {
        AlertThresholds::default()
    }

    #[test]
    fn sixty_percent_channel_drop_is_a_single_warning() {
        // Guild totals stay flat so only the channel rule can fire.
        let alerts = evaluate_alerts(
            960,
            1000,
            &[chan(5, 40), chan(6, 920)],
            &[chan(5, 100), chan(6, 900)],
            10,
            &defaults(),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Channel);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(alerts[0].channel_id, Some(5));
    }

    #[test]
    fn eighty_five_percent_channel_drop_is_critical() {
        let alerts = evaluate_alerts(
            945,
            1000,
            &[chan(5, 15), chan(6, 930)],
            &[chan(5, 100), chan(6, 900)],
            10,
            &defaults(),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
    }

    #[test]
    fn small_channels_are_ignored() {
        let alerts = evaluate_alerts(
            980,
            1000,
            &[chan(5, 0), chan(6, 980)],
            &[chan(5, 49), chan(6, 951)],
            10,
            &defaults(),
        );
        assert!(alerts.is_empty());
    }

    #[test]
    fn vanished_channel_counts_as_full_drop() {
        let alerts = evaluate_alerts(
            960,
            1000,
            &[chan(6, 960)],
            &[chan(5, 60), chan(6, 940)],
            10,
            &defaults(),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
        assert_eq!(alerts[0].channel_id, Some(5));
    }

    #[test]
    fn guild_drop_of_fifty_five_percent_is_one_critical_alert() {
        let alerts = evaluate_alerts(450, 1000, &[], &[], 10, &defaults());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Activity);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
    }

    #[test]
    fn guild_drop_of_forty_percent_is_a_warning() {
        let alerts = evaluate_alerts(600, 1000, &[], &[], 10, &defaults());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
    }

    #[test]
    fn mild_guild_drop_stays_quiet() {
        let alerts = evaluate_alerts(750, 1000, &[], &[], 10, &defaults());
        assert!(alerts.is_empty());
    }

    #[test]
    fn stagnant_activation_is_an_info_alert() {
        let alerts = evaluate_alerts(60, 60, &[], &[], 1, &defaults());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Activation);
        assert_eq!(alerts[0].level, AlertLevel::Info);
    }

    #[test]
    fn activation_rule_needs_real_volume() {
        assert!(evaluate_alerts(50, 50, &[], &[], 0, &defaults()).is_empty());
        assert!(evaluate_alerts(60, 60, &[], &[], 2, &defaults()).is_empty());
    }

    #[test]
    fn alerts_sort_by_severity_and_keep_generation_order() {
        // Guild down 40% (warning), one channel down 90% (critical),
        // one channel down 60% (warning), no new authors (info).
        let alerts = evaluate_alerts(
            600,
            1000,
            &[chan(5, 10), chan(6, 40)],
            &[chan(5, 100), chan(6, 100)],
            0,
            &defaults(),
        );
        let levels: Vec<u8> = alerts.iter().map(|a| a.level.rank()).collect();
        assert_eq!(levels, vec![0, 1, 1, 2]);
        // Within the warnings, the guild-wide rule precedes the channel rule.
        assert_eq!(alerts[1].kind, AlertKind::Activity);
        assert_eq!(alerts[2].kind, AlertKind::Channel);
        assert_eq!(alerts[2].channel_id, Some(6));
    }

    #[tokio::test]
    async fn generate_alerts_reads_adjacent_weeks() {
        let today = Utc::now().date_naive();
        let mut messages = Vec::new();
        // Channel 9 was busy last week and died this week.
        for back in 7..14 {
            for i in 0..10 {
                messages.push(FixtureMessage {
                    channel_id: 9,
                    author_id: i,
                    date: today - Duration::days(back),
                    hour: 12,
                });
            }
        }
        for back in 0..7 {
            messages.push(FixtureMessage {
                channel_id: 9,
                author_id: 1,
                date: today - Duration::days(back),
                hour: 12,
            });
        }
        let source = FixtureSource::new(messages);

        let alerts = generate_alerts(&source, 1, &defaults()).await.unwrap();
        // 70 -> 7 messages: guild-wide critical drop and a critical
        // channel drop for channel 9.
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().any(|a| a.kind == AlertKind::Activity));
        assert!(alerts
            .iter()
            .any(|a| a.kind == AlertKind::Channel && a.channel_id == Some(9)));
    }

    #[tokio::test]
    async fn data_source_failure_propagates() {
        let source = FixtureSource::failing();
        assert!(generate_alerts(&source, 1, &defaults()).await.is_err());
    }
}
