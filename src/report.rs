use std::fmt::Write;

use crate::models::{Alert, GuildId, HealthScore, InsightsBundle, Recommendation};

pub fn build_report(
    guild_id: GuildId,
    health: &HealthScore,
    insights: &InsightsBundle,
    alerts: &[Alert],
    recommendations: &[Recommendation],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Community Health Report");
    let _ = writeln!(
        output,
        "Guild {} ({} to {})",
        guild_id, insights.window.start, insights.window.end
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Health Score: {}/100", health.score);
    let _ = writeln!(output, "{}", health.interpretation);
    let _ = writeln!(output);
    let _ = writeln!(output, "- Activity: {}", health.components.activity);
    let _ = writeln!(output, "- Engagement: {}", health.components.engagement);
    let _ = writeln!(output, "- Trend: {}", health.components.trend);
    let _ = writeln!(output, "- Consistency: {}", health.components.consistency);

    let _ = writeln!(output);
    let _ = writeln!(output, "## This Week");

    if insights.top_channels.is_empty() {
        let _ = writeln!(output, "No messages recorded for this window.");
    } else {
        let _ = writeln!(
            output,
            "{} messages from {} active members, {} posting for the first time.",
            insights.message_count, insights.active_authors, insights.new_authors
        );
        let _ = writeln!(output);
        let _ = writeln!(output, "Top channels:");
        for channel in insights.top_channels.iter() {
            let _ = writeln!(
                output,
                "- channel {}: {} messages",
                channel.channel_id, channel.count
            );
        }
        let _ = writeln!(output);
        let _ = writeln!(output, "Peak hours (UTC):");
        for slot in insights.peak_slots.iter() {
            let _ = writeln!(output, "- {}: {} messages", slot.label, slot.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alerts");

    if alerts.is_empty() {
        let _ = writeln!(output, "Nothing to flag this week.");
    } else {
        for alert in alerts.iter() {
            let _ = writeln!(
                output,
                "- [{}] {}: {}",
                alert.level.as_str(),
                alert.title,
                alert.description
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");

    if recommendations.is_empty() {
        let _ = writeln!(output, "Keep doing what you are doing.");
    } else {
        for rec in recommendations.iter() {
            let _ = writeln!(output, "- {}: {}", rec.title, rec.description);
            let _ = writeln!(output, "  Example: {}", rec.example);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AlertKind, AlertLevel, ChannelActivity, HealthComponents, TimeSlot, TimeWindow,
        TrendDirection, TrendResult,
    };
    use chrono::NaiveDate;

    fn sample_health() -> HealthScore {
        HealthScore {
            score: 72,
            components: HealthComponents {
                activity: 80,
                engagement: 70,
                trend: 70,
                consistency: 50,
            },
            trend: TrendResult {
                direction: TrendDirection::Stable,
                percentage: 2.0,
            },
            avg_messages_per_day: 34.0,
            active_authors: 11,
            interpretation: "Good: healthy activity overall.".to_string(),
        }
    }

    fn sample_insights() -> InsightsBundle {
        InsightsBundle {
            window: TimeWindow::new(
                NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
                NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            ),
            message_count: 238,
            active_authors: 11,
            new_authors: 3,
            top_channels: vec![ChannelActivity {
                channel_id: 42,
                count: 120,
            }],
            peak_slots: vec![TimeSlot {
                slot_start: 18,
                label: "18h-21h".to_string(),
                count: 77,
            }],
        }
    }

    #[test]
    fn report_contains_every_section() {
        let alerts = vec![Alert {
            kind: AlertKind::Channel,
            level: AlertLevel::Warning,
            title: "Channel going quiet".to_string(),
            description: "Channel 42 dropped 60%.".to_string(),
            channel_id: Some(42),
        }];
        let report = build_report(9001, &sample_health(), &sample_insights(), &alerts, &[]);

        assert!(report.contains("## Health Score: 72/100"));
        assert!(report.contains("238 messages from 11 active members"));
        assert!(report.contains("[WARNING] Channel going quiet"));
        assert!(report.contains("18h-21h: 77 messages"));
        assert!(report.contains("Keep doing what you are doing."));
    }

    #[test]
    fn empty_window_reads_as_no_data() {
        let mut insights = sample_insights();
        insights.top_channels.clear();
        insights.message_count = 0;
        let report = build_report(9001, &sample_health(), &insights, &[], &[]);
        assert!(report.contains("No messages recorded for this window."));
    }
}
