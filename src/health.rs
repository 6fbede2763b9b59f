use anyhow::Result;
use serde::Serialize;

use crate::models::{
    DailyCount, GuildId, HealthComponents, HealthScore, TrendDirection, TrendResult,
};
use crate::period;
use crate::source::ActivitySource;

/// Component weights for the composite score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthWeights {
    pub activity: f64,
    pub engagement: f64,
    pub trend: f64,
    pub consistency: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            activity: 0.40,
            engagement: 0.30,
            trend: 0.20,
            consistency: 0.10,
        }
    }
}

impl HealthWeights {
    pub fn combine(&self, components: &HealthComponents) -> i64 {
        let weighted = self.activity * components.activity as f64
            + self.engagement * components.engagement as f64
            + self.trend * components.trend as f64
            + self.consistency * components.consistency as f64;
        (weighted.round() as i64).clamp(0, 100)
    }
}

/// Logarithmic scaling of average messages per day. Doubling a small
/// server's traffic moves the score more than doubling a large one's.
pub fn activity_score(avg_per_day: f64) -> i64 {
    if avg_per_day <= 0.0 {
        return 0;
    }
    if avg_per_day >= 100.0 {
        return 100;
    }
    let score = ((avg_per_day + 1.0).log10() / 2.0) * 100.0;
    (score.round() as i64).clamp(0, 100)
}

/// Messages per active author per week, ideal band [5, 20]. Below the
/// band scales linearly; above it a capped penalty applies, since a
/// handful of authors doing all the talking is not broad engagement.
pub fn engagement_score(avg_per_day: f64, active_authors: i64) -> i64 {
    if active_authors <= 0 {
        return 0;
    }
    let ratio = avg_per_day * 7.0 / active_authors as f64;
    let score = if ratio < 5.0 {
        ratio / 5.0 * 100.0
    } else if ratio <= 20.0 {
        100.0
    } else {
        100.0 - ((ratio - 20.0) * 1.33).min(40.0)
    };
    (score.round() as i64).clamp(0, 100)
}

/// Stable sits at 70; growth earns up to +30, decline costs up to -50
/// with a floor of 20.
pub fn trend_score(trend: &TrendResult) -> i64 {
    match trend.direction {
        TrendDirection::Stable => 70,
        TrendDirection::Up => (70.0 + (trend.percentage * 0.6).min(30.0)).round() as i64,
        TrendDirection::Down => (70.0 - trend.percentage.min(50.0)).max(20.0).round() as i64,
    }
}

/// Coefficient of variation of daily counts; steadier days score higher.
/// Fewer than two data points is treated as insufficient evidence.
pub fn consistency_score(daily: &[DailyCount]) -> i64 {
    if daily.len() < 2 {
        return 50;
    }
    let n = daily.len() as f64;
    let mean = daily.iter().map(|d| d.count as f64).sum::<f64>() / n;
    if mean == 0.0 {
        return 0;
    }
    let variance = daily
        .iter()
        .map(|d| {
            let diff = d.count as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    let cv = variance.sqrt() / mean;
    ((100.0 - cv * 50.0).round() as i64).max(0)
}

/// Classify the change between two period totals. More than 5% either
/// way counts as a move; a dead previous period with any current
/// activity reports as fully up.
pub fn compute_trend(current: i64, previous: i64) -> TrendResult {
    if previous <= 0 {
        return if current > 0 {
            TrendResult {
                direction: TrendDirection::Up,
                percentage: 100.0,
            }
        } else {
            TrendResult {
                direction: TrendDirection::Stable,
                percentage: 0.0,
            }
        };
    }
    let change = (current - previous) as f64 / previous as f64 * 100.0;
    let direction = if change > 5.0 {
        TrendDirection::Up
    } else if change < -5.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };
    TrendResult {
        direction,
        percentage: change.abs(),
    }
}

fn interpret(
    score: i64,
    trend: &TrendResult,
    avg_per_day: f64,
    active_authors: i64,
) -> String {
    let trend_phrase = match trend.direction {
        TrendDirection::Up => format!("up {:.0}% on the previous week", trend.percentage),
        TrendDirection::Down => format!("down {:.0}% on the previous week", trend.percentage),
        TrendDirection::Stable => "holding steady week over week".to_string(),
    };
    let base = format!(
        "averaging {avg_per_day:.1} messages/day from {active_authors} active members, {trend_phrase}"
    );
    if score >= 80 {
        format!("Excellent: the community is thriving, {base}.")
    } else if score >= 60 {
        format!("Good: healthy activity overall, {base}.")
    } else if score >= 40 {
        format!("Needs attention: activity is soft, {base}.")
    } else {
        format!("Critical: the community is struggling, {base}.")
    }
}

/// Score one guild from a 7-day activity window, a 7-day-over-7-day
/// trend, and 30 days of daily counts for consistency. Data-source
/// errors propagate; an empty guild scores 0 with its zero counts
/// attached so callers can tell "quiet" from "no data yet".
pub async fn calculate_health_score<S: ActivitySource>(
    source: &S,
    guild_id: GuildId,
) -> Result<HealthScore> {
    let pair = period::comparison_periods(7);
    let month = period::date_range(30);

    let (message_count, active_authors, previous_count, daily) = tokio::try_join!(
        source.message_count(guild_id, &pair.current),
        source.active_author_count(guild_id, &pair.current),
        source.message_count(guild_id, &pair.previous),
        source.daily_message_counts(guild_id, &month),
    )?;

    let avg_per_day = message_count as f64 / pair.current.days() as f64;
    let trend = compute_trend(message_count, previous_count);

    let components = HealthComponents {
        activity: activity_score(avg_per_day),
        engagement: engagement_score(avg_per_day, active_authors),
        trend: trend_score(&trend),
        consistency: consistency_score(&daily),
    };
    let weights = HealthWeights::default();
    let score = weights.combine(&components);

    tracing::debug!(
        guild_id,
        score,
        activity = components.activity,
        engagement = components.engagement,
        trend = components.trend,
        consistency = components.consistency,
        "health score computed"
    );

    Ok(HealthScore {
        score,
        interpretation: interpret(score, &trend, avg_per_day, active_authors),
        components,
        trend,
        avg_messages_per_day: avg_per_day,
        active_authors,
    })
}
