use anyhow::Result;
use serde::Serialize;

use crate::alerts::{self, AlertThresholds};
use crate::health;
use crate::insights::{self, DEFAULT_INSIGHT_DAYS};
use crate::models::{
    Alert, AlertKind, AlertLevel, ChannelActivity, GuildId, HealthScore, InsightsBundle,
    QuietChannel, Recommendation, TrendDirection,
};
use crate::period;
use crate::source::ActivitySource;

pub const MAX_RECOMMENDATIONS: usize = 5;

/// When a previously active channel counts as "gone quiet": it had at
/// least `min_previous` messages and now runs below `current_ratio` of
/// that.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuietChannelRule {
    pub min_previous: i64,
    pub current_ratio: f64,
}

impl Default for QuietChannelRule {
    fn default() -> Self {
        Self {
            min_previous: 10,
            current_ratio: 0.3,
        }
    }
}

/// Everything the templates get to look at.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationContext {
    pub health: HealthScore,
    pub insights: InsightsBundle,
    pub alerts: Vec<Alert>,
    pub quiet_channels: Vec<QuietChannel>,
}

/// One condition-to-action rule. Templates are discrete types so each
/// rule is enumerable and unit-testable on its own; a failing rule is
/// logged and skipped without touching the others.
pub trait Template {
    fn id(&self) -> &'static str;
    fn priority(&self) -> u8;
    fn matches(&self, ctx: &RecommendationContext) -> Result<bool>;
    fn build(&self, ctx: &RecommendationContext) -> Result<Recommendation>;
}

pub fn derive_quiet_channels(
    current: &[ChannelActivity],
    previous: &[ChannelActivity],
    rule: &QuietChannelRule,
) -> Vec<QuietChannel> {
    let current_by_channel: std::collections::HashMap<i64, i64> =
        current.iter().map(|c| (c.channel_id, c.count)).collect();

    let mut quiet: Vec<QuietChannel> = previous
        .iter()
        .filter(|p| p.count >= rule.min_previous)
        .filter_map(|p| {
            let now = current_by_channel.get(&p.channel_id).copied().unwrap_or(0);
            if (now as f64) < p.count as f64 * rule.current_ratio {
                Some(QuietChannel {
                    channel_id: p.channel_id,
                    previous_count: p.count,
                    current_count: now,
                    drop_percent: (p.count - now) as f64 / p.count as f64 * 100.0,
                })
            } else {
                None
            }
        })
        .collect();

    quiet.sort_by(|a, b| {
        b.drop_percent
            .partial_cmp(&a.drop_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.channel_id.cmp(&b.channel_id))
    });
    quiet
}

struct ReverseDecline;

impl Template for ReverseDecline {
    fn id(&self) -> &'static str {
        "reverse-decline"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn matches(&self, ctx: &RecommendationContext) -> Result<bool> {
        Ok(ctx
            .alerts
            .iter()
            .any(|a| a.kind == AlertKind::Activity && a.level == AlertLevel::Critical))
    }

    fn build(&self, ctx: &RecommendationContext) -> Result<Recommendation> {
        Ok(Recommendation {
            id: self.id(),
            priority: self.priority(),
            title: "Pull the community back in".to_string(),
            description: format!(
                "Activity fell {:.0}% in a week. Run a time-boxed event to give people a reason to return.",
                ctx.health.trend.percentage
            ),
            example: "Announce a weekend game night or AMA with a fixed date and ping @everyone once."
                .to_string(),
            target_channel: None,
        })
    }
}

struct ReviveQuietChannel;

impl Template for ReviveQuietChannel {
    fn id(&self) -> &'static str {
        "revive-quiet-channel"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn matches(&self, ctx: &RecommendationContext) -> Result<bool> {
        Ok(!ctx.quiet_channels.is_empty())
    }

    fn build(&self, ctx: &RecommendationContext) -> Result<Recommendation> {
        let quiet = ctx
            .quiet_channels
            .first()
            .ok_or_else(|| anyhow::anyhow!("no quiet channel to build from"))?;
        Ok(Recommendation {
            id: self.id(),
            priority: self.priority(),
            title: "Revive a channel that went quiet".to_string(),
            description: format!(
                "Channel {} went from {} messages to {} week over week. Seed it with a fresh topic or fold it into a busier channel.",
                quiet.channel_id, quiet.previous_count, quiet.current_count
            ),
            example: "Post a discussion starter there and cross-link it from your busiest channel."
                .to_string(),
            target_channel: Some(quiet.channel_id.to_string()),
        })
    }
}

struct SparkEngagement;

impl Template for SparkEngagement {
    fn id(&self) -> &'static str {
        "spark-engagement"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn matches(&self, ctx: &RecommendationContext) -> Result<bool> {
        Ok(ctx.health.components.engagement < 40 && ctx.health.active_authors > 0)
    }

    fn build(&self, ctx: &RecommendationContext) -> Result<Recommendation> {
        Ok(Recommendation {
            id: self.id(),
            priority: self.priority(),
            title: "Get lurkers talking".to_string(),
            description: format!(
                "Your {} active members post little per head. Low-effort prompts convert lurkers better than announcements.",
                ctx.health.active_authors
            ),
            example: "Try a daily question thread: \"What are you working on this week?\"".to_string(),
            target_channel: None,
        })
    }
}

struct WelcomeNewcomers;

impl Template for WelcomeNewcomers {
    fn id(&self) -> &'static str {
        "welcome-newcomers"
    }

    fn priority(&self) -> u8 {
        4
    }

    fn matches(&self, ctx: &RecommendationContext) -> Result<bool> {
        Ok(ctx.insights.message_count > 50 && ctx.insights.new_authors <= 1)
    }

    fn build(&self, ctx: &RecommendationContext) -> Result<Recommendation> {
        Ok(Recommendation {
            id: self.id(),
            priority: self.priority(),
            title: "Help first-timers post".to_string(),
            description: format!(
                "Only {} first-time poster(s) despite {} messages this week. Newcomers are reading but not joining in.",
                ctx.insights.new_authors, ctx.insights.message_count
            ),
            example: "Add an introductions channel and greet every new member by name within a day."
                .to_string(),
            target_channel: None,
        })
    }
}

struct StabilizeRhythm;

impl Template for StabilizeRhythm {
    fn id(&self) -> &'static str {
        "stabilize-rhythm"
    }

    fn priority(&self) -> u8 {
        5
    }

    fn matches(&self, ctx: &RecommendationContext) -> Result<bool> {
        Ok(ctx.health.components.consistency < 40 && ctx.insights.message_count > 0)
    }

    fn build(&self, _ctx: &RecommendationContext) -> Result<Recommendation> {
        Ok(Recommendation {
            id: self.id(),
            priority: self.priority(),
            title: "Smooth out the activity spikes".to_string(),
            description: "Activity arrives in bursts with dead days between. A predictable rhythm keeps people checking in daily.".to_string(),
            example: "Pick one recurring fixture, like a Friday showcase, and run it at the same time every week.".to_string(),
            target_channel: None,
        })
    }
}

struct DiversifyChannels;

impl Template for DiversifyChannels {
    fn id(&self) -> &'static str {
        "diversify-channels"
    }

    fn priority(&self) -> u8 {
        6
    }

    fn matches(&self, ctx: &RecommendationContext) -> Result<bool> {
        let top = match ctx.insights.top_channels.first() {
            Some(top) => top,
            None => return Ok(false),
        };
        Ok(ctx.insights.message_count > 0
            && top.count as f64 / ctx.insights.message_count as f64 > 0.6)
    }

    fn build(&self, ctx: &RecommendationContext) -> Result<Recommendation> {
        let top = ctx
            .insights
            .top_channels
            .first()
            .ok_or_else(|| anyhow::anyhow!("no top channel to build from"))?;
        Ok(Recommendation {
            id: self.id(),
            priority: self.priority(),
            title: "Spread conversation beyond one channel".to_string(),
            description: format!(
                "Channel {} carries over 60% of all messages. Single-channel servers stall when that channel has an off week.",
                top.channel_id
            ),
            example: "Move recurring topics into their own channels and link them from the busy one."
                .to_string(),
            target_channel: Some(top.channel_id.to_string()),
        })
    }
}

struct CelebrateMomentum;

impl Template for CelebrateMomentum {
    fn id(&self) -> &'static str {
        "celebrate-momentum"
    }

    fn priority(&self) -> u8 {
        7
    }

    fn matches(&self, ctx: &RecommendationContext) -> Result<bool> {
        Ok(ctx.health.trend.direction == TrendDirection::Up
            && ctx.health.trend.percentage >= 20.0
            && ctx.health.score >= 60)
    }

    fn build(&self, ctx: &RecommendationContext) -> Result<Recommendation> {
        Ok(Recommendation {
            id: self.id(),
            priority: self.priority(),
            title: "Lock in the growth".to_string(),
            description: format!(
                "Activity is up {:.0}% week over week. Capture the new arrivals before the spike fades.",
                ctx.health.trend.percentage
            ),
            example: "Pin a what's-happening post and invite active newcomers to help run the next event.".to_string(),
            target_channel: None,
        })
    }
}

fn built_in_templates() -> Vec<Box<dyn Template + Send + Sync>> {
    vec![
        Box::new(ReverseDecline),
        Box::new(ReviveQuietChannel),
        Box::new(SparkEngagement),
        Box::new(WelcomeNewcomers),
        Box::new(StabilizeRhythm),
        Box::new(DiversifyChannels),
        Box::new(CelebrateMomentum),
    ]
}

/// Check every template, keep the matches, and return the five most
/// urgent by priority (stable). A template that fails is logged and
/// dropped; the rest of the batch is unaffected.
pub fn evaluate_templates(
    templates: &[Box<dyn Template + Send + Sync>],
    ctx: &RecommendationContext,
) -> Vec<Recommendation> {
    let mut matched = Vec::new();
    for template in templates {
        let hit = match template.matches(ctx) {
            Ok(hit) => hit,
            Err(error) => {
                tracing::warn!(template = template.id(), %error, "template check failed, skipping");
                continue;
            }
        };
        if !hit {
            continue;
        }
        match template.build(ctx) {
            Ok(recommendation) => matched.push(recommendation),
            Err(error) => {
                tracing::warn!(template = template.id(), %error, "template build failed, skipping");
            }
        }
    }
    matched.sort_by_key(|r| r.priority);
    matched.truncate(MAX_RECOMMENDATIONS);
    matched
}

/// Assemble the metrics bundle for one guild and run the template table
/// over it. Returns at most five recommendations, most urgent first.
pub async fn generate_recommendations<S: ActivitySource>(
    source: &S,
    guild_id: GuildId,
) -> Result<Vec<Recommendation>> {
    let thresholds = AlertThresholds::default();
    let (health, insights, alerts) = tokio::try_join!(
        health::calculate_health_score(source, guild_id),
        insights::get_insights(source, guild_id, DEFAULT_INSIGHT_DAYS),
        alerts::generate_alerts(source, guild_id, &thresholds),
    )?;

    let pair = period::comparison_periods(7);
    let (current_channels, previous_channels) = tokio::try_join!(
        source.channel_activity(guild_id, &pair.current),
        source.channel_activity(guild_id, &pair.previous),
    )?;
    let quiet_channels = derive_quiet_channels(
        &current_channels,
        &previous_channels,
        &QuietChannelRule::default(),
    );

    let ctx = RecommendationContext {
        health,
        insights,
        alerts,
        quiet_channels,
    };
    Ok(evaluate_templates(&built_in_templates(), &ctx))
}
