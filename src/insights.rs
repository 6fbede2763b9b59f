use anyhow::Result;

use crate::models::{ChannelActivity, GuildId, HourCount, InsightsBundle, TimeSlot};
use crate::period;
use crate::source::ActivitySource;

pub const DEFAULT_INSIGHT_DAYS: i64 = 7;
const TOP_CHANNEL_COUNT: usize = 3;
const TOP_SLOT_COUNT: usize = 3;
const SLOT_HOURS: u32 = 3;

/// Busiest channels first; ties broken by ascending channel id so
/// rankings are reproducible.
pub fn top_channels(mut channels: Vec<ChannelActivity>, limit: usize) -> Vec<ChannelActivity> {
    channels.sort_by(|a, b| b.count.cmp(&a.count).then(a.channel_id.cmp(&b.channel_id)));
    channels.truncate(limit);
    channels
}

/// Bucket hour-of-day counts into fixed-size slots and rank them.
/// Slots with no recorded activity never appear.
pub fn peak_slots(hourly: &[HourCount], slot_hours: u32, limit: usize) -> Vec<TimeSlot> {
    let mut totals: std::collections::BTreeMap<u32, i64> = std::collections::BTreeMap::new();
    for row in hourly {
        let slot_start = row.hour - row.hour % slot_hours;
        *totals.entry(slot_start).or_insert(0) += row.count;
    }

    let mut slots: Vec<TimeSlot> = totals
        .into_iter()
        .map(|(slot_start, count)| TimeSlot {
            slot_start,
            label: slot_label(slot_start, slot_hours),
            count,
        })
        .collect();
    slots.sort_by(|a, b| b.count.cmp(&a.count).then(a.slot_start.cmp(&b.slot_start)));
    slots.truncate(limit);
    slots
}

fn slot_label(slot_start: u32, slot_hours: u32) -> String {
    format!("{:02}h-{:02}h", slot_start, (slot_start + slot_hours) % 24)
}

/// Summarize a window into rankable facts: top channels, peak posting
/// slots, and the count of authors whose first message ever landed in
/// the window. Empty `top_channels` is the caller's "no data" signal.
pub async fn get_insights<S: ActivitySource>(
    source: &S,
    guild_id: GuildId,
    days: i64,
) -> Result<InsightsBundle> {
    let window = period::date_range(days);

    let (message_count, active_authors, channels, hourly, new_authors) = tokio::try_join!(
        source.message_count(guild_id, &window),
        source.active_author_count(guild_id, &window),
        source.channel_activity(guild_id, &window),
        source.hourly_activity(guild_id, &window),
        source.new_authors_count(guild_id, &window),
    )?;

    Ok(InsightsBundle {
        window,
        message_count,
        active_authors,
        new_authors,
        top_channels: top_channels(channels, TOP_CHANNEL_COUNT),
        peak_slots: peak_slots(&hourly, SLOT_HOURS, TOP_SLOT_COUNT),
    })
}
