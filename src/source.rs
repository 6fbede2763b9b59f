use anyhow::Result;

use crate::models::{ChannelActivity, DailyCount, GuildId, HourCount, TimeWindow};

/// Aggregate-query contract the analytics engine consumes.
///
/// The engine never touches raw message rows; any store that can answer
/// these six time-ranged questions works. The production implementation
/// runs relational queries (`db::ActivityStore`); tests use an in-memory
/// fixture. Errors are propagated to the caller unchanged.
pub trait ActivitySource {
    fn message_count(
        &self,
        guild_id: GuildId,
        window: &TimeWindow,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    /// Distinct authors who posted inside the window.
    fn active_author_count(
        &self,
        guild_id: GuildId,
        window: &TimeWindow,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    /// Per-channel message counts for the window, unsorted.
    fn channel_activity(
        &self,
        guild_id: GuildId,
        window: &TimeWindow,
    ) -> impl std::future::Future<Output = Result<Vec<ChannelActivity>>> + Send;

    /// Message counts grouped by hour of day (0-23).
    fn hourly_activity(
        &self,
        guild_id: GuildId,
        window: &TimeWindow,
    ) -> impl std::future::Future<Output = Result<Vec<HourCount>>> + Send;

    /// Distinct authors whose first message ever falls inside the window.
    fn new_authors_count(
        &self,
        guild_id: GuildId,
        window: &TimeWindow,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    /// Per-day message counts for the window, ordered by date.
    fn daily_message_counts(
        &self,
        guild_id: GuildId,
        window: &TimeWindow,
    ) -> impl std::future::Future<Output = Result<Vec<DailyCount>>> + Send;
}
