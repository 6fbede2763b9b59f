use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AuthorId, ChannelActivity, ChannelId, DailyCount, GuildId, HourCount, TimeWindow,
};
use crate::source::ActivitySource;

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Two weeks of realistic traffic for one fixture guild: a busy general
/// channel, a smaller help channel, and a handful of regulars plus a
/// newcomer this week. Re-runnable; `source_key` keeps it idempotent.
pub async fn seed(pool: &PgPool) -> Result<()> {
    const GUILD: GuildId = 9001;
    const GENERAL: ChannelId = 100;
    const HELP: ChannelId = 101;
    let regulars: [AuthorId; 6] = [500, 501, 502, 503, 504, 505];

    let now = Utc::now();
    for back in 0..14i64 {
        let day = now - Duration::days(back);
        for n in 0..30i64 {
            let author = regulars[(n % regulars.len() as i64) as usize];
            let channel = if n % 5 == 0 { HELP } else { GENERAL };
            let posted_at = day - Duration::hours(n % 12) - Duration::minutes(n * 7 % 60);
            insert_message(
                pool,
                GUILD,
                channel,
                author,
                posted_at,
                &format!("seed-{back}-{n}"),
            )
            .await?;
        }
    }

    // One genuine first-time poster in the current week.
    insert_message(
        pool,
        GUILD,
        GENERAL,
        777,
        now - Duration::days(1),
        "seed-newcomer",
    )
    .await?;

    Ok(())
}

async fn insert_message(
    pool: &PgPool,
    guild_id: GuildId,
    channel_id: ChannelId,
    author_id: AuthorId,
    posted_at: DateTime<Utc>,
    source_key: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO guild_pulse.messages
        (id, guild_id, channel_id, author_id, posted_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(guild_id)
    .bind(channel_id)
    .bind(author_id)
    .bind(posted_at)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(())
}

/// Import historical message records from a CSV export. Rows carry an
/// optional `source_key` for dedupe; rows without one get a fresh key
/// and always insert.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        guild_id: GuildId,
        channel_id: ChannelId,
        author_id: AuthorId,
        posted_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let outcome = sqlx::query(
            r#"
            INSERT INTO guild_pulse.messages
            (id, guild_id, channel_id, author_id, posted_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.guild_id)
        .bind(row.channel_id)
        .bind(row.author_id)
        .bind(row.posted_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if outcome.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Postgres-backed [`ActivitySource`]. Every query is a single aggregate
/// over the messages table, bounded by the window's half-open UTC range.
#[derive(Debug, Clone)]
pub struct ActivityStore {
    pool: PgPool,
}

impl ActivityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ActivitySource for ActivityStore {
    async fn message_count(&self, guild_id: GuildId, window: &TimeWindow) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM guild_pulse.messages \
             WHERE guild_id = $1 AND posted_at >= $2 AND posted_at < $3",
        )
        .bind(guild_id)
        .bind(window.start_datetime())
        .bind(window.end_exclusive())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("count"))
    }

    async fn active_author_count(&self, guild_id: GuildId, window: &TimeWindow) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(DISTINCT author_id) AS count FROM guild_pulse.messages \
             WHERE guild_id = $1 AND posted_at >= $2 AND posted_at < $3",
        )
        .bind(guild_id)
        .bind(window.start_datetime())
        .bind(window.end_exclusive())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("count"))
    }

    async fn channel_activity(
        &self,
        guild_id: GuildId,
        window: &TimeWindow,
    ) -> Result<Vec<ChannelActivity>> {
        let rows = sqlx::query(
            "SELECT channel_id, COUNT(*) AS count FROM guild_pulse.messages \
             WHERE guild_id = $1 AND posted_at >= $2 AND posted_at < $3 \
             GROUP BY channel_id ORDER BY channel_id",
        )
        .bind(guild_id)
        .bind(window.start_datetime())
        .bind(window.end_exclusive())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ChannelActivity {
                channel_id: row.get("channel_id"),
                count: row.get("count"),
            })
            .collect())
    }

    async fn hourly_activity(
        &self,
        guild_id: GuildId,
        window: &TimeWindow,
    ) -> Result<Vec<HourCount>> {
        let rows = sqlx::query(
            "SELECT EXTRACT(HOUR FROM posted_at AT TIME ZONE 'UTC')::INT AS hour, \
             COUNT(*) AS count FROM guild_pulse.messages \
             WHERE guild_id = $1 AND posted_at >= $2 AND posted_at < $3 \
             GROUP BY hour ORDER BY hour",
        )
        .bind(guild_id)
        .bind(window.start_datetime())
        .bind(window.end_exclusive())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| HourCount {
                hour: row.get::<i32, _>("hour") as u32,
                count: row.get("count"),
            })
            .collect())
    }

    async fn new_authors_count(&self, guild_id: GuildId, window: &TimeWindow) -> Result<i64> {
        // First message ever, not first message in the window: the
        // anti-join rejects authors with any earlier post.
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM ( \
               SELECT author_id FROM guild_pulse.messages \
               WHERE guild_id = $1 AND posted_at >= $2 AND posted_at < $3 \
               GROUP BY author_id \
             ) AS windowed \
             WHERE NOT EXISTS ( \
               SELECT 1 FROM guild_pulse.messages prior \
               WHERE prior.guild_id = $1 \
                 AND prior.author_id = windowed.author_id \
                 AND prior.posted_at < $2 \
             )",
        )
        .bind(guild_id)
        .bind(window.start_datetime())
        .bind(window.end_exclusive())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("count"))
    }

    async fn daily_message_counts(
        &self,
        guild_id: GuildId,
        window: &TimeWindow,
    ) -> Result<Vec<DailyCount>> {
        let rows = sqlx::query(
            "SELECT (posted_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS count \
             FROM guild_pulse.messages \
             WHERE guild_id = $1 AND posted_at >= $2 AND posted_at < $3 \
             GROUP BY day ORDER BY day",
        )
        .bind(guild_id)
        .bind(window.start_datetime())
        .bind(window.end_exclusive())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DailyCount {
                date: row.get("day"),
                count: row.get("count"),
            })
            .collect())
    }
}
