use crate::types::{
    Connection, ConnectionKind, CuratorError, Feed, FeedStatus, Feedback, Item,
    NotificationRecord, PreferenceProfile, PreferenceWeight, Result,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// SQLite-backed persistence for feeds, items, preferences, and the
/// connection graph. All list-valued columns are stored as JSON text.
pub struct Store {
    pool: SqlitePool,
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| CuratorError::Corrupt(format!("bad uuid '{raw}': {e}")))
}

impl Store {
    pub async fn open(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Private in-memory database, used by tests and one-shot runs.
    /// Single connection so every query sees the same database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                title TEXT,
                fetch_interval_minutes INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                last_fetched_at TEXT,
                last_error TEXT,
                item_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                feed_id TEXT NOT NULL REFERENCES feeds (id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                raw_content TEXT NOT NULL,
                excerpt TEXT NOT NULL,
                author TEXT,
                published_at TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                summary TEXT,
                topics TEXT NOT NULL DEFAULT '[]',
                entities TEXT NOT NULL DEFAULT '[]',
                relevance_score REAL NOT NULL DEFAULT 0.5,
                embedding TEXT,
                is_read INTEGER NOT NULL DEFAULT 0,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                user_feedback TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preference_profile (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                interests TEXT NOT NULL DEFAULT '[]',
                excluded_topics TEXT NOT NULL DEFAULT '[]',
                notification_threshold REAL NOT NULL DEFAULT 0.7,
                notifications_enabled INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preference_weights (
                topic TEXT PRIMARY KEY,
                weight REAL NOT NULL,
                positive_count INTEGER NOT NULL DEFAULT 0,
                negative_count INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Connections and notifications reference items without foreign
        // keys: an edge whose counterpart item has gone missing is
        // tolerated by queries and swept on the next graph rebuild.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS connections (
                id TEXT PRIMARY KEY,
                item_a_id TEXT NOT NULL,
                item_b_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                strength REAL NOT NULL,
                shared_elements TEXT NOT NULL DEFAULT '[]',
                UNIQUE (item_a_id, item_b_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                item_id TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_feed ON items (feed_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_published ON items (published_at)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_score ON items (relevance_score)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_connections_a ON connections (item_a_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_connections_b ON connections (item_b_id)")
            .execute(&self.pool)
            .await?;

        debug!("schema initialized");
        Ok(())
    }

    // ---- feeds ----

    pub async fn create_feed(
        &self,
        url: &str,
        title: Option<String>,
        fetch_interval_minutes: i64,
    ) -> Result<Feed> {
        let feed = Feed {
            id: Uuid::new_v4(),
            url: url.to_string(),
            title,
            fetch_interval_minutes,
            status: FeedStatus::Active,
            last_fetched_at: None,
            last_error: None,
            item_count: 0,
            created_at: Utc::now(),
        };
        sqlx::query(
            r#"
            INSERT INTO feeds (id, url, title, fetch_interval_minutes, status, item_count, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
        )
        .bind(feed.id.to_string())
        .bind(&feed.url)
        .bind(&feed.title)
        .bind(feed.fetch_interval_minutes)
        .bind(feed.status.as_str())
        .bind(feed.created_at)
        .execute(&self.pool)
        .await?;

        info!("subscribed feed {} ({})", feed.url, feed.id);
        Ok(feed)
    }

    pub async fn feed(&self, id: Uuid) -> Result<Feed> {
        let row = sqlx::query("SELECT * FROM feeds WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => feed_from_row(&row),
            None => Err(CuratorError::FeedNotFound { id }),
        }
    }

    pub async fn feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let row = sqlx::query("SELECT * FROM feeds WHERE url = ?1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| feed_from_row(&r)).transpose()
    }

    pub async fn list_feeds(&self) -> Result<Vec<Feed>> {
        let rows = sqlx::query("SELECT * FROM feeds ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(feed_from_row).collect()
    }

    pub async fn update_poll_success(
        &self,
        feed_id: Uuid,
        title: Option<&str>,
        new_items: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = ?1,
                last_error = NULL,
                status = 'active',
                item_count = item_count + ?2,
                title = COALESCE(title, ?3)
            WHERE id = ?4
            "#,
        )
        .bind(now)
        .bind(new_items)
        .bind(title)
        .bind(feed_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_feed_error(&self, feed_id: Uuid, message: &str) -> Result<()> {
        sqlx::query("UPDATE feeds SET status = 'error', last_error = ?1 WHERE id = ?2")
            .bind(message)
            .bind(feed_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_feed_status(&self, feed_id: Uuid, status: FeedStatus) -> Result<()> {
        sqlx::query("UPDATE feeds SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(feed_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a feed and everything hanging off it: its items go via
    /// foreign-key cascade, their connections and notifications are
    /// swept explicitly.
    pub async fn delete_feed(&self, feed_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM connections
            WHERE item_a_id IN (SELECT id FROM items WHERE feed_id = ?1)
               OR item_b_id IN (SELECT id FROM items WHERE feed_id = ?1)
            "#,
        )
        .bind(feed_id.to_string())
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "DELETE FROM notifications WHERE item_id IN (SELECT id FROM items WHERE feed_id = ?1)",
        )
        .bind(feed_id.to_string())
        .execute(&self.pool)
        .await?;
        let result = sqlx::query("DELETE FROM feeds WHERE id = ?1")
            .bind(feed_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CuratorError::FeedNotFound { id: feed_id });
        }
        info!("deleted feed {}", feed_id);
        Ok(())
    }

    // ---- items ----

    /// Insert an item unless its link is already known. Returns whether a
    /// row was actually created; the link is the idempotency key.
    pub async fn insert_item(&self, item: &Item) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO items (
                id, feed_id, title, link, raw_content, excerpt, author,
                published_at, fetched_at, summary, topics, entities,
                relevance_score, embedding, is_read, is_favorite, user_feedback
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ON CONFLICT (link) DO NOTHING
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.feed_id.to_string())
        .bind(&item.title)
        .bind(&item.link)
        .bind(&item.raw_content)
        .bind(&item.excerpt)
        .bind(&item.author)
        .bind(item.published_at)
        .bind(item.fetched_at)
        .bind(&item.summary)
        .bind(serde_json::to_string(&item.topics)?)
        .bind(serde_json::to_string(&item.entities)?)
        .bind(item.relevance_score)
        .bind(match &item.embedding {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        })
        .bind(item.is_read)
        .bind(item.is_favorite)
        .bind(item.user_feedback.map(|f| f.as_str()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn item(&self, id: Uuid) -> Result<Item> {
        let row = sqlx::query("SELECT * FROM items WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => item_from_row(&row),
            None => Err(CuratorError::ItemNotFound { id }),
        }
    }

    pub async fn item_by_link(&self, link: &str) -> Result<Option<Item>> {
        let row = sqlx::query("SELECT * FROM items WHERE link = ?1")
            .bind(link)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| item_from_row(&r)).transpose()
    }

    pub async fn items_for_feed(&self, feed_id: Uuid) -> Result<Vec<Item>> {
        let rows = sqlx::query("SELECT * FROM items WHERE feed_id = ?1 ORDER BY published_at DESC")
            .bind(feed_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    pub async fn all_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query("SELECT * FROM items")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    pub async fn recent_items(&self, limit: i64) -> Result<Vec<Item>> {
        let rows = sqlx::query("SELECT * FROM items ORDER BY published_at DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    pub async fn items_with_min_score(&self, floor: f64) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            "SELECT * FROM items WHERE relevance_score >= ?1 ORDER BY relevance_score DESC",
        )
        .bind(floor)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(item_from_row).collect()
    }

    pub async fn items_published_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            "SELECT * FROM items WHERE published_at >= ?1 AND published_at <= ?2 ORDER BY published_at DESC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(item_from_row).collect()
    }

    pub async fn apply_analysis(
        &self,
        item_id: Uuid,
        summary: &str,
        topics: &[String],
        entities: &[String],
    ) -> Result<()> {
        sqlx::query("UPDATE items SET summary = ?1, topics = ?2, entities = ?3 WHERE id = ?4")
            .bind(summary)
            .bind(serde_json::to_string(topics)?)
            .bind(serde_json::to_string(entities)?)
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_embedding(&self, item_id: Uuid, embedding: &[f32]) -> Result<()> {
        sqlx::query("UPDATE items SET embedding = ?1 WHERE id = ?2")
            .bind(serde_json::to_string(embedding)?)
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_relevance(&self, item_id: Uuid, score: f64) -> Result<()> {
        sqlx::query("UPDATE items SET relevance_score = ?1 WHERE id = ?2")
            .bind(score)
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_feedback(&self, item_id: Uuid, feedback: Option<Feedback>) -> Result<()> {
        sqlx::query("UPDATE items SET user_feedback = ?1 WHERE id = ?2")
            .bind(feedback.map(|f| f.as_str()))
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_read(&self, item_id: Uuid, read: bool) -> Result<()> {
        sqlx::query("UPDATE items SET is_read = ?1 WHERE id = ?2")
            .bind(read)
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_favorite(&self, item_id: Uuid, favorite: bool) -> Result<()> {
        sqlx::query("UPDATE items SET is_favorite = ?1 WHERE id = ?2")
            .bind(favorite)
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_item(&self, item_id: Uuid) -> Result<()> {
        self.delete_connections_for_item(item_id).await?;
        sqlx::query("DELETE FROM notifications WHERE item_id = ?1")
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CuratorError::ItemNotFound { id: item_id });
        }
        Ok(())
    }

    // ---- preference profile (singleton row) ----

    pub async fn profile(&self) -> Result<PreferenceProfile> {
        let row = sqlx::query("SELECT * FROM preference_profile WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let interests: Vec<String> =
                    serde_json::from_str(&row.try_get::<String, _>("interests")?)?;
                let excluded_topics: Vec<String> =
                    serde_json::from_str(&row.try_get::<String, _>("excluded_topics")?)?;
                Ok(PreferenceProfile {
                    interests,
                    excluded_topics,
                    notification_threshold: row.try_get("notification_threshold")?,
                    notifications_enabled: row.try_get("notifications_enabled")?,
                })
            }
            None => {
                let profile = PreferenceProfile::default();
                self.save_profile(&profile).await?;
                Ok(profile)
            }
        }
    }

    pub async fn save_profile(&self, profile: &PreferenceProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO preference_profile
                (id, interests, excluded_topics, notification_threshold, notifications_enabled)
            VALUES (1, ?1, ?2, ?3, ?4)
            "#,
        )
        .bind(serde_json::to_string(&profile.interests)?)
        .bind(serde_json::to_string(&profile.excluded_topics)?)
        .bind(profile.notification_threshold)
        .bind(profile.notifications_enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- preference weights ----

    pub async fn weight(&self, topic: &str) -> Result<Option<PreferenceWeight>> {
        let row = sqlx::query("SELECT * FROM preference_weights WHERE topic = ?1")
            .bind(topic)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| weight_from_row(&r)).transpose()
    }

    pub async fn save_weight(&self, weight: &PreferenceWeight) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO preference_weights (topic, weight, positive_count, negative_count)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&weight.topic)
        .bind(weight.weight)
        .bind(weight.positive_count)
        .bind(weight.negative_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn all_weights(&self) -> Result<Vec<PreferenceWeight>> {
        let rows = sqlx::query("SELECT * FROM preference_weights ORDER BY topic")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(weight_from_row).collect()
    }

    /// Topic → multiplier map as consumed by the scorer.
    pub async fn weight_map(&self) -> Result<HashMap<String, f64>> {
        Ok(self
            .all_weights()
            .await?
            .into_iter()
            .map(|w| (w.topic, w.weight))
            .collect())
    }

    // ---- connections ----

    /// Insert a connection edge. The pair is canonicalized so each
    /// unordered pair occupies at most one row.
    pub async fn insert_connection(&self, connection: &Connection) -> Result<()> {
        let (a, b) = ordered_pair(connection.item_a_id, connection.item_b_id);
        sqlx::query(
            r#"
            INSERT INTO connections (id, item_a_id, item_b_id, kind, strength, shared_elements)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (item_a_id, item_b_id) DO NOTHING
            "#,
        )
        .bind(connection.id.to_string())
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(connection.kind.as_str())
        .bind(connection.strength)
        .bind(serde_json::to_string(&connection.shared_elements)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn connection_exists(&self, item_a: Uuid, item_b: Uuid) -> Result<bool> {
        let (a, b) = ordered_pair(item_a, item_b);
        let row = sqlx::query("SELECT 1 FROM connections WHERE item_a_id = ?1 AND item_b_id = ?2")
            .bind(a.to_string())
            .bind(b.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn connections_for_item(&self, item_id: Uuid) -> Result<Vec<Connection>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM connections
            WHERE item_a_id = ?1 OR item_b_id = ?1
            ORDER BY strength DESC
            "#,
        )
        .bind(item_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(connection_from_row).collect()
    }

    pub async fn delete_all_connections(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM connections")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_connections_for_item(&self, item_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM connections WHERE item_a_id = ?1 OR item_b_id = ?1")
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ---- notifications ----

    /// Record a notification for an item. Idempotent per item; returns
    /// whether a new record was created.
    pub async fn create_notification(&self, item_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, item_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (item_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(item_id.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn notifications(&self) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query("SELECT * FROM notifications ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(NotificationRecord {
                    id: parse_id(&row.try_get::<String, _>("id")?)?,
                    item_id: parse_id(&row.try_get::<String, _>("item_id")?)?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn feed_from_row(row: &SqliteRow) -> Result<Feed> {
    let status_raw: String = row.try_get("status")?;
    let status = FeedStatus::parse(&status_raw)
        .ok_or_else(|| CuratorError::Corrupt(format!("unknown feed status '{status_raw}'")))?;
    Ok(Feed {
        id: parse_id(&row.try_get::<String, _>("id")?)?,
        url: row.try_get("url")?,
        title: row.try_get("title")?,
        fetch_interval_minutes: row.try_get("fetch_interval_minutes")?,
        status,
        last_fetched_at: row.try_get("last_fetched_at")?,
        last_error: row.try_get("last_error")?,
        item_count: row.try_get("item_count")?,
        created_at: row.try_get("created_at")?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<Item> {
    let topics: Vec<String> = serde_json::from_str(&row.try_get::<String, _>("topics")?)?;
    let entities: Vec<String> = serde_json::from_str(&row.try_get::<String, _>("entities")?)?;
    let embedding = match row.try_get::<Option<String>, _>("embedding")? {
        Some(raw) => Some(serde_json::from_str::<Vec<f32>>(&raw)?),
        None => None,
    };
    let user_feedback = row
        .try_get::<Option<String>, _>("user_feedback")?
        .as_deref()
        .and_then(Feedback::parse);
    Ok(Item {
        id: parse_id(&row.try_get::<String, _>("id")?)?,
        feed_id: parse_id(&row.try_get::<String, _>("feed_id")?)?,
        title: row.try_get("title")?,
        link: row.try_get("link")?,
        raw_content: row.try_get("raw_content")?,
        excerpt: row.try_get("excerpt")?,
        author: row.try_get("author")?,
        published_at: row.try_get("published_at")?,
        fetched_at: row.try_get("fetched_at")?,
        summary: row.try_get("summary")?,
        topics,
        entities,
        relevance_score: row.try_get("relevance_score")?,
        embedding,
        is_read: row.try_get("is_read")?,
        is_favorite: row.try_get("is_favorite")?,
        user_feedback,
    })
}

fn weight_from_row(row: &SqliteRow) -> Result<PreferenceWeight> {
    Ok(PreferenceWeight {
        topic: row.try_get("topic")?,
        weight: row.try_get("weight")?,
        positive_count: row.try_get("positive_count")?,
        negative_count: row.try_get("negative_count")?,
    })
}

fn connection_from_row(row: &SqliteRow) -> Result<Connection> {
    let kind_raw: String = row.try_get("kind")?;
    let kind = ConnectionKind::parse(&kind_raw)
        .ok_or_else(|| CuratorError::Corrupt(format!("unknown connection kind '{kind_raw}'")))?;
    let shared_elements: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("shared_elements")?)?;
    Ok(Connection {
        id: parse_id(&row.try_get::<String, _>("id")?)?,
        item_a_id: parse_id(&row.try_get::<String, _>("item_a_id")?)?,
        item_b_id: parse_id(&row.try_get::<String, _>("item_b_id")?)?,
        kind,
        strength: row.try_get("strength")?,
        shared_elements,
    })
}
