//! SQLite catalog store.
//!
//! Persistent backend for single-node deployments. Timestamps are stored as
//! RFC 3339 text, JSON payloads as text columns queried with SQLite's JSON
//! functions. The identity-key guarantee is a composite unique index, so two
//! concurrent identical creates resolve to exactly one row.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::{Activity, Item, ItemType, User, UserSettings};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};

use crate::{ActivityFilter, CatalogStore, ItemFilter, Ordering, StoreError, StoreResult};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    token TEXT PRIMARY KEY,
    email TEXT NOT NULL COLLATE NOCASE UNIQUE,
    password_hash TEXT NOT NULL,
    settings TEXT NOT NULL,
    created TEXT NOT NULL,
    modified TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS item_types (
    user_token TEXT NOT NULL REFERENCES users(token) ON DELETE CASCADE,
    slug TEXT NOT NULL,
    name TEXT NOT NULL,
    item_schema TEXT NOT NULL,
    activity_schema TEXT NOT NULL,
    name_schema TEXT NOT NULL,
    auto_complete_config TEXT NOT NULL,
    parent_slug TEXT,
    icon_path TEXT,
    created TEXT NOT NULL,
    modified TEXT NOT NULL,
    PRIMARY KEY (user_token, slug)
);

CREATE TABLE IF NOT EXISTS items (
    token TEXT PRIMARY KEY,
    user_token TEXT NOT NULL REFERENCES users(token) ON DELETE CASCADE,
    item_type_slug TEXT NOT NULL,
    info TEXT NOT NULL,
    identity_key TEXT NOT NULL,
    rating REAL,
    notes TEXT NOT NULL DEFAULT '',
    pinned INTEGER NOT NULL DEFAULT 0,
    parent_token TEXT REFERENCES items(token) ON DELETE SET NULL,
    icon_path TEXT,
    created TEXT NOT NULL,
    modified TEXT NOT NULL,
    FOREIGN KEY (user_token, item_type_slug)
        REFERENCES item_types(user_token, slug) ON DELETE CASCADE,
    UNIQUE (user_token, item_type_slug, identity_key)
);

CREATE TABLE IF NOT EXISTS activities (
    token TEXT PRIMARY KEY,
    user_token TEXT NOT NULL REFERENCES users(token) ON DELETE CASCADE,
    item_token TEXT NOT NULL REFERENCES items(token) ON DELETE CASCADE,
    start_time TEXT,
    end_time TEXT,
    finished INTEGER NOT NULL DEFAULT 0,
    pending INTEGER NOT NULL DEFAULT 0,
    rating REAL,
    notes TEXT NOT NULL DEFAULT '',
    info TEXT NOT NULL,
    created TEXT NOT NULL,
    modified TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_user_type ON items (user_token, item_type_slug);
CREATE INDEX IF NOT EXISTS idx_activities_user_item ON activities (user_token, item_token);
"#;

/// SQLite implementation of [`CatalogStore`].
pub struct SqliteCatalogStore {
    pool: Pool<Sqlite>,
}

impl SqliteCatalogStore {
    /// Connects to the database and creates the schema if needed.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Wraps an existing pool. The caller is responsible for the schema.
    pub fn with_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_opt_ts(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.map(parse_ts)
}

fn order_sql(ordering: Ordering, prefix: &str) -> String {
    let clause = match ordering {
        Ordering::CreatedAsc => "created ASC",
        Ordering::CreatedDesc => "created DESC",
        Ordering::ModifiedAsc => "modified ASC",
        Ordering::ModifiedDesc => "modified DESC",
    };
    format!(" ORDER BY {prefix}{clause}")
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

#[derive(Debug, FromRow)]
struct UserRow {
    token: String,
    email: String,
    password_hash: String,
    settings: String,
    created: String,
    modified: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            token: row.token,
            email: row.email,
            password_hash: row.password_hash,
            settings: serde_json::from_str(&row.settings).unwrap_or_default(),
            created: parse_ts(&row.created),
            modified: parse_ts(&row.modified),
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemTypeRow {
    user_token: String,
    slug: String,
    name: String,
    item_schema: String,
    activity_schema: String,
    name_schema: String,
    auto_complete_config: String,
    parent_slug: Option<String>,
    icon_path: Option<String>,
    created: String,
    modified: String,
}

impl From<ItemTypeRow> for ItemType {
    fn from(row: ItemTypeRow) -> Self {
        ItemType {
            slug: row.slug,
            name: row.name,
            user_token: row.user_token,
            item_schema: serde_json::from_str(&row.item_schema).unwrap_or_default(),
            activity_schema: serde_json::from_str(&row.activity_schema).unwrap_or_default(),
            name_schema: row.name_schema,
            auto_complete_config: serde_json::from_str(&row.auto_complete_config)
                .unwrap_or_default(),
            parent_slug: row.parent_slug,
            icon_path: row.icon_path,
            created: parse_ts(&row.created),
            modified: parse_ts(&row.modified),
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    token: String,
    user_token: String,
    item_type_slug: String,
    info: String,
    identity_key: String,
    rating: Option<f64>,
    notes: String,
    pinned: bool,
    parent_token: Option<String>,
    icon_path: Option<String>,
    created: String,
    modified: String,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            token: row.token,
            user_token: row.user_token,
            item_type_slug: row.item_type_slug,
            info: serde_json::from_str(&row.info).unwrap_or_default(),
            identity_key: row.identity_key,
            rating: row.rating,
            notes: row.notes,
            pinned: row.pinned,
            parent_token: row.parent_token,
            icon_path: row.icon_path,
            created: parse_ts(&row.created),
            modified: parse_ts(&row.modified),
        }
    }
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    token: String,
    user_token: String,
    item_token: String,
    start_time: Option<String>,
    end_time: Option<String>,
    finished: bool,
    pending: bool,
    rating: Option<f64>,
    notes: String,
    info: String,
    created: String,
    modified: String,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Activity {
            token: row.token,
            user_token: row.user_token,
            item_token: row.item_token,
            start_time: parse_opt_ts(row.start_time.as_deref()),
            end_time: parse_opt_ts(row.end_time.as_deref()),
            finished: row.finished,
            pending: row.pending,
            rating: row.rating,
            notes: row.notes,
            info: serde_json::from_str(&row.info).unwrap_or_default(),
            created: parse_ts(&row.created),
            modified: parse_ts(&row.modified),
        }
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO users (token, email, password_hash, settings, created, modified) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.token)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(serde_json::to_string(&user.settings)?)
        .bind(user.created.to_rfc3339())
        .bind(user.modified.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::already_exists("user", &user.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, token: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn update_user_settings(&self, token: &str, settings: &UserSettings) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET settings = ?, modified = ? WHERE token = ?")
            .bind(serde_json::to_string(settings)?)
            .bind(Utc::now().to_rfc3339())
            .bind(token)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", token));
        }
        Ok(())
    }

    async fn create_item_type(&self, item_type: &ItemType) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO item_types (user_token, slug, name, item_schema, activity_schema, \
             name_schema, auto_complete_config, parent_slug, icon_path, created, modified) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item_type.user_token)
        .bind(&item_type.slug)
        .bind(&item_type.name)
        .bind(serde_json::to_string(&item_type.item_schema)?)
        .bind(serde_json::to_string(&item_type.activity_schema)?)
        .bind(&item_type.name_schema)
        .bind(serde_json::to_string(&item_type.auto_complete_config)?)
        .bind(&item_type.parent_slug)
        .bind(&item_type.icon_path)
        .bind(item_type.created.to_rfc3339())
        .bind(item_type.modified.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::already_exists("item type", &item_type.slug))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_item_type(&self, item_type: &ItemType) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO item_types (user_token, slug, name, item_schema, activity_schema, \
             name_schema, auto_complete_config, parent_slug, icon_path, created, modified) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_token, slug) DO UPDATE SET \
             name = excluded.name, item_schema = excluded.item_schema, \
             activity_schema = excluded.activity_schema, name_schema = excluded.name_schema, \
             auto_complete_config = excluded.auto_complete_config, \
             parent_slug = excluded.parent_slug, modified = excluded.modified",
        )
        .bind(&item_type.user_token)
        .bind(&item_type.slug)
        .bind(&item_type.name)
        .bind(serde_json::to_string(&item_type.item_schema)?)
        .bind(serde_json::to_string(&item_type.activity_schema)?)
        .bind(&item_type.name_schema)
        .bind(serde_json::to_string(&item_type.auto_complete_config)?)
        .bind(&item_type.parent_slug)
        .bind(&item_type.icon_path)
        .bind(item_type.created.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_item_type(&self, user_token: &str, slug: &str) -> StoreResult<Option<ItemType>> {
        let row: Option<ItemTypeRow> =
            sqlx::query_as("SELECT * FROM item_types WHERE user_token = ? AND slug = ?")
                .bind(user_token)
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(ItemType::from))
    }

    async fn list_item_types(&self, user_token: &str) -> StoreResult<Vec<ItemType>> {
        let rows: Vec<ItemTypeRow> =
            sqlx::query_as("SELECT * FROM item_types WHERE user_token = ? ORDER BY slug")
                .bind(user_token)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(ItemType::from).collect())
    }

    async fn update_item_type(&self, item_type: &ItemType) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE item_types SET name = ?, item_schema = ?, activity_schema = ?, \
             name_schema = ?, auto_complete_config = ?, parent_slug = ?, icon_path = ?, \
             modified = ? WHERE user_token = ? AND slug = ?",
        )
        .bind(&item_type.name)
        .bind(serde_json::to_string(&item_type.item_schema)?)
        .bind(serde_json::to_string(&item_type.activity_schema)?)
        .bind(&item_type.name_schema)
        .bind(serde_json::to_string(&item_type.auto_complete_config)?)
        .bind(&item_type.parent_slug)
        .bind(&item_type.icon_path)
        .bind(item_type.modified.to_rfc3339())
        .bind(&item_type.user_token)
        .bind(&item_type.slug)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("item type", &item_type.slug));
        }
        Ok(())
    }

    async fn delete_item_type(&self, user_token: &str, slug: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM item_types WHERE user_token = ? AND slug = ?")
            .bind(user_token)
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_item(&self, item: &Item) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO items (token, user_token, item_type_slug, info, identity_key, rating, \
             notes, pinned, parent_token, icon_path, created, modified) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.token)
        .bind(&item.user_token)
        .bind(&item.item_type_slug)
        .bind(serde_json::to_string(&item.info)?)
        .bind(&item.identity_key)
        .bind(item.rating)
        .bind(&item.notes)
        .bind(item.pinned)
        .bind(&item.parent_token)
        .bind(&item.icon_path)
        .bind(item.created.to_rfc3339())
        .bind(item.modified.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::IdentityConflict {
                item_type_slug: item.item_type_slug.clone(),
                identity_key: item.identity_key.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_item_by_identity(
        &self,
        user_token: &str,
        item_type_slug: &str,
        identity_key: &str,
    ) -> StoreResult<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(
            "SELECT * FROM items WHERE user_token = ? AND item_type_slug = ? AND identity_key = ?",
        )
        .bind(user_token)
        .bind(item_type_slug)
        .bind(identity_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Item::from))
    }

    async fn get_item(&self, user_token: &str, token: &str) -> StoreResult<Option<Item>> {
        let row: Option<ItemRow> =
            sqlx::query_as("SELECT * FROM items WHERE user_token = ? AND token = ?")
                .bind(user_token)
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Item::from))
    }

    async fn list_items(&self, user_token: &str, filter: &ItemFilter) -> StoreResult<Vec<Item>> {
        let mut sql = String::from("SELECT * FROM items WHERE user_token = ?");
        if filter.item_type_slug.is_some() {
            sql.push_str(" AND item_type_slug = ?");
        }
        if filter.pinned.is_some() {
            sql.push_str(" AND pinned = ?");
        }
        sql.push_str(&order_sql(filter.ordering, ""));
        sql.push_str(" LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, ItemRow>(&sql).bind(user_token);
        if let Some(slug) = &filter.item_type_slug {
            query = query.bind(slug);
        }
        if let Some(pinned) = filter.pinned {
            query = query.bind(pinned);
        }
        query = query
            .bind(filter.limit.map(i64::from).unwrap_or(-1))
            .bind(i64::from(filter.offset.unwrap_or(0)));

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn update_item(&self, item: &Item) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE items SET info = ?, identity_key = ?, rating = ?, notes = ?, pinned = ?, \
             parent_token = ?, icon_path = ?, modified = ? WHERE user_token = ? AND token = ?",
        )
        .bind(serde_json::to_string(&item.info)?)
        .bind(&item.identity_key)
        .bind(item.rating)
        .bind(&item.notes)
        .bind(item.pinned)
        .bind(&item.parent_token)
        .bind(&item.icon_path)
        .bind(item.modified.to_rfc3339())
        .bind(&item.user_token)
        .bind(&item.token)
        .execute(&self.pool)
        .await;
        match result {
            Ok(r) if r.rows_affected() == 0 => Err(StoreError::not_found("item", &item.token)),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::IdentityConflict {
                item_type_slug: item.item_type_slug.clone(),
                identity_key: item.identity_key.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_item(&self, user_token: &str, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM items WHERE user_token = ? AND token = ?")
            .bind(user_token)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn distinct_info_values(
        &self,
        user_token: &str,
        item_type_slug: &str,
        field: &str,
    ) -> StoreResult<Vec<Value>> {
        let path = format!("$.{field}");
        let rows: Vec<(Option<String>,)> = sqlx::query_as(
            "SELECT DISTINCT json_quote(json_extract(info, ?)) FROM items \
             WHERE user_token = ? AND item_type_slug = ? AND json_extract(info, ?) IS NOT NULL",
        )
        .bind(&path)
        .bind(user_token)
        .bind(item_type_slug)
        .bind(&path)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(raw,)| raw)
            .filter_map(|raw| serde_json::from_str(&raw).ok())
            .filter(|v: &Value| !v.is_null())
            .collect())
    }

    async fn insert_activity(&self, activity: &Activity) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO activities (token, user_token, item_token, start_time, end_time, \
             finished, pending, rating, notes, info, created, modified) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&activity.token)
        .bind(&activity.user_token)
        .bind(&activity.item_token)
        .bind(activity.start_time.map(|t| t.to_rfc3339()))
        .bind(activity.end_time.map(|t| t.to_rfc3339()))
        .bind(activity.finished)
        .bind(activity.pending)
        .bind(activity.rating)
        .bind(&activity.notes)
        .bind(serde_json::to_string(&activity.info)?)
        .bind(activity.created.to_rfc3339())
        .bind(activity.modified.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_activity(&self, user_token: &str, token: &str) -> StoreResult<Option<Activity>> {
        let row: Option<ActivityRow> =
            sqlx::query_as("SELECT * FROM activities WHERE user_token = ? AND token = ?")
                .bind(user_token)
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Activity::from))
    }

    async fn list_activities(
        &self,
        user_token: &str,
        filter: &ActivityFilter,
    ) -> StoreResult<Vec<Activity>> {
        let mut sql = String::from(
            "SELECT a.* FROM activities a JOIN items i ON i.token = a.item_token \
             WHERE a.user_token = ?",
        );
        if filter.item_token.is_some() {
            sql.push_str(" AND a.item_token = ?");
        }
        if filter.item_type_slug.is_some() {
            sql.push_str(" AND i.item_type_slug = ?");
        }
        if filter.finished.is_some() {
            sql.push_str(" AND a.finished = ?");
        }
        if filter.pending.is_some() {
            sql.push_str(" AND a.pending = ?");
        }
        sql.push_str(&order_sql(filter.ordering, "a."));
        sql.push_str(" LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, ActivityRow>(&sql).bind(user_token);
        if let Some(token) = &filter.item_token {
            query = query.bind(token);
        }
        if let Some(slug) = &filter.item_type_slug {
            query = query.bind(slug);
        }
        if let Some(finished) = filter.finished {
            query = query.bind(finished);
        }
        if let Some(pending) = filter.pending {
            query = query.bind(pending);
        }
        query = query
            .bind(filter.limit.map(i64::from).unwrap_or(-1))
            .bind(i64::from(filter.offset.unwrap_or(0)));

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Activity::from).collect())
    }

    async fn update_activity(&self, activity: &Activity) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE activities SET item_token = ?, start_time = ?, end_time = ?, finished = ?, \
             pending = ?, rating = ?, notes = ?, info = ?, modified = ? \
             WHERE user_token = ? AND token = ?",
        )
        .bind(&activity.item_token)
        .bind(activity.start_time.map(|t| t.to_rfc3339()))
        .bind(activity.end_time.map(|t| t.to_rfc3339()))
        .bind(activity.finished)
        .bind(activity.pending)
        .bind(activity.rating)
        .bind(&activity.notes)
        .bind(serde_json::to_string(&activity.info)?)
        .bind(activity.modified.to_rfc3339())
        .bind(&activity.user_token)
        .bind(&activity.token)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("activity", &activity.token));
        }
        Ok(())
    }

    async fn delete_activity(&self, user_token: &str, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM activities WHERE user_token = ? AND token = ?")
            .bind(user_token)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities::{Item, User};
    use serde_json::json;

    async fn test_store() -> SqliteCatalogStore {
        // A shared pool against :memory: would give each connection its own
        // database; pin the pool to a single connection for tests.
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        let store = SqliteCatalogStore::with_pool(pool);
        store.run_migrations().await.unwrap();
        store
    }

    fn info(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    async fn seed_user_and_type(store: &SqliteCatalogStore) -> (User, ItemType) {
        let user = User::new("reader@example.com", "hash");
        store.create_user(&user).await.unwrap();
        let item_type = ItemType::new(&user.token, "book", "Book").with_item_schema(json!({
            "type": "object",
            "properties": {"title": {"type": "string"}},
            "required": ["title"],
        }));
        store.create_item_type(&item_type).await.unwrap();
        (user, item_type)
    }

    #[tokio::test]
    async fn test_user_roundtrip_and_duplicate_email() {
        let store = test_store().await;
        let user = User::new("reader@example.com", "hash");
        store.create_user(&user).await.unwrap();

        let loaded = store.get_user(&user.token).await.unwrap().unwrap();
        assert_eq!(loaded.email, "reader@example.com");
        assert_eq!(loaded.settings.rating_max, 5);

        let dup = User::new("READER@example.com", "hash");
        assert!(matches!(
            store.create_user(&dup).await,
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_item_identity_unique_index() {
        let store = test_store().await;
        let (user, _) = seed_user_and_type(&store).await;

        let first = Item::new(&user.token, "book", info(json!({"title": "Dune"})), &["title"]);
        let second = Item::new(&user.token, "book", info(json!({"title": "Dune"})), &["title"]);
        store.insert_item(&first).await.unwrap();
        assert!(matches!(
            store.insert_item(&second).await,
            Err(StoreError::IdentityConflict { .. })
        ));

        let found = store
            .find_item_by_identity(&user.token, "book", &first.identity_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.token, first.token);
    }

    #[tokio::test]
    async fn test_delete_parent_sets_child_null() {
        let store = test_store().await;
        let (user, _) = seed_user_and_type(&store).await;
        let series_type = ItemType::new(&user.token, "book-series", "Book Series")
            .with_item_schema(json!({"required": ["title"]}));
        store.create_item_type(&series_type).await.unwrap();

        let parent = Item::new(
            &user.token,
            "book-series",
            info(json!({"title": "Dune"})),
            &["title"],
        );
        let child = Item::new(&user.token, "book", info(json!({"title": "Dune"})), &["title"])
            .with_parent_token(&parent.token);
        store.insert_item(&parent).await.unwrap();
        store.insert_item(&child).await.unwrap();

        store.delete_item(&user.token, &parent.token).await.unwrap();
        let child = store
            .get_item(&user.token, &child.token)
            .await
            .unwrap()
            .unwrap();
        assert!(child.parent_token.is_none());
    }

    #[tokio::test]
    async fn test_delete_item_cascades_activities() {
        let store = test_store().await;
        let (user, _) = seed_user_and_type(&store).await;
        let item = Item::new(&user.token, "book", info(json!({"title": "Dune"})), &["title"]);
        store.insert_item(&item).await.unwrap();
        let activity = Activity::new(&user.token, &item.token);
        store.insert_activity(&activity).await.unwrap();

        store.delete_item(&user.token, &item.token).await.unwrap();
        assert!(store
            .get_activity(&user.token, &activity.token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upsert_item_type_updates_in_place() {
        let store = test_store().await;
        let (user, item_type) = seed_user_and_type(&store).await;

        let updated = ItemType {
            name: "Paper Book".to_string(),
            ..item_type.clone()
        };
        store.upsert_item_type(&updated).await.unwrap();

        let types = store.list_item_types(&user.token).await.unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "Paper Book");
    }

    #[tokio::test]
    async fn test_distinct_info_values() {
        let store = test_store().await;
        let (user, _) = seed_user_and_type(&store).await;
        for title in ["Dune", "Hyperion"] {
            let item = Item::new(
                &user.token,
                "book",
                info(json!({"title": title})),
                &["title"],
            );
            store.insert_item(&item).await.unwrap();
        }
        let values = store
            .distinct_info_values(&user.token, "book", "title")
            .await
            .unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&json!("Dune")));
    }
}
