//! Catalog store trait definitions.

use async_trait::async_trait;
use entities::{Activity, Item, ItemType, User, UserSettings};
use serde_json::Value;

use crate::StoreResult;

/// Sort order for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ordering {
    /// Oldest first by creation time.
    CreatedAsc,
    /// Newest first by creation time.
    #[default]
    CreatedDesc,
    /// Least recently modified first.
    ModifiedAsc,
    /// Most recently modified first.
    ModifiedDesc,
}

impl Ordering {
    /// Parses an ordering string (`created`, `-created`, `modified`,
    /// `-modified`); a leading `-` means descending.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::CreatedAsc),
            "-created" => Some(Self::CreatedDesc),
            "modified" => Some(Self::ModifiedAsc),
            "-modified" => Some(Self::ModifiedDesc),
            _ => None,
        }
    }
}

/// Filter options for listing items.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Filter by item type slug.
    pub item_type_slug: Option<String>,
    /// Filter by pinned flag.
    pub pinned: Option<bool>,
    /// Sort order.
    pub ordering: Ordering,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

/// Filter options for listing activities.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Filter by item token.
    pub item_token: Option<String>,
    /// Filter by the item's type slug.
    pub item_type_slug: Option<String>,
    /// Filter by finished flag.
    pub finished: Option<bool>,
    /// Filter by pending flag.
    pub pending: Option<bool>,
    /// Sort order.
    pub ordering: Ordering,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

/// Trait for catalog storage operations.
///
/// Every operation is scoped to the owning user; a token or slug belonging
/// to another user behaves as if it did not exist.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // ========== User Operations ==========

    /// Creates a new user. Fails with `AlreadyExists` if the email is taken
    /// (compared case-insensitively).
    async fn create_user(&self, user: &User) -> StoreResult<()>;

    /// Gets a user by token.
    async fn get_user(&self, token: &str) -> StoreResult<Option<User>>;

    /// Gets a user by email, compared case-insensitively.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Replaces a user's settings map.
    async fn update_user_settings(
        &self,
        token: &str,
        settings: &UserSettings,
    ) -> StoreResult<()>;

    // ========== ItemType Operations ==========

    /// Creates a new item type. Fails with `AlreadyExists` if the slug is
    /// taken for this user.
    async fn create_item_type(&self, item_type: &ItemType) -> StoreResult<()>;

    /// Inserts or updates an item type keyed by (user, slug). Used by
    /// default-catalog seeding; never duplicates rows.
    async fn upsert_item_type(&self, item_type: &ItemType) -> StoreResult<()>;

    /// Gets an item type by slug for a user.
    async fn get_item_type(&self, user_token: &str, slug: &str) -> StoreResult<Option<ItemType>>;

    /// Lists a user's item types, ordered by slug.
    async fn list_item_types(&self, user_token: &str) -> StoreResult<Vec<ItemType>>;

    /// Updates an existing item type.
    async fn update_item_type(&self, item_type: &ItemType) -> StoreResult<()>;

    /// Deletes an item type and, by ownership, its items and their
    /// activities.
    async fn delete_item_type(&self, user_token: &str, slug: &str) -> StoreResult<()>;

    // ========== Item Operations ==========

    /// Inserts a new item. Fails with `IdentityConflict` if an item with the
    /// same (user, item type, identity key) already exists; this is the
    /// store-level guarantee the identity resolver relies on.
    async fn insert_item(&self, item: &Item) -> StoreResult<()>;

    /// Finds the item with the given identity key, if any.
    async fn find_item_by_identity(
        &self,
        user_token: &str,
        item_type_slug: &str,
        identity_key: &str,
    ) -> StoreResult<Option<Item>>;

    /// Gets an item by token.
    async fn get_item(&self, user_token: &str, token: &str) -> StoreResult<Option<Item>>;

    /// Lists a user's items with the given filter.
    async fn list_items(&self, user_token: &str, filter: &ItemFilter) -> StoreResult<Vec<Item>>;

    /// Updates an existing item.
    async fn update_item(&self, item: &Item) -> StoreResult<()>;

    /// Deletes an item. Children referencing it as parent are detached
    /// (parent set to null); its activities are deleted.
    async fn delete_item(&self, user_token: &str, token: &str) -> StoreResult<()>;

    /// Distinct non-null values of an `info` field across a user's items of
    /// one type. Backs autocomplete suggestions.
    async fn distinct_info_values(
        &self,
        user_token: &str,
        item_type_slug: &str,
        field: &str,
    ) -> StoreResult<Vec<Value>>;

    // ========== Activity Operations ==========

    /// Inserts a new activity.
    async fn insert_activity(&self, activity: &Activity) -> StoreResult<()>;

    /// Gets an activity by token.
    async fn get_activity(&self, user_token: &str, token: &str) -> StoreResult<Option<Activity>>;

    /// Lists a user's activities with the given filter.
    async fn list_activities(
        &self,
        user_token: &str,
        filter: &ActivityFilter,
    ) -> StoreResult<Vec<Activity>>;

    /// Updates an existing activity.
    async fn update_activity(&self, activity: &Activity) -> StoreResult<()>;

    /// Deletes an activity.
    async fn delete_activity(&self, user_token: &str, token: &str) -> StoreResult<()>;
}
