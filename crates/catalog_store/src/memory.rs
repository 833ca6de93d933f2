//! In-memory catalog store.
//!
//! Backs tests and ephemeral runs. Mirrors the SQLite backend's semantics,
//! including the identity-key uniqueness guarantee, so the resolver can be
//! exercised against it.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use entities::{Activity, Item, ItemType, User, UserSettings};
use serde_json::Value;

use crate::{ActivityFilter, CatalogStore, ItemFilter, Ordering, StoreError, StoreResult};

/// In-memory implementation of [`CatalogStore`].
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    users: RwLock<HashMap<String, User>>,
    item_types: RwLock<HashMap<(String, String), ItemType>>,
    items: RwLock<HashMap<String, Item>>,
    activities: RwLock<HashMap<String, Activity>>,
}

impl MemoryCatalogStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_by_times<T>(
    entries: &mut [T],
    ordering: Ordering,
    created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
    modified: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
) {
    match ordering {
        Ordering::CreatedAsc => entries.sort_by_key(|e| created(e)),
        Ordering::CreatedDesc => entries.sort_by_key(|e| std::cmp::Reverse(created(e))),
        Ordering::ModifiedAsc => entries.sort_by_key(|e| modified(e)),
        Ordering::ModifiedDesc => entries.sort_by_key(|e| std::cmp::Reverse(modified(e))),
    }
}

fn paginate<T>(entries: Vec<T>, limit: Option<u32>, offset: Option<u32>) -> Vec<T> {
    entries
        .into_iter()
        .skip(offset.unwrap_or(0) as usize)
        .take(limit.map(|l| l as usize).unwrap_or(usize::MAX))
        .collect()
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().unwrap();
        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(StoreError::already_exists("user", &user.email));
        }
        users.insert(user.token.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, token: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().unwrap();
        Ok(users.get(token).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().unwrap();
        let email = email.to_lowercase();
        Ok(users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn update_user_settings(&self, token: &str, settings: &UserSettings) -> StoreResult<()> {
        let mut users = self.users.write().unwrap();
        let user = users
            .get_mut(token)
            .ok_or_else(|| StoreError::not_found("user", token))?;
        user.settings = settings.clone();
        user.modified = chrono::Utc::now();
        Ok(())
    }

    async fn create_item_type(&self, item_type: &ItemType) -> StoreResult<()> {
        let mut item_types = self.item_types.write().unwrap();
        let key = (item_type.user_token.clone(), item_type.slug.clone());
        if item_types.contains_key(&key) {
            return Err(StoreError::already_exists("item type", &item_type.slug));
        }
        item_types.insert(key, item_type.clone());
        Ok(())
    }

    async fn upsert_item_type(&self, item_type: &ItemType) -> StoreResult<()> {
        let mut item_types = self.item_types.write().unwrap();
        let key = (item_type.user_token.clone(), item_type.slug.clone());
        match item_types.get_mut(&key) {
            Some(existing) => {
                // Update in place; keep the original creation time.
                let created = existing.created;
                *existing = item_type.clone();
                existing.created = created;
                existing.modified = chrono::Utc::now();
            }
            None => {
                item_types.insert(key, item_type.clone());
            }
        }
        Ok(())
    }

    async fn get_item_type(&self, user_token: &str, slug: &str) -> StoreResult<Option<ItemType>> {
        let item_types = self.item_types.read().unwrap();
        Ok(item_types
            .get(&(user_token.to_string(), slug.to_string()))
            .cloned())
    }

    async fn list_item_types(&self, user_token: &str) -> StoreResult<Vec<ItemType>> {
        let item_types = self.item_types.read().unwrap();
        let mut result: Vec<ItemType> = item_types
            .values()
            .filter(|t| t.user_token == user_token)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(result)
    }

    async fn update_item_type(&self, item_type: &ItemType) -> StoreResult<()> {
        let mut item_types = self.item_types.write().unwrap();
        let key = (item_type.user_token.clone(), item_type.slug.clone());
        if !item_types.contains_key(&key) {
            return Err(StoreError::not_found("item type", &item_type.slug));
        }
        item_types.insert(key, item_type.clone());
        Ok(())
    }

    async fn delete_item_type(&self, user_token: &str, slug: &str) -> StoreResult<()> {
        let mut item_types = self.item_types.write().unwrap();
        item_types.remove(&(user_token.to_string(), slug.to_string()));

        // Cascade: items of this type go away, their activities with them,
        // and children of the removed items are detached.
        let mut items = self.items.write().unwrap();
        let removed: Vec<String> = items
            .values()
            .filter(|i| i.user_token == user_token && i.item_type_slug == slug)
            .map(|i| i.token.clone())
            .collect();
        for token in &removed {
            items.remove(token);
        }
        for item in items.values_mut() {
            if let Some(parent) = &item.parent_token {
                if removed.contains(parent) {
                    item.parent_token = None;
                }
            }
        }
        let mut activities = self.activities.write().unwrap();
        activities.retain(|_, a| !removed.contains(&a.item_token));
        Ok(())
    }

    async fn insert_item(&self, item: &Item) -> StoreResult<()> {
        let mut items = self.items.write().unwrap();
        let conflict = items.values().any(|i| {
            i.user_token == item.user_token
                && i.item_type_slug == item.item_type_slug
                && i.identity_key == item.identity_key
        });
        if conflict {
            return Err(StoreError::IdentityConflict {
                item_type_slug: item.item_type_slug.clone(),
                identity_key: item.identity_key.clone(),
            });
        }
        items.insert(item.token.clone(), item.clone());
        Ok(())
    }

    async fn find_item_by_identity(
        &self,
        user_token: &str,
        item_type_slug: &str,
        identity_key: &str,
    ) -> StoreResult<Option<Item>> {
        let items = self.items.read().unwrap();
        Ok(items
            .values()
            .find(|i| {
                i.user_token == user_token
                    && i.item_type_slug == item_type_slug
                    && i.identity_key == identity_key
            })
            .cloned())
    }

    async fn get_item(&self, user_token: &str, token: &str) -> StoreResult<Option<Item>> {
        let items = self.items.read().unwrap();
        Ok(items
            .get(token)
            .filter(|i| i.user_token == user_token)
            .cloned())
    }

    async fn list_items(&self, user_token: &str, filter: &ItemFilter) -> StoreResult<Vec<Item>> {
        let items = self.items.read().unwrap();
        let mut result: Vec<Item> = items
            .values()
            .filter(|i| i.user_token == user_token)
            .filter(|i| {
                filter
                    .item_type_slug
                    .as_ref()
                    .is_none_or(|slug| &i.item_type_slug == slug)
                    && filter.pinned.is_none_or(|p| i.pinned == p)
            })
            .cloned()
            .collect();
        sort_by_times(&mut result, filter.ordering, |i| i.created, |i| i.modified);
        Ok(paginate(result, filter.limit, filter.offset))
    }

    async fn update_item(&self, item: &Item) -> StoreResult<()> {
        let mut items = self.items.write().unwrap();
        if !items.contains_key(&item.token) {
            return Err(StoreError::not_found("item", &item.token));
        }
        let collides = items.values().any(|other| {
            other.token != item.token
                && other.user_token == item.user_token
                && other.item_type_slug == item.item_type_slug
                && other.identity_key == item.identity_key
        });
        if collides {
            return Err(StoreError::IdentityConflict {
                item_type_slug: item.item_type_slug.clone(),
                identity_key: item.identity_key.clone(),
            });
        }
        items.insert(item.token.clone(), item.clone());
        Ok(())
    }

    async fn delete_item(&self, user_token: &str, token: &str) -> StoreResult<()> {
        let mut items = self.items.write().unwrap();
        if items
            .get(token)
            .filter(|i| i.user_token == user_token)
            .is_none()
        {
            return Ok(());
        }
        items.remove(token);
        for item in items.values_mut() {
            if item.parent_token.as_deref() == Some(token) {
                item.parent_token = None;
            }
        }
        let mut activities = self.activities.write().unwrap();
        activities.retain(|_, a| a.item_token != token);
        Ok(())
    }

    async fn distinct_info_values(
        &self,
        user_token: &str,
        item_type_slug: &str,
        field: &str,
    ) -> StoreResult<Vec<Value>> {
        let items = self.items.read().unwrap();
        let mut seen: Vec<Value> = Vec::new();
        for item in items.values() {
            if item.user_token != user_token || item.item_type_slug != item_type_slug {
                continue;
            }
            if let Some(value) = item.info.get(field) {
                if !value.is_null() && !seen.contains(value) {
                    seen.push(value.clone());
                }
            }
        }
        Ok(seen)
    }

    async fn insert_activity(&self, activity: &Activity) -> StoreResult<()> {
        let mut activities = self.activities.write().unwrap();
        activities.insert(activity.token.clone(), activity.clone());
        Ok(())
    }

    async fn get_activity(&self, user_token: &str, token: &str) -> StoreResult<Option<Activity>> {
        let activities = self.activities.read().unwrap();
        Ok(activities
            .get(token)
            .filter(|a| a.user_token == user_token)
            .cloned())
    }

    async fn list_activities(
        &self,
        user_token: &str,
        filter: &ActivityFilter,
    ) -> StoreResult<Vec<Activity>> {
        let items = self.items.read().unwrap();
        let activities = self.activities.read().unwrap();
        let mut result: Vec<Activity> = activities
            .values()
            .filter(|a| a.user_token == user_token)
            .filter(|a| {
                filter
                    .item_token
                    .as_ref()
                    .is_none_or(|token| &a.item_token == token)
                    && filter.finished.is_none_or(|f| a.finished == f)
                    && filter.pending.is_none_or(|p| a.pending == p)
                    && filter.item_type_slug.as_ref().is_none_or(|slug| {
                        items
                            .get(&a.item_token)
                            .is_some_and(|i| &i.item_type_slug == slug)
                    })
            })
            .cloned()
            .collect();
        sort_by_times(&mut result, filter.ordering, |a| a.created, |a| a.modified);
        Ok(paginate(result, filter.limit, filter.offset))
    }

    async fn update_activity(&self, activity: &Activity) -> StoreResult<()> {
        let mut activities = self.activities.write().unwrap();
        if !activities.contains_key(&activity.token) {
            return Err(StoreError::not_found("activity", &activity.token));
        }
        activities.insert(activity.token.clone(), activity.clone());
        Ok(())
    }

    async fn delete_activity(&self, user_token: &str, token: &str) -> StoreResult<()> {
        let mut activities = self.activities.write().unwrap();
        if activities
            .get(token)
            .filter(|a| a.user_token == user_token)
            .is_some()
        {
            activities.remove(token);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities::{Item, User};
    use serde_json::json;

    fn info(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_user_email_unique_case_insensitive() {
        let store = MemoryCatalogStore::new();
        let a = User::new("reader@example.com", "hash");
        let b = User::new("Reader@Example.com", "hash");
        store.create_user(&a).await.unwrap();
        assert!(matches!(
            store.create_user(&b).await,
            Err(StoreError::AlreadyExists { .. })
        ));
        let found = store.get_user_by_email("READER@example.com").await.unwrap();
        assert_eq!(found.unwrap().token, a.token);
    }

    #[tokio::test]
    async fn test_insert_item_identity_conflict() {
        let store = MemoryCatalogStore::new();
        let required = ["title"];
        let first = Item::new("U_a", "book", info(json!({"title": "Dune"})), &required);
        let second = Item::new("U_a", "book", info(json!({"title": "Dune"})), &required);
        store.insert_item(&first).await.unwrap();
        assert!(matches!(
            store.insert_item(&second).await,
            Err(StoreError::IdentityConflict { .. })
        ));

        // Same identity under a different user is fine.
        let other_user = Item::new("U_b", "book", info(json!({"title": "Dune"})), &required);
        store.insert_item(&other_user).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_item_detaches_children_and_drops_activities() {
        let store = MemoryCatalogStore::new();
        let parent = Item::new("U_a", "book-series", info(json!({"title": "Dune"})), &["title"]);
        let child = Item::new("U_a", "book", info(json!({"title": "Dune"})), &["title"])
            .with_parent_token(&parent.token);
        store.insert_item(&parent).await.unwrap();
        store.insert_item(&child).await.unwrap();
        let activity = Activity::new("U_a", &parent.token);
        store.insert_activity(&activity).await.unwrap();

        store.delete_item("U_a", &parent.token).await.unwrap();

        let child = store.get_item("U_a", &child.token).await.unwrap().unwrap();
        assert!(child.parent_token.is_none());
        assert!(store
            .get_activity("U_a", &activity.token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_item_scoping_by_user() {
        let store = MemoryCatalogStore::new();
        let item = Item::new("U_a", "book", info(json!({"title": "Dune"})), &["title"]);
        store.insert_item(&item).await.unwrap();
        assert!(store.get_item("U_b", &item.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_distinct_info_values() {
        let store = MemoryCatalogStore::new();
        for title in ["Dune", "Dune", "Hyperion"] {
            let item = Item::new(
                "U_a",
                "book",
                info(json!({"title": title, "author": "x"})),
                &["title", "author"],
            );
            // Identity collision between the two Dunes is expected; ignore.
            let _ = store.insert_item(&item).await;
        }
        let values = store.distinct_info_values("U_a", "book", "title").await.unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&json!("Dune")));
        assert!(values.contains(&json!("Hyperion")));
    }

    #[tokio::test]
    async fn test_list_items_filter_and_pagination() {
        let store = MemoryCatalogStore::new();
        for i in 0..5 {
            let mut item = Item::new(
                "U_a",
                "book",
                info(json!({"title": format!("t{i}")})),
                &["title"],
            );
            item.pinned = i % 2 == 0;
            item.created = chrono::Utc::now() + chrono::Duration::seconds(i);
            store.insert_item(&item).await.unwrap();
        }
        let filter = ItemFilter {
            pinned: Some(true),
            ..Default::default()
        };
        let pinned = store.list_items("U_a", &filter).await.unwrap();
        assert_eq!(pinned.len(), 3);

        let filter = ItemFilter {
            ordering: Ordering::CreatedAsc,
            limit: Some(2),
            offset: Some(1),
            ..Default::default()
        };
        let page = store.list_items("U_a", &filter).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].info["title"], json!("t1"));
    }

    #[tokio::test]
    async fn test_list_activities_by_item_type() {
        let store = MemoryCatalogStore::new();
        let book = Item::new("U_a", "book", info(json!({"title": "Dune"})), &["title"]);
        let movie = Item::new("U_a", "movie", info(json!({"title": "Alien"})), &["title"]);
        store.insert_item(&book).await.unwrap();
        store.insert_item(&movie).await.unwrap();
        store
            .insert_activity(&Activity::new("U_a", &book.token))
            .await
            .unwrap();
        store
            .insert_activity(&Activity::new("U_a", &movie.token))
            .await
            .unwrap();

        let filter = ActivityFilter {
            item_type_slug: Some("book".to_string()),
            ..Default::default()
        };
        let result = store.list_activities("U_a", &filter).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].item_token, book.token);
    }
}
