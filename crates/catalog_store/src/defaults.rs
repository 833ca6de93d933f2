//! Default item type catalog.
//!
//! Every user is seeded with a small catalog of common types. Seeding is an
//! explicit idempotent operation invoked when a user signs up (and re-run by
//! administrative tooling after catalog changes); it upserts keyed by
//! (user, slug) and never duplicates rows.

use entities::ItemType;
use serde_json::json;

use crate::{CatalogStore, StoreResult};

/// Builds the default item type catalog for a user.
pub fn default_item_types(user_token: &str) -> Vec<ItemType> {
    vec![
        ItemType::new(user_token, "book-series", "Book Series")
            .with_item_schema(json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "labelMap": {
                        "type": "object",
                        "patternProperties": {".*": {"type": "string"}},
                    },
                    "autocompleteFields": {
                        "type": "array",
                        "const": ["title"],
                    },
                },
                "additionalProperties": false,
                "required": ["title"],
            }))
            .with_name_schema("{{title}}"),
        ItemType::new(user_token, "book", "Book")
            .with_item_schema(json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "author": {"type": "string"},
                    "series": {"type": "string"},
                    "series_num": {"type": "number"},
                    "labelMap": {
                        "type": "object",
                        "patternProperties": {".*": {"type": "string"}},
                    },
                    "autocompleteFields": {
                        "type": "array",
                        "const": ["title", "author", "series"],
                    },
                },
                "additionalProperties": false,
                "required": ["title", "author"],
            }))
            .with_name_schema("{{title}}")
            .with_parent_slug("book-series"),
        ItemType::new(user_token, "movie", "Movie")
            .with_item_schema(json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "series": {"type": "string"},
                    "series_num": {"type": "number"},
                    "labelMap": {
                        "type": "object",
                        "patternProperties": {".*": {"type": "string"}},
                    },
                    "autocompleteFields": {
                        "type": "array",
                        "const": ["title"],
                    },
                },
                "additionalProperties": false,
                "required": ["title"],
            }))
            .with_name_schema("{{title}}"),
        ItemType::new(user_token, "video_game", "Video Game")
            .with_item_schema(json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "platform": {"type": "string"},
                    "labelMap": {
                        "type": "object",
                        "patternProperties": {".*": {"type": "string"}},
                    },
                    "autocompleteFields": {
                        "type": "array",
                        "const": ["title"],
                    },
                },
                "additionalProperties": false,
                "required": ["title"],
            }))
            .with_name_schema("{{title}}"),
    ]
}

/// Seeds (or refreshes) the default item types for a user.
pub async fn seed_default_item_types<S: CatalogStore + ?Sized>(
    store: &S,
    user_token: &str,
) -> StoreResult<()> {
    for item_type in default_item_types(user_token) {
        store.upsert_item_type(&item_type).await?;
    }
    tracing::debug!(user = %user_token, "Seeded default item types");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCatalogStore;

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let store = MemoryCatalogStore::new();
        seed_default_item_types(&store, "U_a").await.unwrap();
        seed_default_item_types(&store, "U_a").await.unwrap();

        let types = store.list_item_types("U_a").await.unwrap();
        assert_eq!(types.len(), 4);
        let slugs: Vec<&str> = types.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["book", "book-series", "movie", "video_game"]);
    }

    #[tokio::test]
    async fn test_seeding_updates_existing_rows() {
        let store = MemoryCatalogStore::new();
        seed_default_item_types(&store, "U_a").await.unwrap();

        // Simulate a stale row from an older catalog revision.
        let mut book = store.get_item_type("U_a", "book").await.unwrap().unwrap();
        book.name = "Old Book".to_string();
        store.update_item_type(&book).await.unwrap();

        seed_default_item_types(&store, "U_a").await.unwrap();
        let book = store.get_item_type("U_a", "book").await.unwrap().unwrap();
        assert_eq!(book.name, "Book");
        assert_eq!(book.parent_slug.as_deref(), Some("book-series"));
    }

    #[tokio::test]
    async fn test_book_requires_title_and_author() {
        let types = default_item_types("U_a");
        let book = types.iter().find(|t| t.slug == "book").unwrap();
        assert_eq!(book.required_fields(), vec!["title", "author"]);
    }
}
