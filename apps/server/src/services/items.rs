//! Item identity resolution.
//!
//! Items are identified within a `(user, item type)` scope by the values of
//! the schema-required `info` fields. `resolve_or_create` is the single path
//! through which activities attach to items: it validates the payload, looks
//! an existing item up by identity key and only inserts when none exists.

use catalog_store::{CatalogStore, StoreError};
use entities::{Item, ItemType};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ServerError, ServerResult};
use crate::services::validation::validate_against_schema;

/// Incoming item fields, as sent under `itemDetails`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemDraft {
    /// Schema-constrained payload.
    #[serde(default)]
    pub info: Map<String, Value>,
    /// Raw rating on the user's scale, stored as-is on the item.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Pinned for UI prioritization.
    #[serde(default)]
    pub pinned: Option<bool>,
    /// Token of an existing parent item.
    #[serde(default)]
    pub parent: Option<String>,
}

/// Finds the item matching the draft's required-field values, or inserts a
/// new one. Returns the item and whether it was created.
///
/// Non-required info fields and the scalar fields of the draft only apply on
/// insert; an existing item is returned untouched. A concurrent insert of the
/// same identity is resolved by re-fetching the winning row.
pub async fn resolve_or_create<S: CatalogStore>(
    store: &S,
    item_type: &ItemType,
    draft: ItemDraft,
) -> ServerResult<(Item, bool)> {
    let info_value = Value::Object(draft.info.clone());
    validate_against_schema(&info_value, &item_type.item_schema)?;

    let required = item_type.required_fields();
    let identity_key = entities::identity_key(&required, &draft.info);

    if let Some(existing) = store
        .find_item_by_identity(&item_type.user_token, &item_type.slug, &identity_key)
        .await?
    {
        return Ok((existing, false));
    }

    let parent_token = match &draft.parent {
        Some(token) => Some(
            store
                .get_item(&item_type.user_token, token)
                .await?
                .ok_or_else(|| ServerError::NotFound(format!("Parent item {} not found", token)))?
                .token,
        ),
        None => None,
    };

    let mut item = Item::new(
        item_type.user_token.clone(),
        item_type.slug.clone(),
        draft.info,
        &required,
    );
    item.rating = draft.rating;
    item.notes = draft.notes.unwrap_or_default();
    item.pinned = draft.pinned.unwrap_or(false);
    item.parent_token = parent_token;

    match store.insert_item(&item).await {
        Ok(()) => Ok((item, true)),
        Err(StoreError::IdentityConflict { .. }) => {
            // Lost the race to a concurrent insert of the same identity.
            let winner = store
                .find_item_by_identity(&item_type.user_token, &item_type.slug, &identity_key)
                .await?
                .ok_or_else(|| {
                    ServerError::Internal("Conflicting item vanished during resolution".to_string())
                })?;
            Ok((winner, false))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_store::MemoryCatalogStore;
    use entities::User;
    use serde_json::json;

    async fn setup() -> (MemoryCatalogStore, User, ItemType) {
        let store = MemoryCatalogStore::new();
        let user = User::new("test@example.com", "hash");
        store.create_user(&user).await.unwrap();
        let item_type = ItemType::new(&user.token, "book", "Book").with_item_schema(json!({
            "type": "object",
            "properties": {"title": {"type": "string"}, "author": {"type": "string"}},
            "required": ["title", "author"],
        }));
        store.create_item_type(&item_type).await.unwrap();
        (store, user, item_type)
    }

    fn draft(info: Value) -> ItemDraft {
        ItemDraft {
            info: info.as_object().unwrap().clone(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_creates_then_reuses_by_identity() {
        let (store, _user, item_type) = setup().await;

        let (first, created) = resolve_or_create(
            &store,
            &item_type,
            draft(json!({"title": "Dune", "author": "Herbert"})),
        )
        .await
        .unwrap();
        assert!(created);

        // Same required values, different extras: same item, extras ignored.
        let mut second_draft = draft(json!({"title": "Dune", "author": "Herbert", "pages": 412}));
        second_draft.notes = Some("great".to_string());
        let (second, created) = resolve_or_create(&store, &item_type, second_draft)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.token, first.token);
        assert!(second.notes.is_empty());
        assert!(!second.info.contains_key("pages"));
    }

    #[tokio::test]
    async fn test_different_required_values_create_distinct_items() {
        let (store, _user, item_type) = setup().await;

        let (first, _) = resolve_or_create(
            &store,
            &item_type,
            draft(json!({"title": "Dune", "author": "Herbert"})),
        )
        .await
        .unwrap();
        let (second, created) = resolve_or_create(
            &store,
            &item_type,
            draft(json!({"title": "Dune Messiah", "author": "Herbert"})),
        )
        .await
        .unwrap();
        assert!(created);
        assert_ne!(first.token, second.token);
    }

    #[tokio::test]
    async fn test_invalid_payload_writes_nothing() {
        let (store, user, item_type) = setup().await;

        let err = resolve_or_create(&store, &item_type, draft(json!({"title": "Dune"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));

        let items = store
            .list_items(&user.token, &Default::default())
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_missing_parent_is_not_found() {
        let (store, _user, item_type) = setup().await;

        let mut d = draft(json!({"title": "Dune", "author": "Herbert"}));
        d.parent = Some("I_missing".to_string());
        let err = resolve_or_create(&store, &item_type, d).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_parent_is_attached_on_create() {
        let (store, user, item_type) = setup().await;
        let series_type = ItemType::new(&user.token, "book-series", "Book Series")
            .with_item_schema(json!({
                "type": "object",
                "properties": {"title": {"type": "string"}},
                "required": ["title"],
            }));
        store.create_item_type(&series_type).await.unwrap();

        let (series, _) = resolve_or_create(&store, &series_type, draft(json!({"title": "Dune"})))
            .await
            .unwrap();

        let mut d = draft(json!({"title": "Dune", "author": "Herbert"}));
        d.parent = Some(series.token.clone());
        let (book, created) = resolve_or_create(&store, &item_type, d).await.unwrap();
        assert!(created);
        assert_eq!(book.parent_token.as_deref(), Some(series.token.as_str()));
    }

    #[tokio::test]
    async fn test_insert_defaults_applied_on_create() {
        let (store, _user, item_type) = setup().await;

        let mut d = draft(json!({"title": "Dune", "author": "Herbert"}));
        d.rating = Some(4.0);
        d.notes = Some("reread".to_string());
        d.pinned = Some(true);
        let (item, created) = resolve_or_create(&store, &item_type, d).await.unwrap();
        assert!(created);
        assert_eq!(item.rating, Some(4.0));
        assert_eq!(item.notes, "reread");
        assert!(item.pinned);
    }
}
