//! Item entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{TokenKind, gen_token};

/// A concrete instance of an item type, identified within its type by the
/// values of the schema-required `info` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// External identifier, prefixed `I_`.
    pub token: String,
    /// Owning user's token.
    pub user_token: String,
    /// Slug of the owning item type.
    pub item_type_slug: String,
    /// Schema-constrained payload.
    pub info: Map<String, Value>,
    /// Canonical serialization of the required-field values. Unique per
    /// (user, item type); see [`identity_key`].
    pub identity_key: String,
    /// Rating on the unit interval, if any.
    pub rating: Option<f64>,
    /// Free-text notes.
    pub notes: String,
    /// Pinned for UI prioritization.
    pub pinned: bool,
    /// Token of the parent item, if any. Weak reference: deleting the
    /// parent nulls this, never cascades.
    pub parent_token: Option<String>,
    /// Relative media path of the uploaded icon, if any.
    pub icon_path: Option<String>,
    /// When this record was created.
    pub created: DateTime<Utc>,
    /// When this record was last updated.
    pub modified: DateTime<Utc>,
}

impl Item {
    /// Creates a new item. `required` is the owning schema's required-field
    /// list, used to derive the identity key.
    pub fn new(
        user_token: impl Into<String>,
        item_type_slug: impl Into<String>,
        info: Map<String, Value>,
        required: &[&str],
    ) -> Self {
        let now = Utc::now();
        let identity_key = identity_key(required, &info);
        Self {
            token: gen_token(TokenKind::Item),
            user_token: user_token.into(),
            item_type_slug: item_type_slug.into(),
            info,
            identity_key,
            rating: None,
            notes: String::new(),
            pinned: false,
            parent_token: None,
            icon_path: None,
            created: now,
            modified: now,
        }
    }

    /// Sets the rating.
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Sets the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Sets the parent item token.
    pub fn with_parent_token(mut self, parent_token: impl Into<String>) -> Self {
        self.parent_token = Some(parent_token.into());
        self
    }
}

/// Canonical serialization of the required-field values of an `info` payload.
///
/// Keys are sorted so the result is independent of payload field order; each
/// value is compact JSON. Fields missing from the payload serialize as `null`
/// so that two payloads differing only in which required field they omit do
/// not collide.
pub fn identity_key(required: &[&str], info: &Map<String, Value>) -> String {
    let mut keys: Vec<&str> = required.to_vec();
    keys.sort_unstable();
    keys.dedup();
    let mut out = String::new();
    for key in keys {
        let value = info.get(key).unwrap_or(&Value::Null);
        out.push_str(key);
        out.push('=');
        // Serializing a Value cannot fail.
        out.push_str(&serde_json::to_string(value).unwrap_or_default());
        out.push(';');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_identity_key_ignores_field_order_and_extras() {
        let a = info(json!({"title": "Dune", "author": "Herbert", "series": "Dune"}));
        let b = info(json!({"author": "Herbert", "title": "Dune"}));
        let required = ["title", "author"];
        assert_eq!(identity_key(&required, &a), identity_key(&required, &b));
    }

    #[test]
    fn test_identity_key_differs_on_required_values() {
        let a = info(json!({"title": "Dune", "author": "Herbert"}));
        let b = info(json!({"title": "Dune Messiah", "author": "Herbert"}));
        let required = ["title", "author"];
        assert_ne!(identity_key(&required, &a), identity_key(&required, &b));
    }

    #[test]
    fn test_identity_key_missing_field_is_null() {
        let a = info(json!({"title": "Dune"}));
        let key = identity_key(&["title", "author"], &a);
        assert_eq!(key, "author=null;title=\"Dune\";");
    }

    #[test]
    fn test_item_new_derives_identity_key() {
        let item = Item::new(
            "U_x",
            "book",
            info(json!({"title": "Dune", "author": "Herbert"})),
            &["title", "author"],
        );
        assert!(item.token.starts_with("I_"));
        assert_eq!(item.identity_key, "author=\"Herbert\";title=\"Dune\";");
    }
}
