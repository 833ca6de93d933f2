//! Item type entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user-defined category of trackable thing (book, movie, ...).
///
/// Identified by its slug, which is unique per user. `item_schema` is a JSON
/// Schema constraining the `info` payload of items of this type;
/// `name_schema` is a display-name template (see [`crate::naming`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemType {
    /// Slug, unique within the owning user.
    pub slug: String,
    /// Human-readable name.
    pub name: String,
    /// Owning user's token.
    pub user_token: String,
    /// JSON Schema for `Item.info`.
    pub item_schema: Value,
    /// JSON Schema for `Activity.info`. Stored but not enforced.
    pub activity_schema: Value,
    /// Display-name template.
    pub name_schema: String,
    /// Per-field external autocomplete configuration. Opaque to the core.
    pub auto_complete_config: Value,
    /// Slug of the parent item type, if this type nests under another
    /// (e.g. `book` under `book-series`).
    pub parent_slug: Option<String>,
    /// Relative media path of the uploaded icon, if any.
    pub icon_path: Option<String>,
    /// When this record was created.
    pub created: DateTime<Utc>,
    /// When this record was last updated.
    pub modified: DateTime<Utc>,
}

impl ItemType {
    /// Creates a new item type with empty schemas.
    pub fn new(
        user_token: impl Into<String>,
        slug: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            slug: slug.into(),
            name: name.into(),
            user_token: user_token.into(),
            item_schema: Value::Object(Default::default()),
            activity_schema: Value::Object(Default::default()),
            name_schema: String::new(),
            auto_complete_config: Value::Object(Default::default()),
            parent_slug: None,
            icon_path: None,
            created: now,
            modified: now,
        }
    }

    /// Sets the item schema.
    pub fn with_item_schema(mut self, schema: Value) -> Self {
        self.item_schema = schema;
        self
    }

    /// Sets the name template.
    pub fn with_name_schema(mut self, template: impl Into<String>) -> Self {
        self.name_schema = template.into();
        self
    }

    /// Sets the parent type slug.
    pub fn with_parent_slug(mut self, parent_slug: impl Into<String>) -> Self {
        self.parent_slug = Some(parent_slug.into());
        self
    }

    /// Field names declared required by the item schema.
    pub fn required_fields(&self) -> Vec<&str> {
        self.item_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Derives a slug from a display name: lowercased, with runs of
/// non-alphanumeric characters collapsed to a single hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_sep = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('-');
            last_was_sep = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_fields() {
        let item_type = ItemType::new("U_x", "book", "Book").with_item_schema(json!({
            "type": "object",
            "properties": {"title": {"type": "string"}, "author": {"type": "string"}},
            "required": ["title", "author"],
        }));
        assert_eq!(item_type.required_fields(), vec!["title", "author"]);
    }

    #[test]
    fn test_required_fields_absent() {
        let item_type = ItemType::new("U_x", "note", "Note");
        assert!(item_type.required_fields().is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Video Game"), "video-game");
        assert_eq!(slugify("  Board  Games!  "), "board-games");
        assert_eq!(slugify("Book"), "book");
    }
}
