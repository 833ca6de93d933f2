//! User-related entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{TokenKind, gen_token};

/// Per-user settings map.
///
/// `rating_max` is the scale incoming raw ratings are expressed on;
/// `activity_defaults` is stored verbatim for the frontend and never
/// interpreted by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    /// Maximum of the raw rating scale.
    #[serde(rename = "ratingMax")]
    pub rating_max: u32,
    /// Item type slugs featured in the quick menu.
    #[serde(rename = "itemTypesInQuickMenu")]
    pub item_types_in_quick_menu: Vec<String>,
    /// Opaque frontend defaults for new activities.
    #[serde(rename = "activityDefaults", default)]
    pub activity_defaults: Map<String, Value>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            rating_max: 5,
            item_types_in_quick_menu: vec!["book".to_string(), "movie".to_string()],
            activity_defaults: Map::new(),
        }
    }
}

/// A registered user. Owns all item types, items and activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// External identifier, prefixed `U_`.
    pub token: String,
    /// Email address, unique case-insensitively.
    pub email: String,
    /// Argon2 password hash. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    /// Settings map.
    pub settings: UserSettings,
    /// When this record was created.
    pub created: DateTime<Utc>,
    /// When this record was last updated.
    pub modified: DateTime<Utc>,
}

impl User {
    /// Creates a new user with default settings.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            token: gen_token(TokenKind::User),
            email: email.into(),
            password_hash: password_hash.into(),
            settings: UserSettings::default(),
            created: now,
            modified: now,
        }
    }

    /// Returns the configured rating scale maximum.
    pub fn rating_max(&self) -> u32 {
        self.settings.rating_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_defaults() {
        let user = User::new("test@example.com", "hash");
        assert!(user.token.starts_with("U_"));
        assert_eq!(user.rating_max(), 5);
        assert_eq!(
            user.settings.item_types_in_quick_menu,
            vec!["book".to_string(), "movie".to_string()]
        );
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("test@example.com", "secret-hash");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
