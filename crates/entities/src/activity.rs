//! Activity entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{TokenKind, gen_token};

/// A logged event against an item, such as a reading or watching session.
///
/// `start_time` and `end_time` are independent and optional; no ordering
/// between them is enforced. The rating is stored on the unit interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// External identifier, prefixed `A_`.
    pub token: String,
    /// Owning user's token.
    pub user_token: String,
    /// Token of the item this activity is logged against.
    pub item_token: String,
    /// When the activity started, if recorded.
    pub start_time: Option<DateTime<Utc>>,
    /// When the activity ended, if recorded.
    pub end_time: Option<DateTime<Utc>>,
    /// Whether the item was finished in this activity.
    pub finished: bool,
    /// Whether the activity is pending.
    pub pending: bool,
    /// Rating on the unit interval, if any.
    pub rating: Option<f64>,
    /// Free-text notes.
    pub notes: String,
    /// Arbitrary payload, shaped by the type's activity schema when one is
    /// configured.
    pub info: Map<String, Value>,
    /// When this record was created.
    pub created: DateTime<Utc>,
    /// When this record was last updated.
    pub modified: DateTime<Utc>,
}

impl Activity {
    /// Creates a new activity for an item.
    pub fn new(user_token: impl Into<String>, item_token: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            token: gen_token(TokenKind::Activity),
            user_token: user_token.into(),
            item_token: item_token.into(),
            start_time: None,
            end_time: None,
            finished: false,
            pending: false,
            rating: None,
            notes: String::new(),
            info: Map::new(),
            created: now,
            modified: now,
        }
    }

    /// Sets the rating.
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Sets the time span.
    pub fn with_times(
        mut self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_creation() {
        let activity = Activity::new("U_x", "I_y").with_rating(0.8);
        assert!(activity.token.starts_with("A_"));
        assert_eq!(activity.rating, Some(0.8));
        assert!(!activity.finished);
        assert!(activity.start_time.is_none());
    }
}
