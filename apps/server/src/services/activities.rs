//! Activity recording.

use chrono::{DateTime, Utc};
use entities::{Activity, Item, User};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Incoming activity fields, as sent under `activityDetails`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityDraft {
    /// When the activity started.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// When the activity ended.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Whether the item was finished.
    #[serde(default)]
    pub finished: bool,
    /// Whether the activity is pending.
    #[serde(default)]
    pub pending: bool,
    /// Raw rating on the user's configured scale.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Arbitrary payload.
    #[serde(default)]
    pub info: Map<String, Value>,
}

/// Normalizes a raw rating from the user's scale onto the unit interval.
///
/// An absent rating stays absent. Out-of-range input is not clamped.
pub fn normalize_rating(raw: Option<f64>, rating_max: u32) -> Option<f64> {
    raw.map(|r| r / rating_max.max(1) as f64)
}

/// Builds an activity for an item from an incoming draft, normalizing the
/// rating against the user's configured scale.
pub fn record(user: &User, item: &Item, draft: ActivityDraft) -> Activity {
    let mut activity = Activity::new(user.token.clone(), item.token.clone())
        .with_times(draft.start_time, draft.end_time);
    activity.finished = draft.finished;
    activity.pending = draft.pending;
    activity.rating = normalize_rating(draft.rating, user.rating_max());
    activity.notes = draft.notes.unwrap_or_default();
    activity.info = draft.info;
    activity
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_rating() {
        assert_eq!(normalize_rating(Some(4.0), 5), Some(0.8));
        assert_eq!(normalize_rating(Some(10.0), 10), Some(1.0));
        assert_eq!(normalize_rating(None, 5), None);
    }

    #[test]
    fn test_normalize_rating_zero_scale_does_not_divide_by_zero() {
        assert_eq!(normalize_rating(Some(3.0), 0), Some(3.0));
    }

    #[test]
    fn test_record_normalizes_and_copies_fields() {
        let user = User::new("test@example.com", "hash");
        let item = Item::new(&user.token, "book", Map::new(), &[]);
        let draft = ActivityDraft {
            finished: true,
            rating: Some(4.0),
            notes: Some("good".to_string()),
            info: json!({"format": "audiobook"}).as_object().unwrap().clone(),
            ..Default::default()
        };

        let activity = record(&user, &item, draft);
        assert_eq!(activity.item_token, item.token);
        assert_eq!(activity.rating, Some(0.8));
        assert!(activity.finished);
        assert!(!activity.pending);
        assert_eq!(activity.notes, "good");
        assert_eq!(activity.info.get("format"), Some(&json!("audiobook")));
    }

    #[test]
    fn test_record_without_rating() {
        let user = User::new("test@example.com", "hash");
        let item = Item::new(&user.token, "book", Map::new(), &[]);
        let activity = record(&user, &item, ActivityDraft::default());
        assert_eq!(activity.rating, None);
    }
}
