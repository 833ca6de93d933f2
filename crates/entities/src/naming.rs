//! Display-name template engine.
//!
//! An item type's `name_schema` is a template string with `{{path}}`
//! placeholders, where a path is zero or more `parent.` segments followed by
//! a field name. The field resolves against the target item's `info`, except
//! for the time field `created`, which resolves against the item's creation
//! timestamp and may carry a `!<strftime>` format suffix (`{{created!%Y}}`).
//!
//! Rendering walks a pre-loaded ancestor chain instead of chasing references
//! dynamically: `chain[0]` is the item itself and `chain[n]` its n-th
//! ancestor. The walk depth is bounded by the literal number of `parent.`
//! segments in the template, so cyclic parent data cannot cause
//! non-termination. Any broken link or missing field resolves to the empty
//! string.

use std::sync::LazyLock;

use chrono::format::{Item as FormatItem, StrftimeItems};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::Item;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([\w\-\.!%]+)\}\}").unwrap());

/// Field names resolved against timestamps rather than `info`.
const TIME_FIELDS: &[&str] = &["created"];

/// Returns the deepest `parent.` walk the template asks for, so callers know
/// how many ancestors to load before rendering.
pub fn parent_depth(template: &str) -> usize {
    PLACEHOLDER_RE
        .captures_iter(template)
        .map(|caps| split_path(caps.get(1).map(|m| m.as_str()).unwrap_or_default()).0)
        .max()
        .unwrap_or(0)
}

/// Renders an item's display name from its type's template.
///
/// `chain[0]` must be the item itself; `chain[n]` its n-th ancestor. A chain
/// shorter than a placeholder's walk depth resolves that placeholder to `""`.
pub fn render_name(template: &str, chain: &[&Item]) -> String {
    let mut name = template.to_string();
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let path = match caps.get(1) {
            Some(m) => m.as_str(),
            None => continue,
        };
        let (depth, field_spec) = split_path(path);
        let value = chain
            .get(depth)
            .map(|item| resolve_field(item, field_spec))
            .unwrap_or_default();
        name = name.replace(&format!("{{{{{path}}}}}"), &value);
    }
    name
}

/// Splits a path into its `parent.` walk depth and the trailing field spec.
fn split_path(path: &str) -> (usize, &str) {
    let mut rest = path;
    let mut depth = 0;
    while let Some(stripped) = rest.strip_prefix("parent.") {
        rest = stripped;
        depth += 1;
    }
    (depth, rest)
}

/// Resolves a field spec (`name` or `name!fmt`) against a single item.
fn resolve_field(item: &Item, field_spec: &str) -> String {
    let base = field_spec.split('!').next().unwrap_or(field_spec);
    if TIME_FIELDS.contains(&base) {
        return format_time_field(field_spec, item.created);
    }
    item.info.get(field_spec).map(stringify).unwrap_or_default()
}

/// Formats a time field, honoring an optional `!<strftime>` suffix.
fn format_time_field(field_spec: &str, value: DateTime<Utc>) -> String {
    match field_spec.split_once('!') {
        Some((_, format)) => {
            let items: Vec<FormatItem<'_>> = StrftimeItems::new(format).collect();
            if items.iter().any(|i| matches!(i, FormatItem::Error)) {
                // Bad user-supplied format string; fall back to ISO-8601.
                value.to_rfc3339()
            } else {
                value.format_with_items(items.into_iter()).to_string()
            }
        }
        None => value.to_rfc3339(),
    }
}

/// Stringifies a resolved info value for substitution.
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn item_with_info(value: serde_json::Value) -> Item {
        Item::new("U_x", "book", value.as_object().unwrap().clone(), &[])
    }

    #[test]
    fn test_render_plain_field() {
        let item = item_with_info(json!({"title": "Dune"}));
        assert_eq!(render_name("{{title}}", &[&item]), "Dune");
    }

    #[test]
    fn test_render_missing_field_is_empty() {
        let item = item_with_info(json!({}));
        assert_eq!(render_name("{{title}}", &[&item]), "");
    }

    #[test]
    fn test_render_parent_path() {
        let parent = item_with_info(json!({"title": "Foundation"}));
        let child = item_with_info(json!({"title": "Foundation and Empire"}));
        assert_eq!(
            render_name("{{parent.title}} / {{title}}", &[&child, &parent]),
            "Foundation / Foundation and Empire"
        );
    }

    #[test]
    fn test_render_absent_parent_is_empty() {
        let child = item_with_info(json!({"title": "Foundation and Empire"}));
        assert_eq!(
            render_name("{{parent.title}} / {{title}}", &[&child]),
            " / Foundation and Empire"
        );
    }

    #[test]
    fn test_render_created_with_format() {
        let mut item = item_with_info(json!({}));
        item.created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(render_name("{{created!%Y}}", &[&item]), "2024");
    }

    #[test]
    fn test_render_created_without_format_is_iso8601() {
        let mut item = item_with_info(json!({}));
        item.created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            render_name("{{created}}", &[&item]),
            item.created.to_rfc3339()
        );
    }

    #[test]
    fn test_render_invalid_time_format_falls_back() {
        let mut item = item_with_info(json!({}));
        item.created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            render_name("{{created!%Q}}", &[&item]),
            item.created.to_rfc3339()
        );
    }

    #[test]
    fn test_render_numeric_field() {
        let item = item_with_info(json!({"series_num": 3}));
        assert_eq!(render_name("Vol. {{series_num}}", &[&item]), "Vol. 3");
    }

    #[test]
    fn test_render_null_field_is_empty() {
        let item = item_with_info(json!({"title": null}));
        assert_eq!(render_name("{{title}}", &[&item]), "");
    }

    #[test]
    fn test_render_no_placeholders() {
        let item = item_with_info(json!({}));
        assert_eq!(render_name("just text", &[&item]), "just text");
    }

    #[test]
    fn test_parent_depth() {
        assert_eq!(parent_depth("{{title}}"), 0);
        assert_eq!(parent_depth("{{parent.title}} / {{title}}"), 1);
        assert_eq!(parent_depth("{{parent.parent.title}}"), 2);
        assert_eq!(parent_depth("no placeholders"), 0);
    }

    #[test]
    fn test_deep_walk_beyond_chain_is_empty() {
        let item = item_with_info(json!({"title": "x"}));
        assert_eq!(render_name("{{parent.parent.title}}", &[&item]), "");
    }
}
