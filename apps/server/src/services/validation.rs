//! JSON Schema validation for item payloads.

use jsonschema::Validator;
use serde_json::Value;

use crate::error::{ServerError, ServerResult};

/// Validates an item `info` payload against its type's item schema.
///
/// An empty schema object accepts everything, matching types that never
/// configured one.
pub fn validate_against_schema(data: &Value, schema: &Value) -> ServerResult<()> {
    let validator = Validator::new(schema)
        .map_err(|e| ServerError::Internal(format!("Invalid JSON Schema: {}", e)))?;

    if let Err(error) = validator.validate(data) {
        return Err(ServerError::Validation(error.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn book_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "author": { "type": "string" },
                "pages": { "type": "number", "minimum": 1 }
            },
            "required": ["title", "author"]
        })
    }

    #[test]
    fn test_valid_payload() {
        let data = json!({"title": "Dune", "author": "Herbert", "pages": 412});
        assert!(validate_against_schema(&data, &book_schema()).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let data = json!({"title": "Dune"});
        let err = validate_against_schema(&data, &book_schema()).unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn test_type_mismatch() {
        let data = json!({"title": "Dune", "author": "Herbert", "pages": "lots"});
        assert!(validate_against_schema(&data, &book_schema()).is_err());
    }

    #[test]
    fn test_additional_properties_rejected() {
        let schema = json!({
            "type": "object",
            "properties": { "title": { "type": "string" } },
            "additionalProperties": false,
            "required": ["title"]
        });
        let data = json!({"title": "Dune", "publisher": "Chilton"});
        assert!(validate_against_schema(&data, &schema).is_err());
    }

    #[test]
    fn test_empty_schema_accepts_anything() {
        let data = json!({"whatever": [1, 2, 3]});
        assert!(validate_against_schema(&data, &json!({})).is_ok());
    }
}
