//! JSON schema validation for structured model output
//!
//! Every terminal agent payload is validated before it reaches a client;
//! violations surface as `validation_failed` guidance the model can act on.

use jsonschema::JSONSchema;
use serde_json::Value;

/// A compiled JSON schema validator
pub struct SchemaValidator {
    compiled: JSONSchema,
}

impl SchemaValidator {
    /// Compile a schema. Fails only on malformed schemas, which are a
    /// programming error, so the message names the schema for diagnosis.
    pub fn new(schema: &Value) -> Result<Self, String> {
        let compiled = JSONSchema::compile(schema)
            .map_err(|e| format!("schema failed to compile: {}", e))?;
        Ok(Self { compiled })
    }

    /// Validate an instance, returning every violation message
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<String>> {
        let result = self.compiled.validate(instance);
        match result {
            Ok(()) => Ok(()),
            Err(errors) => Err(errors
                .map(|e| format!("{} at {}", e, e.instance_path))
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table_schema() -> Value {
        json!({
            "type": "object",
            "required": ["display", "rows"],
            "properties": {
                "display": {"type": "string", "enum": ["table", "markdown"]},
                "rows": {"type": "array"}
            }
        })
    }

    #[test]
    fn valid_instance_passes() {
        let validator = SchemaValidator::new(&table_schema()).unwrap();
        let instance = json!({"display": "table", "rows": []});
        assert!(validator.validate(&instance).is_ok());
    }

    #[test]
    fn violations_are_collected() {
        let validator = SchemaValidator::new(&table_schema()).unwrap();
        let instance = json!({"display": "chart"});
        let errors = validator.validate(&instance).unwrap_err();
        assert!(!errors.is_empty());
    }
}
