//! Pre-submission validation of workflow form input.
//!
//! Runs before any upload or provider call so a missing field never costs
//! the user an orphaned upload or a credit check.

use serde_json::Value;

use crate::error::CoreError;
use crate::workflow::{InputKind, InputsConfig};

/// Check that every required field has a usable value.
///
/// An image field is satisfied by newly provided files (`has_file`) or by a
/// pre-existing URL value carried over from a loaded preset. Any other field
/// is satisfied by a non-empty form value. The first failure aborts with the
/// offending field's label.
pub fn validate_required_inputs(
    config: &InputsConfig,
    form_values: &serde_json::Map<String, Value>,
    has_file: impl Fn(&str) -> bool,
) -> Result<(), CoreError> {
    for field in config.inputs.iter().filter(|f| f.required) {
        let value = form_values.get(&field.name);
        let satisfied = if field.kind == InputKind::Image {
            has_file(&field.name) || matches!(value, Some(Value::String(s)) if s.starts_with("http"))
        } else {
            match value {
                Some(Value::String(s)) => !s.is_empty(),
                Some(Value::Null) | None => false,
                Some(_) => true,
            }
        };

        if !satisfied {
            let what = if field.kind == InputKind::Image {
                "image"
            } else {
                "field"
            };
            return Err(CoreError::Validation(format!(
                "Missing {what}: {}",
                field.label
            )));
        }
    }
    Ok(())
}
