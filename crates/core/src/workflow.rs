//! Workflow input configuration types.
//!
//! A workflow's `inputs_config` JSONB column deserializes into
//! [`InputsConfig`]: an ordered list of input field descriptors plus an
//! optional designated primary-image field. At most one field may be marked
//! `multiple` — that field drives batch submission.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Field descriptors
// ---------------------------------------------------------------------------

/// The kind of form control a workflow input renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
    Image,
    Select,
    Textarea,
}

/// One input field of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputField {
    /// Field name as sent to the compute provider.
    pub name: String,
    /// Control kind.
    #[serde(rename = "type")]
    pub kind: InputKind,
    /// Human-readable label, used in validation error messages.
    pub label: String,
    /// Whether a value must be present before submission.
    #[serde(default)]
    pub required: bool,
    /// Options for `select` fields.
    #[serde(default)]
    pub options: Vec<String>,
    /// Default value applied when the form is opened.
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    /// Marks the batch-driving field. At most one field may set this.
    #[serde(default)]
    pub multiple: bool,
}

// ---------------------------------------------------------------------------
// InputsConfig
// ---------------------------------------------------------------------------

/// Ordered input configuration for one workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputsConfig {
    /// Input fields in display order.
    #[serde(default)]
    pub inputs: Vec<InputField>,
    /// Name of the field whose image is shown as the "before" side of a
    /// before/after pair. When unset, the first image field is used.
    #[serde(default)]
    pub primary_image_field: Option<String>,
}

impl InputsConfig {
    /// Validate structural invariants of the configuration.
    ///
    /// - At most one field may be marked `multiple`, and it must be an
    ///   image field.
    /// - `primary_image_field`, when set, must name an existing image field.
    pub fn validate(&self) -> Result<(), CoreError> {
        let batch_fields: Vec<&InputField> =
            self.inputs.iter().filter(|f| f.multiple).collect();
        if batch_fields.len() > 1 {
            return Err(CoreError::Validation(format!(
                "At most one input field may be marked multiple, found {}",
                batch_fields.len()
            )));
        }
        if let Some(field) = batch_fields.first() {
            if field.kind != InputKind::Image {
                return Err(CoreError::Validation(format!(
                    "Batch field '{}' must be an image field",
                    field.name
                )));
            }
        }
        if let Some(ref name) = self.primary_image_field {
            let known = self
                .inputs
                .iter()
                .any(|f| f.kind == InputKind::Image && &f.name == name);
            if !known {
                return Err(CoreError::Validation(format!(
                    "primary_image_field '{name}' does not name an image input"
                )));
            }
        }
        Ok(())
    }

    /// The batch-driving field, if the workflow has one.
    pub fn batch_field(&self) -> Option<&InputField> {
        self.inputs.iter().find(|f| f.multiple)
    }

    /// Name of the field holding the primary input image.
    ///
    /// Falls back to the first image field when no field is designated.
    pub fn primary_image_field(&self) -> Option<&str> {
        if let Some(ref name) = self.primary_image_field {
            return Some(name.as_str());
        }
        self.inputs
            .iter()
            .find(|f| f.kind == InputKind::Image)
            .map(|f| f.name.as_str())
    }

    /// Image fields that are uploaded once per submission and shared across
    /// all batch items (every image field except the batch field).
    pub fn static_image_fields(&self) -> impl Iterator<Item = &InputField> {
        self.inputs
            .iter()
            .filter(|f| f.kind == InputKind::Image && !f.multiple)
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&InputField> {
        self.inputs.iter().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Execution types
// ---------------------------------------------------------------------------

/// Workflows executed through the external compute provider.
pub const EXECUTION_TYPE_COMFY: &str = "comfy";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn image_field(name: &str, multiple: bool) -> InputField {
        InputField {
            name: name.to_string(),
            kind: InputKind::Image,
            label: name.to_string(),
            required: false,
            options: vec![],
            default_value: None,
            multiple,
        }
    }

    fn text_field(name: &str) -> InputField {
        InputField {
            name: name.to_string(),
            kind: InputKind::Text,
            label: name.to_string(),
            required: false,
            options: vec![],
            default_value: None,
            multiple: false,
        }
    }

    #[test]
    fn at_most_one_batch_field() {
        let config = InputsConfig {
            inputs: vec![image_field("a", true), image_field("b", true)],
            primary_image_field: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn single_batch_field_ok() {
        let config = InputsConfig {
            inputs: vec![image_field("photos", true), image_field("logo", false)],
            primary_image_field: None,
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_field().unwrap().name, "photos");
    }

    #[test]
    fn batch_field_must_be_image() {
        let mut field = text_field("names");
        field.multiple = true;
        let config = InputsConfig {
            inputs: vec![field],
            primary_image_field: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn primary_image_falls_back_to_first_image_field() {
        let config = InputsConfig {
            inputs: vec![text_field("prompt"), image_field("photo", false)],
            primary_image_field: None,
        };
        assert_eq!(config.primary_image_field(), Some("photo"));
    }

    #[test]
    fn designated_primary_image_wins() {
        let config = InputsConfig {
            inputs: vec![image_field("logo", false), image_field("photo", true)],
            primary_image_field: Some("photo".to_string()),
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.primary_image_field(), Some("photo"));
    }

    #[test]
    fn unknown_primary_image_rejected() {
        let config = InputsConfig {
            inputs: vec![image_field("logo", false)],
            primary_image_field: Some("missing".to_string()),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn static_image_fields_exclude_batch() {
        let config = InputsConfig {
            inputs: vec![
                image_field("photos", true),
                image_field("logo", false),
                text_field("prompt"),
            ],
            primary_image_field: None,
        };
        let statics: Vec<&str> = config
            .static_image_fields()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(statics, vec!["logo"]);
    }

    #[test]
    fn inputs_config_deserializes_from_json() {
        let json = serde_json::json!({
            "inputs": [
                { "name": "prompt", "type": "textarea", "label": "Prompt", "required": true },
                { "name": "photos", "type": "image", "label": "Photos", "multiple": true }
            ],
            "primary_image_field": "photos"
        });
        let config: InputsConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.inputs.len(), 2);
        assert_eq!(config.inputs[0].kind, InputKind::Textarea);
        assert!(config.inputs[1].multiple);
        assert!(config.validate().is_ok());
    }
}
