use serde::Serialize;

use crate::model::draft::Draft;

/// Outcome of checking a draft against its required fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationResult {
    Pass,
    /// The first unmet requirement, in the order the fields were listed
    Fail { field: String, message: String },
}

impl ValidationResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationResult::Pass)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationResult::Pass => None,
            ValidationResult::Fail { message, .. } => Some(message),
        }
    }
}

/// Check `required` paths in order and report the first missing one.
///
/// A field is missing when its value is `""` or `null`, when it is absent,
/// or (for `parent.child` paths) when the parent object is absent.
/// Whitespace-only text counts as filled in.
pub fn validate(draft: &Draft, required: &[&str]) -> ValidationResult {
    for path in required {
        let missing = draft.get(path).is_none_or(|v| v.is_blank());
        if missing {
            let label = draft.schema().label_for(path);
            return ValidationResult::Fail {
                field: path.to_string(),
                message: format!("{} is required", label),
            };
        }
    }
    ValidationResult::Pass
}

/// Validate against the schema's own required set.
pub fn validate_required(draft: &Draft) -> ValidationResult {
    validate(draft, &draft.schema().required_spec())
}
