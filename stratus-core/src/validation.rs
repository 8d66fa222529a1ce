//! Plan-time field validation
//!
//! Validators are pure functions of a value and its field path, returning
//! warnings and field-scoped errors. They never touch the network.

use regex::Regex;

use crate::resource::Value;

/// Validation error scoped to a field path
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Warnings and errors collected while validating
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
    pub errors: Vec<ValidationError>,
}

impl Diagnostics {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            warnings: Vec::new(),
            errors: vec![ValidationError::new(path, message)],
        }
    }

    pub fn push_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::new(path, message));
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A field validator: `(value, field path) -> diagnostics`
pub type ValidateFn = fn(&Value, &str) -> Diagnostics;

/// Integer within a closed range
pub fn int_between(value: &Value, path: &str, min: i64, max: i64) -> Diagnostics {
    match value {
        Value::Int(n) if (min..=max).contains(n) => Diagnostics::ok(),
        Value::Int(n) => Diagnostics::error(
            path,
            format!("expected {} to be in the range ({} - {}), got {}", path, min, max, n),
        ),
        other => Diagnostics::error(
            path,
            format!("expected type of {} to be Int, got {}", path, other.type_name()),
        ),
    }
}

/// Non-empty string
pub fn string_not_empty(value: &Value, path: &str) -> Diagnostics {
    match value {
        Value::String(s) if !s.trim().is_empty() => Diagnostics::ok(),
        Value::String(_) => Diagnostics::error(path, format!("{} must not be empty", path)),
        other => Diagnostics::error(
            path,
            format!("expected type of {} to be String, got {}", path, other.type_name()),
        ),
    }
}

/// String matching a regular expression
pub fn string_matches(value: &Value, path: &str, pattern: &Regex, message: &str) -> Diagnostics {
    match value {
        Value::String(s) if pattern.is_match(s) => Diagnostics::ok(),
        Value::String(s) => Diagnostics::error(path, format!("{} {:?}: {}", path, s, message)),
        other => Diagnostics::error(
            path,
            format!("expected type of {} to be String, got {}", path, other.type_name()),
        ),
    }
}

/// String equal to one of the allowed values
pub fn string_in_slice(value: &Value, path: &str, allowed: &[&str]) -> Diagnostics {
    match value {
        Value::String(s) if allowed.contains(&s.as_str()) => Diagnostics::ok(),
        Value::String(s) => Diagnostics::error(
            path,
            format!(
                "expected {} to be one of [{}], got {}",
                path,
                allowed.join(", "),
                s
            ),
        ),
        other => Diagnostics::error(
            path,
            format!("expected type of {} to be String, got {}", path, other.type_name()),
        ),
    }
}

/// String containing every required placeholder
pub fn string_contains_all(value: &Value, path: &str, required: &[&str]) -> Diagnostics {
    let Value::String(s) = value else {
        return Diagnostics::error(
            path,
            format!("expected type of {} to be String, got {}", path, value.type_name()),
        );
    };

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|part| !s.contains(part))
        .collect();
    if missing.is_empty() {
        Diagnostics::ok()
    } else {
        Diagnostics::error(
            path,
            format!("{} must contain {}", path, missing.join(", ")),
        )
    }
}
