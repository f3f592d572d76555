//! Request body validation.
//!
//! # Data Flow
//! ```text
//! JSON body (serde_json::Value)
//!     → schema.rs (route schema: fields + rules)
//!     → validate() evaluates every rule of every field
//!     → Ok(()) or ValidationErrors (all violations, in schema order)
//! ```
//!
//! # Design Decisions
//! - Schemas are `const` descriptors, fixed at compile time
//! - Never stops at the first violation
//! - New rule kinds are new `Rule` variants; `validate` keeps its signature

pub mod schema;

use std::fmt;

use serde_json::Value;

pub use schema::{FieldSpec, Rule, Schema};

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    /// Short rule label, e.g. `min_length`.
    pub constraint: &'static str,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}", self.field, self.message)
    }
}

/// Every violation found in one body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Fields that failed at least one rule, in order, without duplicates.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = Vec::new();
        for v in &self.violations {
            if !fields.contains(&v.field) {
                fields.push(v.field);
            }
        }
        fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: ")?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Check `body` against `schema`, collecting every violation.
///
/// A non-object body is treated as an empty object, so each required field
/// reports its own violation.
pub fn validate(schema: &Schema, body: &Value) -> Result<(), ValidationErrors> {
    let object = body.as_object();
    let mut violations = Vec::new();

    for spec in schema.fields {
        let value = object
            .and_then(|o| o.get(spec.name))
            .filter(|v| !v.is_null());

        for rule in spec.rules {
            if let Err(message) = rule.check(value) {
                violations.push(Violation {
                    field: spec.name,
                    constraint: rule.label(),
                    message,
                });
                // A missing value fails every other rule too; one entry is enough.
                if value.is_none() {
                    break;
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { violations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::schema::{SIGNIN, SIGNUP};
    use serde_json::json;

    #[test]
    fn test_valid_signup_passes() {
        let body = json!({"name": "Al", "email": "a@b.com", "password": "x"});
        assert!(validate(&SIGNUP, &body).is_ok());
    }

    #[test]
    fn test_collects_every_violation() {
        let body = json!({"name": "A", "email": "not-an-email"});
        let errors = validate(&SIGNUP, &body).unwrap_err();
        assert_eq!(errors.fields(), vec!["name", "email", "password"]);
        let constraints: Vec<_> = errors.violations().iter().map(|v| v.constraint).collect();
        assert_eq!(constraints, vec!["min_length", "email", "required"]);
    }

    #[test]
    fn test_name_too_long() {
        let body = json!({"name": "x".repeat(31), "email": "a@b.com", "password": "p"});
        let errors = validate(&SIGNUP, &body).unwrap_err();
        assert_eq!(errors.violations().len(), 1);
        assert_eq!(errors.violations()[0].constraint, "max_length");
        assert!(errors.to_string().contains("\"name\""));
    }

    #[test]
    fn test_non_object_body_reports_all_required() {
        let errors = validate(&SIGNIN, &Value::Null).unwrap_err();
        assert_eq!(errors.fields(), vec!["email", "password"]);
    }

    #[test]
    fn test_null_counts_as_missing() {
        let body = json!({"email": null, "password": "p"});
        let errors = validate(&SIGNIN, &body).unwrap_err();
        assert_eq!(errors.violations()[0].constraint, "required");
    }

    #[test]
    fn test_empty_password_is_rejected() {
        let errors = validate(&SIGNUP, &json!({"name": "Al", "email": "a@b.com", "password": ""})).unwrap_err();
        assert_eq!(errors.fields(), vec!["password"]);
        assert_eq!(errors.violations()[0].constraint, "min_length");

        let errors = validate(&SIGNIN, &json!({"email": "a@b.com", "password": ""})).unwrap_err();
        assert_eq!(errors.fields(), vec!["password"]);
    }
}
