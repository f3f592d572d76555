//! Route schemas and the rules they are built from.

use serde_json::Value;

/// A single constraint on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    /// Minimum length in characters.
    MinLength(usize),
    /// Maximum length in characters.
    MaxLength(usize),
    Email,
    /// Absolute `http`/`https` URL.
    Url,
    Number,
}

impl Rule {
    pub fn label(self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::MinLength(_) => "min_length",
            Rule::MaxLength(_) => "max_length",
            Rule::Email => "email",
            Rule::Url => "url",
            Rule::Number => "number",
        }
    }

    /// Evaluate the rule. `None` means the field is absent.
    ///
    /// Only `Required` rejects an absent field; the other rules pass it so that
    /// optional fields can still carry constraints.
    pub fn check(self, value: Option<&Value>) -> Result<(), String> {
        let value = match (self, value) {
            (Rule::Required, None) => return Err("is required".to_string()),
            (_, None) | (Rule::Required, Some(_)) => return Ok(()),
            (_, Some(v)) => v,
        };

        match self {
            Rule::Required => Ok(()),
            Rule::MinLength(min) => {
                let s = as_str(value)?;
                if s.chars().count() < min {
                    Err(format!("length must be at least {} characters long", min))
                } else {
                    Ok(())
                }
            }
            Rule::MaxLength(max) => {
                let s = as_str(value)?;
                if s.chars().count() > max {
                    Err(format!("length must be less than or equal to {} characters long", max))
                } else {
                    Ok(())
                }
            }
            Rule::Email => {
                if is_email(as_str(value)?) {
                    Ok(())
                } else {
                    Err("must be a valid email".to_string())
                }
            }
            Rule::Url => {
                if is_http_url(as_str(value)?) {
                    Ok(())
                } else {
                    Err("must be a valid uri".to_string())
                }
            }
            Rule::Number => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err("must be a number".to_string())
                }
            }
        }
    }
}

fn as_str(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "must be a string".to_string())
}

/// `local@domain.tld`: one `@`, non-empty local part, dotted domain with
/// non-empty labels of letters, digits and hyphens, alphabetic TLD of 2+ chars.
fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || s.chars().any(char::is_whitespace) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|l| {
        !l.is_empty()
            && !l.starts_with('-')
            && !l.ends_with('-')
            && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_http_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !s.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// A field and the rules applied to it, in evaluation order.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rules: &'static [Rule],
}

/// Declarative description of one route's body.
#[derive(Debug)]
pub struct Schema {
    pub route: &'static str,
    pub fields: &'static [FieldSpec],
}

pub const SIGNIN: Schema = Schema {
    route: "POST /signin",
    fields: &[
        FieldSpec { name: "email", rules: &[Rule::Required, Rule::Email] },
        FieldSpec { name: "password", rules: REQUIRED_TEXT },
    ],
};

pub const SIGNUP: Schema = Schema {
    route: "POST /signup",
    fields: &[
        FieldSpec { name: "name", rules: &[Rule::Required, Rule::MinLength(2), Rule::MaxLength(30)] },
        FieldSpec { name: "email", rules: &[Rule::Required, Rule::Email] },
        FieldSpec { name: "password", rules: REQUIRED_TEXT },
    ],
};

pub const USER_UPDATE: Schema = Schema {
    route: "PATCH /users/me",
    fields: &[
        FieldSpec { name: "name", rules: &[Rule::Required, Rule::MinLength(2), Rule::MaxLength(30)] },
        FieldSpec { name: "email", rules: &[Rule::Required, Rule::Email] },
    ],
};

const REQUIRED_URL: &[Rule] = &[Rule::Required, Rule::Url];
const REQUIRED_TEXT: &[Rule] = &[Rule::Required, Rule::MinLength(1)];
const REQUIRED_NUMBER: &[Rule] = &[Rule::Required, Rule::Number];

pub const MOVIE_CREATE: Schema = Schema {
    route: "POST /movies",
    fields: &[
        FieldSpec { name: "country", rules: REQUIRED_TEXT },
        FieldSpec { name: "director", rules: REQUIRED_TEXT },
        FieldSpec { name: "duration", rules: REQUIRED_NUMBER },
        FieldSpec { name: "year", rules: REQUIRED_TEXT },
        FieldSpec { name: "description", rules: REQUIRED_TEXT },
        FieldSpec { name: "image", rules: REQUIRED_URL },
        FieldSpec { name: "trailerLink", rules: REQUIRED_URL },
        FieldSpec { name: "thumbnail", rules: REQUIRED_URL },
        FieldSpec { name: "movieId", rules: REQUIRED_NUMBER },
        FieldSpec { name: "nameRU", rules: REQUIRED_TEXT },
        FieldSpec { name: "nameEN", rules: REQUIRED_TEXT },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email_rule() {
        for ok in ["a@b.com", "first.last+tag@mail.example.org", "x@sub-domain.io"] {
            assert!(Rule::Email.check(Some(&json!(ok))).is_ok(), "{ok}");
        }
        for bad in ["", "a@", "@b.com", "a@b", "a@@b.com", "a b@c.com", "a@b.c", "a@-b.com", "a@b.123"] {
            assert!(Rule::Email.check(Some(&json!(bad))).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // Two Cyrillic characters are four bytes.
        assert!(Rule::MinLength(2).check(Some(&json!("Ал"))).is_ok());
        assert!(Rule::MaxLength(2).check(Some(&json!("Ал"))).is_ok());
        assert!(Rule::MaxLength(1).check(Some(&json!("Ал"))).is_err());
    }

    #[test]
    fn test_type_mismatch_is_a_violation() {
        assert_eq!(
            Rule::MinLength(2).check(Some(&json!(42))).unwrap_err(),
            "must be a string"
        );
        assert!(Rule::Number.check(Some(&json!("12"))).is_err());
        assert!(Rule::Number.check(Some(&json!(12))).is_ok());
    }

    #[test]
    fn test_absent_field_only_fails_required() {
        assert!(Rule::Required.check(None).is_err());
        assert!(Rule::Email.check(None).is_ok());
        assert!(Rule::MaxLength(3).check(None).is_ok());
    }

    #[test]
    fn test_url_rule() {
        assert!(Rule::Url.check(Some(&json!("https://example.com/poster.jpg"))).is_ok());
        assert!(Rule::Url.check(Some(&json!("http://localhost:3000"))).is_ok());
        assert!(Rule::Url.check(Some(&json!("ftp://example.com"))).is_err());
        assert!(Rule::Url.check(Some(&json!("https://"))).is_err());
    }
}
