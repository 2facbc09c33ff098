//! Filter expressions for store queries.

use std::cmp::Ordering;

use strome_proto::{FieldValue, Mapping};

use crate::error::StoreError;

/// One filter expression over an entity dictionary.
///
/// Field paths may be dotted (`name.firstName`) to reach into nested
/// mappings. A list of criteria is AND-ed; an empty list matches every row.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// field == value
    Eq { field: String, value: FieldValue },
    /// field != value (the field must be present and non-null)
    Ne { field: String, value: FieldValue },
    /// field < value
    Lt { field: String, value: FieldValue },
    /// field <= value
    Le { field: String, value: FieldValue },
    /// field > value
    Gt { field: String, value: FieldValue },
    /// field >= value
    Ge { field: String, value: FieldValue },
    /// Field is missing or null.
    IsNull { field: String },
    /// Field is present and non-null.
    IsNotNull { field: String },
    /// Text field matches a LIKE pattern (`%`, `_`, `\` escapes).
    Like { field: String, pattern: String },
    /// Sequence field holds an element equal to value.
    Contains { field: String, value: FieldValue },
    /// At least one of the nested criteria matches.
    Any(Vec<Criterion>),
    /// Store-specific expression, passed through uninterpreted.
    Raw(String),
}

impl Criterion {
    /// Create an equality criterion.
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal criterion.
    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than criterion.
    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-or-equal criterion.
    pub fn le(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than criterion.
    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-or-equal criterion.
    pub fn ge(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an is-null criterion.
    pub fn is_null(field: impl Into<String>) -> Self {
        Criterion::IsNull {
            field: field.into(),
        }
    }

    /// Create an is-not-null criterion.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Criterion::IsNotNull {
            field: field.into(),
        }
    }

    /// Create a LIKE criterion.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Criterion::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Create a sequence-membership criterion.
    pub fn contains(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Reject expressions the bundled stores cannot evaluate.
    pub fn validate(&self) -> Result<(), StoreError> {
        match self {
            Criterion::Raw(expr) => Err(StoreError::UnsupportedCriterion(expr.clone())),
            Criterion::Any(nested) => nested.iter().try_for_each(Criterion::validate),
            _ => Ok(()),
        }
    }

    /// Evaluate against a dictionary. `Raw` never matches.
    pub fn matches(&self, row: &Mapping) -> bool {
        let get = |field: &str| FieldValue::lookup(row, field).filter(|v| !v.is_null());

        match self {
            Criterion::Eq { field, value } => get(field).is_some_and(|v| values_equal(v, value)),
            Criterion::Ne { field, value } => get(field).is_some_and(|v| !values_equal(v, value)),
            Criterion::Lt { field, value } => {
                get(field).and_then(|v| compare_values(v, value)) == Some(Ordering::Less)
            }
            Criterion::Le { field, value } => matches!(
                get(field).and_then(|v| compare_values(v, value)),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Criterion::Gt { field, value } => {
                get(field).and_then(|v| compare_values(v, value)) == Some(Ordering::Greater)
            }
            Criterion::Ge { field, value } => matches!(
                get(field).and_then(|v| compare_values(v, value)),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Criterion::IsNull { field } => get(field).is_none(),
            Criterion::IsNotNull { field } => get(field).is_some(),
            Criterion::Like { field, pattern } => get(field)
                .and_then(FieldValue::as_text)
                .is_some_and(|s| like_match(s, pattern)),
            Criterion::Contains { field, value } => get(field)
                .and_then(FieldValue::as_sequence)
                .is_some_and(|items| items.iter().any(|item| values_equal(item, value))),
            Criterion::Any(nested) => nested.iter().any(|c| c.matches(row)),
            Criterion::Raw(_) => false,
        }
    }
}

/// Check that every criterion is supported.
pub fn validate_all(criteria: &[Criterion]) -> Result<(), StoreError> {
    criteria.iter().try_for_each(Criterion::validate)
}

/// Evaluate an AND-ed list of criteria.
pub fn matches_all(criteria: &[Criterion], row: &Mapping) -> bool {
    criteria.iter().all(|c| c.matches(row))
}

fn values_equal(a: &FieldValue, b: &FieldValue) -> bool {
    a == b || compare_values(a, b) == Some(Ordering::Equal)
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Option<Ordering> {
    match (a, b) {
        (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
        (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(b),
        (FieldValue::Integer(a), FieldValue::Float(b)) => (*a as f64).partial_cmp(b),
        (FieldValue::Float(a), FieldValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
        (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
        _ => None, // Incompatible types
    }
}

/// Match a string against a LIKE pattern.
///
/// `%` matches zero or more characters, `_` exactly one, and `\` escapes the
/// next pattern character.
pub fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_at(&value, &pattern)
}

fn like_at(value: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => value.is_empty(),
        Some(('%', rest)) => (0..=value.len()).any(|skip| like_at(&value[skip..], rest)),
        Some(('_', rest)) => !value.is_empty() && like_at(&value[1..], rest),
        Some(('\\', rest)) => match (rest.split_first(), value.split_first()) {
            (Some((p, rest)), Some((c, tail))) if p == c => like_at(tail, rest),
            _ => false,
        },
        Some((p, rest)) => value
            .split_first()
            .is_some_and(|(c, tail)| c == p && like_at(tail, rest)),
    }
}
