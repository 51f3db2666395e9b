use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A secondary-index value.
///
/// The store distinguishes binary (string) and integer index fields by a
/// field-name suffix: a field ending in `_int` holds integers and supports
/// numeric range queries; any other field holds strings compared bytewise.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexValue {
    Bin(String),
    Int(i64),
}

impl IndexValue {
    /// The value as it appears in an index header or query path.
    pub fn to_wire(&self) -> String {
        match self {
            IndexValue::Bin(s) => s.clone(),
            IndexValue::Int(n) => n.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IndexValue::Bin(_) => "binary",
            IndexValue::Int(_) => "integer",
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Bin(s) => f.write_str(s),
            IndexValue::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for IndexValue {
    fn from(s: &str) -> Self {
        IndexValue::Bin(s.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(s: String) -> Self {
        IndexValue::Bin(s)
    }
}

impl From<i64> for IndexValue {
    fn from(n: i64) -> Self {
        IndexValue::Int(n)
    }
}

/// Whether a field name follows the integer-index suffix convention.
pub fn is_int_field(field: &str) -> bool {
    field.ends_with("_int")
}

/// Check that a value's kind matches the field's suffix convention.
pub fn check_field_value(field: &str, value: &IndexValue) -> Result<(), TypeError> {
    let ok = match value {
        IndexValue::Int(_) => is_int_field(field),
        IndexValue::Bin(_) => !is_int_field(field),
    };
    if ok {
        Ok(())
    } else {
        Err(TypeError::IndexValueKind {
            field: field.to_string(),
            expected: if is_int_field(field) {
                "integer"
            } else {
                "binary"
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_suffix_detection() {
        assert!(is_int_field("age_int"));
        assert!(!is_int_field("age"));
        assert!(!is_int_field("email_bin"));
        assert!(!is_int_field("int"));
    }

    #[test]
    fn wire_form() {
        assert_eq!(IndexValue::Bin("x@y.z".into()).to_wire(), "x@y.z");
        assert_eq!(IndexValue::Int(-42).to_wire(), "-42");
    }

    #[test]
    fn check_matching_kinds() {
        check_field_value("age_int", &IndexValue::Int(30)).unwrap();
        check_field_value("email_bin", &IndexValue::Bin("a@b".into())).unwrap();
    }

    #[test]
    fn check_rejects_string_in_int_field() {
        let err = check_field_value("age_int", &IndexValue::Bin("30".into())).unwrap_err();
        assert!(matches!(err, TypeError::IndexValueKind { expected: "integer", .. }));
    }

    #[test]
    fn check_rejects_int_in_bin_field() {
        let err = check_field_value("email_bin", &IndexValue::Int(1)).unwrap_err();
        assert!(matches!(err, TypeError::IndexValueKind { expected: "binary", .. }));
    }

    #[test]
    fn from_impls() {
        assert_eq!(IndexValue::from("a"), IndexValue::Bin("a".into()));
        assert_eq!(IndexValue::from(7i64), IndexValue::Int(7));
    }

    #[test]
    fn ordering_is_total() {
        let mut values = vec![
            IndexValue::Int(2),
            IndexValue::Bin("b".into()),
            IndexValue::Int(1),
            IndexValue::Bin("a".into()),
        ];
        values.sort();
        values.dedup();
        assert_eq!(values.len(), 4);
    }
}
