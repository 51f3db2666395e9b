use thiserror::Error;

/// Errors produced by identifier and value validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("{what} must be ASCII, got {value:?}")]
    NonAscii { what: &'static str, value: String },

    #[error("index field {field:?} takes {expected} values")]
    IndexValueKind {
        field: String,
        expected: &'static str,
    },

    #[error("invalid quorum value: {0:?}")]
    InvalidQuorum(String),
}
