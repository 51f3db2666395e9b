use crate::error::TypeError;

/// Validate that an identifier is pure ASCII.
///
/// Bucket names, keys, index field names, and user-metadata keys travel in
/// URL paths and header names, and the wire format has no agreed encoding
/// for non-ASCII text in those positions. Validation happens before any
/// network I/O.
pub fn ensure_ascii(what: &'static str, value: &str) -> Result<(), TypeError> {
    if value.is_ascii() {
        Ok(())
    } else {
        Err(TypeError::NonAscii {
            what,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes() {
        ensure_ascii("key", "plain-ascii_123.~").unwrap();
    }

    #[test]
    fn empty_passes() {
        ensure_ascii("bucket name", "").unwrap();
    }

    #[test]
    fn non_ascii_rejected() {
        let err = ensure_ascii("key", "clé").unwrap_err();
        assert_eq!(
            err,
            TypeError::NonAscii {
                what: "key",
                value: "clé".into()
            }
        );
    }

    #[test]
    fn error_names_the_field() {
        let err = ensure_ascii("bucket name", "ведро").unwrap_err();
        assert!(err.to_string().contains("bucket name"));
    }
}
