use bytes::Bytes;
use http::HeaderMap;

use crate::error::{CodecError, CodecResult};
use crate::headers::{parse_object_meta, ObjectMeta};

/// A fully-read HTTP response, as handed over by the transport.
#[derive(Clone, Debug)]
pub struct WireResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// One materialized value: vector clock, decoded metadata, raw body.
#[derive(Clone, Debug)]
pub struct FetchedValue {
    pub vclock: Option<String>,
    pub meta: ObjectMeta,
    pub data: Bytes,
}

/// The three shapes an object fetch/store response can take.
#[derive(Clone, Debug)]
pub enum ObjectResponse {
    /// 404: a valid "absent" result, not an error.
    Absent,
    /// 300: concurrent writes diverged; each entry is a sibling vtag that
    /// must be fetched separately.
    Siblings(Vec<String>),
    /// 200/201/204: a single value.
    Value(FetchedValue),
}

/// Assert the status is in the set the caller expects for this operation.
pub fn expect_status(resp: &WireResponse, expected: &[u16]) -> CodecResult<()> {
    if expected.contains(&resp.status) {
        Ok(())
    } else {
        Err(CodecError::UnexpectedStatus {
            status: resp.status,
            expected: expected.to_vec(),
            body: String::from_utf8_lossy(&resp.body).into_owned(),
        })
    }
}

/// Decode an object response, dispatching purely on status.
pub fn parse_object_response(
    resp: &WireResponse,
    expected: &[u16],
) -> CodecResult<ObjectResponse> {
    expect_status(resp, expected)?;
    match resp.status {
        404 => Ok(ObjectResponse::Absent),
        300 => Ok(ObjectResponse::Siblings(parse_sibling_list(&resp.body))),
        _ => {
            let (vclock, meta) = parse_object_meta(&resp.headers)?;
            Ok(ObjectResponse::Value(FetchedValue {
                vclock,
                meta,
                data: resp.body.clone(),
            }))
        }
    }
}

/// The 300 body is newline-separated sibling vtags; the first line is a
/// human-readable banner and carries no tag.
fn parse_sibling_list(body: &Bytes) -> Vec<String> {
    let text = String::from_utf8_lossy(body);
    let mut lines = text.trim().lines();
    lines.next();
    lines
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;

    fn resp(status: u16, body: &str) -> WireResponse {
        WireResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    #[test]
    fn not_found_is_absent() {
        let out = parse_object_response(&resp(404, ""), &[200, 300, 404]).unwrap();
        assert!(matches!(out, ObjectResponse::Absent));
    }

    #[test]
    fn conflict_discards_banner_line() {
        let body = "Siblings:\n6dQBm9oYA\n4v5xOg4bVwUYZdMkqf0d6I\n";
        let out = parse_object_response(&resp(300, body), &[200, 300, 404]).unwrap();
        match out {
            ObjectResponse::Siblings(tags) => {
                assert_eq!(tags, vec!["6dQBm9oYA", "4v5xOg4bVwUYZdMkqf0d6I"]);
            }
            other => panic!("expected siblings, got {other:?}"),
        }
    }

    #[test]
    fn conflict_with_banner_only_is_empty() {
        let out = parse_object_response(&resp(300, "Siblings:\n"), &[300]).unwrap();
        match out {
            ObjectResponse::Siblings(tags) => assert!(tags.is_empty()),
            other => panic!("expected siblings, got {other:?}"),
        }
    }

    #[test]
    fn success_carries_vclock_metadata_and_body() {
        let mut response = resp(200, "{\"name\":\"alice\"}");
        response
            .headers
            .insert("x-silt-vclock", HeaderValue::from_static("opaque=="));
        response
            .headers
            .insert("x-silt-meta-origin", HeaderValue::from_static("import"));
        let out = parse_object_response(&response, &[200, 300, 404]).unwrap();
        match out {
            ObjectResponse::Value(value) => {
                assert_eq!(value.vclock.as_deref(), Some("opaque=="));
                assert_eq!(value.meta.usermeta.get("origin").unwrap(), "import");
                assert_eq!(&value.data[..], b"{\"name\":\"alice\"}");
            }
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn success_without_metadata_has_empty_maps() {
        let out = parse_object_response(&resp(200, "x"), &[200]).unwrap();
        match out {
            ObjectResponse::Value(value) => {
                assert!(value.vclock.is_none());
                assert!(value.meta.usermeta.is_empty());
                assert!(value.meta.indexes.is_empty());
            }
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn status_outside_expected_set_is_an_error() {
        let err = parse_object_response(&resp(503, "overload"), &[200, 300, 404]).unwrap_err();
        match err {
            CodecError::UnexpectedStatus { status, expected, body } => {
                assert_eq!(status, 503);
                assert_eq!(expected, vec![200, 300, 404]);
                assert_eq!(body, "overload");
            }
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn expected_set_is_per_call() {
        // A 300 is an error for calls that did not declare it.
        let err = parse_object_response(&resp(300, "Siblings:\na\n"), &[200]).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedStatus { status: 300, .. }));
    }
}
