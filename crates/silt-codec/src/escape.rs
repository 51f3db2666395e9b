use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside the unreserved set is escaped, in both path segments
/// and query parameters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode one path segment or query token.
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Decode a percent-encoded component. Returns `None` when the escape
/// sequences do not decode to valid UTF-8.
pub fn decode_component(s: &str) -> Option<String> {
    percent_decode_str(s)
        .decode_utf8()
        .ok()
        .map(|cow| cow.into_owned())
}

/// Build `/{prefix}[/{bucket}[/{key}]][?{params}]`, every segment and
/// parameter percent-encoded.
pub fn build_rest_path(
    prefix: &str,
    bucket: Option<&str>,
    key: Option<&str>,
    params: &[(&str, String)],
) -> String {
    let mut path = format!("/{prefix}");
    if let Some(bucket) = bucket {
        path.push('/');
        path.push_str(&encode_component(bucket));
        if let Some(key) = key {
            path.push('/');
            path.push_str(&encode_component(key));
        }
    }
    if !params.is_empty() {
        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect();
        path.push('?');
        path.push_str(&query.join("&"));
    }
    path
}
