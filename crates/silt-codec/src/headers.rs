use std::collections::BTreeMap;

use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, LINK};
use silt_types::{is_int_field, IndexValue, Link};

use crate::error::{CodecError, CodecResult};
use crate::links::{format_link_header, parse_link_header};

/// Vector clock header. Round-trips opaquely; the codec never inspects it.
pub const VCLOCK_HEADER: &str = "x-silt-vclock";
/// Client identifier header, sent on writes.
pub const CLIENT_ID_HEADER: &str = "x-silt-clientid";
/// User-metadata header prefix: `X-Silt-Meta-<key>`.
pub const META_PREFIX: &str = "x-silt-meta-";
/// Secondary-index header prefix: `X-Silt-Index-<field>`.
pub const INDEX_PREFIX: &str = "x-silt-index-";
/// The standard Link header carries the link grammar.
pub const LINK_HEADER: &str = "link";

pub const ACCEPT_VALUE: &str = "text/plain, */*; q=0.5";

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Everything a put sends besides the body.
#[derive(Clone, Debug)]
pub struct PutMeta {
    pub content_type: String,
    pub links: Vec<Link>,
    pub indexes: Vec<(String, IndexValue)>,
    pub usermeta: BTreeMap<String, String>,
    pub vclock: Option<String>,
}

impl Default for PutMeta {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            links: Vec::new(),
            indexes: Vec::new(),
            usermeta: BTreeMap::new(),
            vclock: None,
        }
    }
}

/// Object metadata decoded from response headers.
///
/// `usermeta` and `indexes` are always present (empty when the response
/// carried none); headers the codec does not recognize land in `extra`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectMeta {
    pub content_type: Option<String>,
    pub usermeta: BTreeMap<String, String>,
    pub indexes: Vec<(String, IndexValue)>,
    pub links: Vec<Link>,
    pub extra: BTreeMap<String, String>,
}

/// Build the header map for a put/post.
///
/// Values aimed at one header name (several links, several values of one
/// index field) are joined with `", "` into a single header value. The
/// store requires the joined form; separate header entries are not
/// equivalent on this wire.
pub fn build_object_headers(
    meta: &PutMeta,
    client_id: &str,
    path_prefix: &str,
) -> CodecResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(CONTENT_TYPE, header_value(&meta.content_type)?);
    headers.insert(
        HeaderName::from_static(CLIENT_ID_HEADER),
        header_value(client_id)?,
    );

    if let Some(vclock) = &meta.vclock {
        headers.insert(HeaderName::from_static(VCLOCK_HEADER), header_value(vclock)?);
    }

    for (key, value) in &meta.usermeta {
        headers.insert(header_name(META_PREFIX, key)?, header_value(value)?);
    }

    let mut joined: BTreeMap<&str, String> = BTreeMap::new();
    for (field, value) in &meta.indexes {
        let entry = joined.entry(field.as_str()).or_default();
        if !entry.is_empty() {
            entry.push_str(", ");
        }
        entry.push_str(&value.to_wire());
    }
    for (field, value) in joined {
        headers.insert(header_name(INDEX_PREFIX, field)?, header_value(&value)?);
    }

    if let Some(link_header) = format_link_header(path_prefix, &meta.links) {
        headers.insert(LINK, header_value(&link_header)?);
    }

    Ok(headers)
}

/// Decode response headers into (vector clock, object metadata).
pub fn parse_object_meta(headers: &HeaderMap) -> CodecResult<(Option<String>, ObjectMeta)> {
    let mut vclock = None;
    let mut meta = ObjectMeta::default();

    for (name, value) in headers.iter() {
        let name = name.as_str();
        let value = value.to_str().map_err(|_| {
            CodecError::InvalidHeader(format!("header {name} is not valid text"))
        })?;

        if name == VCLOCK_HEADER {
            vclock = Some(value.to_string());
        } else if let Some(key) = name.strip_prefix(META_PREFIX) {
            meta.usermeta.insert(key.to_string(), value.to_string());
        } else if let Some(field) = name.strip_prefix(INDEX_PREFIX) {
            for token in csv_tokens(value) {
                meta.indexes.push((field.to_string(), index_value(field, &token)?));
            }
        } else if name == LINK_HEADER {
            meta.links.extend(parse_link_header(value));
        } else if name == "content-type" {
            meta.content_type = Some(value.to_string());
        } else {
            meta.extra.insert(name.to_string(), value.to_string());
        }
    }

    Ok((vclock, meta))
}

fn index_value(field: &str, token: &str) -> CodecResult<IndexValue> {
    if is_int_field(field) {
        token
            .parse::<i64>()
            .map(IndexValue::Int)
            .map_err(|_| CodecError::InvalidIndexValue {
                field: field.to_string(),
                token: token.to_string(),
            })
    } else {
        Ok(IndexValue::Bin(token.to_string()))
    }
}

/// Plain CSV tokenizing: split on commas, trim, strip one layer of
/// surrounding quotes. Commas inside quotes are not honored on this wire.
fn csv_tokens(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(t)
                .to_string()
        })
        .collect()
}

fn header_name(prefix: &str, suffix: &str) -> CodecResult<HeaderName> {
    HeaderName::from_bytes(format!("{prefix}{suffix}").as_bytes()).map_err(|_| {
        CodecError::InvalidHeader(format!("{suffix:?} is not a valid header name suffix"))
    })
}

fn header_value(value: &str) -> CodecResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| CodecError::InvalidHeader(format!("{value:?} is not a valid header value")))
}
