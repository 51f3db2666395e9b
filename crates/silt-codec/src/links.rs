use silt_types::Link;

use crate::escape::{decode_component, encode_component};

/// Render one link as a `Link` header segment:
/// `</{prefix}/{bucket}/{key}>; riaktag="{tag}"`.
pub fn format_link(prefix: &str, link: &Link) -> String {
    format!(
        "</{}/{}/{}>; riaktag=\"{}\"",
        prefix,
        encode_component(&link.bucket),
        encode_component(&link.key),
        encode_component(&link.tag)
    )
}

/// Render a link list as a single comma-joined header value.
///
/// The store requires multiple links to share one header, joined with `", "`.
pub fn format_link_header(prefix: &str, links: &[Link]) -> Option<String> {
    if links.is_empty() {
        return None;
    }
    let segments: Vec<String> = links.iter().map(|l| format_link(prefix, l)).collect();
    Some(segments.join(", "))
}

/// Parse a `Link` header value back into links.
///
/// Tolerates whitespace around each comma-separated segment. A segment that
/// does not match the grammar is skipped; one malformed link never fails the
/// whole parse.
pub fn parse_link_header(value: &str) -> Vec<Link> {
    value
        .split(',')
        .filter_map(|segment| parse_segment(segment.trim()))
        .collect()
}

fn parse_segment(segment: &str) -> Option<Link> {
    let rest = segment.strip_prefix("</")?;
    let (target, attrs) = rest.split_once('>')?;

    // Target is prefix/bucket/key, exactly three segments.
    let mut parts = target.split('/');
    let _prefix = parts.next()?;
    let bucket = parts.next()?;
    let key = parts.next()?;
    if parts.next().is_some() || bucket.is_empty() || key.is_empty() {
        return None;
    }

    let attrs = attrs.trim_start_matches(';').trim();
    let tag = attrs
        .strip_prefix("riaktag=\"")?
        .strip_suffix('"')?;

    Some(Link::new(
        decode_component(bucket)?,
        decode_component(key)?,
        decode_component(tag)?,
    ))
}
