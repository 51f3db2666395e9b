//! Wire codec for the Silt client.
//!
//! Pure, transport-agnostic mapping between the object model's metadata and
//! the store's HTTP wire format: request header construction, the
//! link-header grammar, the comma-separated index-header grammar,
//! percent-encoded REST paths, and status-driven response decoding
//! (including the 300 "multiple choices" sibling listing).
//!
//! Nothing in this crate performs I/O.

pub mod error;
pub mod escape;
pub mod headers;
pub mod links;
pub mod response;

pub use error::{CodecError, CodecResult};
pub use escape::{build_rest_path, decode_component, encode_component};
pub use headers::{
    build_object_headers, parse_object_meta, ObjectMeta, PutMeta, ACCEPT_VALUE,
    CLIENT_ID_HEADER, DEFAULT_CONTENT_TYPE, INDEX_PREFIX, LINK_HEADER, META_PREFIX,
    VCLOCK_HEADER,
};
pub use links::{format_link, format_link_header, parse_link_header};
pub use response::{
    expect_status, parse_object_response, FetchedValue, ObjectResponse, WireResponse,
};
