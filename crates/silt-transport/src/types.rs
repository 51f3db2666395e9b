use silt_codec::FetchedValue;

/// Result of a fetch that found something.
#[derive(Clone, Debug)]
pub enum GetResponse {
    /// A single, resolved value.
    Value(FetchedValue),
    /// Concurrent writes diverged; each vtag names a sibling that must be
    /// fetched separately.
    Siblings(Vec<String>),
}

/// Result of a put.
#[derive(Clone, Debug)]
pub struct PutResponse {
    /// The key the server chose, when the caller supplied none. Surfaced
    /// even when the caller suppressed the response body.
    pub generated_key: Option<String>,
    /// The echoed value (or sibling listing) when the caller asked for the
    /// body back; `None` for `returnbody=false` puts.
    pub body: Option<GetResponse>,
}
