use async_trait::async_trait;
use bytes::Bytes;
use silt_codec::PutMeta;
use silt_types::{IndexValue, Quorum};

use crate::error::TransportResult;
use crate::types::{GetResponse, PutResponse};

/// One logical store operation per call.
///
/// All implementations must satisfy these invariants:
/// - A 404 on get is a valid absent result, never an error.
/// - A delete succeeds even when the key never existed.
/// - Quorum arguments are forwarded as request parameters; `None` falls
///   through to the store's own defaults.
/// - Errors propagate; the only swallowed failure is the documented
///   transient-fault retry inside an implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The client id sent on writes.
    fn client_id(&self) -> &str;

    /// Check that the store is alive.
    async fn ping(&self) -> TransportResult<bool>;

    /// Fetch a key. `vtag` selects one sibling of a conflicted object.
    async fn get(
        &self,
        bucket: &str,
        key: &str,
        r: Option<Quorum>,
        vtag: Option<&str>,
    ) -> TransportResult<Option<GetResponse>>;

    /// Store a value. With `key = None` the server chooses the key and the
    /// response surfaces it. With `return_body = false` the store is asked
    /// not to echo the object back.
    async fn put(
        &self,
        bucket: &str,
        key: Option<&str>,
        body: Bytes,
        meta: PutMeta,
        w: Option<Quorum>,
        dw: Option<Quorum>,
        return_body: bool,
    ) -> TransportResult<PutResponse>;

    /// Delete a key.
    async fn delete(&self, bucket: &str, key: &str, rw: Option<Quorum>) -> TransportResult<()>;

    /// List every key in a bucket. Requires a full scan server-side; not
    /// suitable for production traffic.
    async fn list_keys(&self, bucket: &str) -> TransportResult<Vec<String>>;

    /// List every bucket. Requires a full scan server-side; not suitable
    /// for production traffic.
    async fn list_buckets(&self) -> TransportResult<Vec<String>>;

    /// Fetch the bucket's properties document.
    async fn get_bucket_properties(&self, bucket: &str) -> TransportResult<serde_json::Value>;

    /// Replace bucket properties with the given JSON document.
    async fn set_bucket_properties(
        &self,
        bucket: &str,
        props: serde_json::Value,
    ) -> TransportResult<()>;

    /// Exact or range secondary-index query; returns matching keys.
    async fn index_query(
        &self,
        bucket: &str,
        field: &str,
        start: &IndexValue,
        end: Option<&IndexValue>,
    ) -> TransportResult<Vec<String>>;

    /// POST a map-reduce job document and return the parsed result.
    async fn mapreduce(
        &self,
        inputs: serde_json::Value,
        query: serde_json::Value,
        timeout_ms: Option<u64>,
    ) -> TransportResult<serde_json::Value>;
}
