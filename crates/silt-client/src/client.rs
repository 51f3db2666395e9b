use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use silt_pool::{ConnectionManager, Endpoint};
use silt_transport::{HttpTransport, Transport};
use silt_types::{ensure_ascii, Quorum};

use crate::bucket::Bucket;
use crate::encoding::CodecRegistry;
use crate::error::ClientResult;
use crate::resolve::Resolve;

/// Default read/write/durable-write/delete quorum settings, inherited
/// client → bucket → record and overridable per call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuorumDefaults {
    pub r: Option<Quorum>,
    pub w: Option<Quorum>,
    pub dw: Option<Quorum>,
    pub rw: Option<Quorum>,
}

/// What the client does with buckets it has constructed.
///
/// `Retain` keeps every bucket in an owned map for the client's lifetime,
/// so repeated `bucket("x")` calls see one configuration; `Transient`
/// constructs a fresh bucket per call from the client's current defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BucketCachePolicy {
    #[default]
    Retain,
    Transient,
}

/// Construction-time client settings.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoints: Vec<Endpoint>,
    /// Sent on writes; generated at random when absent.
    pub client_id: Option<String>,
    /// REST path prefix the store is mounted under.
    pub prefix: String,
    pub mapred_prefix: String,
    pub quorums: QuorumDefaults,
    pub bucket_cache: BucketCachePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![Endpoint::new("127.0.0.1", 8098)],
            client_id: None,
            prefix: silt_transport::DEFAULT_PREFIX.to_string(),
            mapred_prefix: silt_transport::DEFAULT_MAPRED_PREFIX.to_string(),
            quorums: QuorumDefaults::default(),
            bucket_cache: BucketCachePolicy::default(),
        }
    }
}

/// The top-level handle: owns the transport, the default registries and
/// quorums, and an explicit bucket map.
pub struct Client {
    transport: Arc<dyn Transport>,
    quorums: QuorumDefaults,
    registry: CodecRegistry,
    resolver: Option<Arc<dyn Resolve>>,
    bucket_cache: BucketCachePolicy,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl Client {
    /// A client over a single endpoint with default settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(ClientConfig {
            endpoints: vec![Endpoint::new(host, port)],
            ..ClientConfig::default()
        })
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let pool = ConnectionManager::new(config.endpoints);
        let mut transport = HttpTransport::new(pool)
            .with_prefix(config.prefix)
            .with_mapred_prefix(config.mapred_prefix);
        if let Some(client_id) = config.client_id {
            transport = transport.with_client_id(client_id);
        }
        Self::with_transport_inner(Arc::new(transport), config.quorums, config.bucket_cache)
    }

    /// A client over a caller-supplied transport (an in-memory one in
    /// tests, or a transport with a custom pool).
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::with_transport_inner(transport, QuorumDefaults::default(), BucketCachePolicy::default())
    }

    fn with_transport_inner(
        transport: Arc<dyn Transport>,
        quorums: QuorumDefaults,
        bucket_cache: BucketCachePolicy,
    ) -> Self {
        Self {
            transport,
            quorums,
            registry: CodecRegistry::json_defaults(),
            resolver: None,
            bucket_cache,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn client_id(&self) -> &str {
        self.transport.client_id()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn quorums(&self) -> QuorumDefaults {
        self.quorums
    }

    /// Change the defaults future buckets inherit.
    pub fn set_quorums(&mut self, quorums: QuorumDefaults) {
        self.quorums = quorums;
    }

    /// Register an encoder future buckets inherit. Existing buckets keep
    /// their copy of the registry.
    pub fn register_encoder(
        &mut self,
        content_type: impl Into<String>,
        f: impl Fn(&serde_json::Value) -> ClientResult<bytes::Bytes> + Send + Sync + 'static,
    ) {
        self.registry.register_encoder(content_type, f);
    }

    pub fn register_decoder(
        &mut self,
        content_type: impl Into<String>,
        f: impl Fn(&[u8]) -> ClientResult<serde_json::Value> + Send + Sync + 'static,
    ) {
        self.registry.register_decoder(content_type, f);
    }

    /// Default reconciliation hook future buckets inherit.
    pub fn set_default_resolver(&mut self, resolver: Arc<dyn Resolve>) {
        self.resolver = Some(resolver);
    }

    /// Get (or construct) the bucket with this name.
    ///
    /// Under [`BucketCachePolicy::Retain`] the bucket is constructed once
    /// and kept for the client's lifetime; under `Transient` every call
    /// builds a fresh one from the client's current defaults.
    pub fn bucket(&self, name: &str) -> ClientResult<Bucket> {
        ensure_ascii("bucket name", name)?;

        if self.bucket_cache == BucketCachePolicy::Retain {
            let mut buckets = self.buckets.lock().expect("lock poisoned");
            if let Some(bucket) = buckets.get(name) {
                return Ok(bucket.clone());
            }
            let bucket = self.build_bucket(name);
            buckets.insert(name.to_string(), bucket.clone());
            Ok(bucket)
        } else {
            Ok(self.build_bucket(name))
        }
    }

    /// Drop a bucket from the owned map; the next `bucket(name)` call
    /// rebuilds it from the client's current defaults.
    pub fn evict_bucket(&self, name: &str) {
        self.buckets.lock().expect("lock poisoned").remove(name);
    }

    fn build_bucket(&self, name: &str) -> Bucket {
        Bucket::new(
            Arc::clone(&self.transport),
            name.to_string(),
            self.quorums,
            self.registry.clone(),
            self.resolver.clone(),
        )
    }

    /// Check that the store is alive.
    pub async fn ping(&self) -> ClientResult<bool> {
        Ok(self.transport.ping().await?)
    }

    /// Every bucket in the store. Full-scan; not for production traffic.
    pub async fn list_buckets(&self) -> ClientResult<Vec<String>> {
        Ok(self.transport.list_buckets().await?)
    }

    /// POST a map-reduce job document and return the parsed result.
    pub async fn mapreduce(
        &self,
        inputs: serde_json::Value,
        query: serde_json::Value,
        timeout_ms: Option<u64>,
    ) -> ClientResult<serde_json::Value> {
        Ok(self.transport.mapreduce(inputs, query, timeout_ms).await?)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.client_id())
            .field("quorums", &self.quorums)
            .field("bucket_cache", &self.bucket_cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use silt_transport::{GetResponse, PutResponse};
    use silt_types::TypeError;

    use super::*;
    use crate::error::ClientError;
    use crate::test_util::{fetched, MockTransport};

    fn client(mock: &Arc<MockTransport>) -> Client {
        Client::with_transport(mock.clone())
    }

    #[test]
    fn non_ascii_bucket_name_is_rejected() {
        let mock = MockTransport::new();
        let err = client(&mock).bucket("ведро").unwrap_err();
        assert!(matches!(err, ClientError::Type(TypeError::NonAscii { .. })));
    }

    #[test]
    fn retained_buckets_keep_their_construction_time_defaults() {
        let mock = MockTransport::new();
        let mut client = client(&mock);

        let first = client.bucket("users").unwrap();
        assert_eq!(first.quorums().r, None);

        // Mutating the client later must not affect the cached bucket.
        client.set_quorums(QuorumDefaults {
            r: Some(Quorum::All),
            ..QuorumDefaults::default()
        });
        let again = client.bucket("users").unwrap();
        assert_eq!(again.quorums().r, None);

        // Eviction lets the next construction see the new defaults.
        client.evict_bucket("users");
        let rebuilt = client.bucket("users").unwrap();
        assert_eq!(rebuilt.quorums().r, Some(Quorum::All));
    }

    #[test]
    fn transient_policy_rebuilds_every_call() {
        let mock = MockTransport::new();
        let mut client = Client::with_transport_inner(
            mock.clone(),
            QuorumDefaults::default(),
            BucketCachePolicy::Transient,
        );
        client.set_quorums(QuorumDefaults {
            w: Some(Quorum::Majority),
            ..QuorumDefaults::default()
        });
        assert_eq!(client.bucket("b").unwrap().quorums().w, Some(Quorum::Majority));
    }

    #[test]
    fn registry_mutation_is_not_retroactive_on_buckets() {
        let mock = MockTransport::new();
        let mut client = client(&mock);
        let bucket = client.bucket("blobs").unwrap();

        client.register_decoder("application/x-custom", |_data| Ok(json!("decoded")));

        // The pre-existing (cached) bucket still lacks the decoder.
        let mut record = bucket.new_record(Some("k")).unwrap();
        record.set_content_type("application/x-custom").unwrap();
        record.set_raw_data(&b"x"[..]).unwrap();
        assert!(matches!(record.data(), Err(ClientError::NoDecoder(_))));

        // A bucket built after the registration sees it.
        client.evict_bucket("blobs");
        let fresh = client.bucket("blobs").unwrap();
        let mut record = fresh.new_record(Some("k")).unwrap();
        record.set_content_type("application/x-custom").unwrap();
        record.set_raw_data(&b"x"[..]).unwrap();
        assert_eq!(record.data().unwrap(), &json!("decoded"));
    }

    #[test]
    fn bucket_registry_mutation_does_not_reach_existing_records() {
        let mock = MockTransport::new();
        let client = client(&mock);
        let mut bucket = client.bucket("blobs").unwrap();

        let mut early = bucket.new_record(Some("k")).unwrap();
        bucket.register_decoder("application/x-custom", |_data| Ok(json!("decoded")));
        let mut late = bucket.new_record(Some("k2")).unwrap();

        early.set_content_type("application/x-custom").unwrap();
        early.set_raw_data(&b"x"[..]).unwrap();
        assert!(matches!(early.data(), Err(ClientError::NoDecoder(_))));

        late.set_content_type("application/x-custom").unwrap();
        late.set_raw_data(&b"x"[..]).unwrap();
        assert_eq!(late.data().unwrap(), &json!("decoded"));
    }

    #[tokio::test]
    async fn ping_forwards_to_the_transport() {
        let mock = MockTransport::new();
        assert!(client(&mock).ping().await.unwrap());
    }

    #[tokio::test]
    async fn bucket_get_fetches_a_record() {
        let mock = MockTransport::new();
        mock.queue_get(Some(GetResponse::Value(fetched(
            "c1",
            "application/json",
            b"{\"ok\":true}",
        ))));
        let client = client(&mock);
        let mut record = client.bucket("users").unwrap().get("alice").await.unwrap();
        assert!(record.exists());
        assert_eq!(record.data().unwrap(), &json!({"ok": true}));
    }

    #[tokio::test]
    async fn scenario_keyless_put_then_get_round_trips() {
        let mock = MockTransport::new();
        let client = client(&mock);
        let bucket = client.bucket("b").unwrap();

        let mut record = bucket.new_record(None).unwrap();
        record.set_data(json!({})).unwrap();
        mock.queue_put(PutResponse {
            generated_key: Some("generated0".into()),
            body: None,
        });
        record.store().await.unwrap();
        let key = record.key().unwrap().to_string();
        assert_eq!(key, "generated0");

        let written = mock.put_log.lock().unwrap()[0].body.clone();
        mock.queue_get(Some(GetResponse::Value(fetched(
            "c1",
            "application/json",
            &written,
        ))));
        let mut fetched_record = bucket.get(&key).await.unwrap();
        assert_eq!(fetched_record.data().unwrap(), &json!({}));
    }

    #[tokio::test]
    async fn scenario_delete_of_missing_key_completes() {
        let mock = MockTransport::new();
        let client = client(&mock);
        let mut record = client
            .bucket("b")
            .unwrap()
            .new_record(Some("missing"))
            .unwrap();
        record.delete().await.unwrap();
        assert!(!record.exists());
    }

    #[tokio::test]
    async fn bucket_quorum_defaults_flow_into_record_requests() {
        let mock = MockTransport::new();
        let client = client(&mock);
        let mut bucket = client.bucket("users").unwrap();
        bucket.set_default_r(Some(Quorum::Count(2)));

        mock.queue_get(None);
        bucket.get("alice").await.unwrap();
        assert_eq!(mock.get_log.lock().unwrap()[0].r, Some(Quorum::Count(2)));

        // A call-site override wins over the bucket default.
        let mut record = bucket.new_record(Some("alice")).unwrap();
        mock.queue_get(None);
        record.fetch_opts(Some(Quorum::All)).await.unwrap();
        assert_eq!(mock.get_log.lock().unwrap()[1].r, Some(Quorum::All));
    }
}
