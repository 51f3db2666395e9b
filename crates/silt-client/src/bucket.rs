use std::sync::Arc;

use silt_transport::Transport;
use silt_types::{IndexValue, Quorum};

use crate::client::QuorumDefaults;
use crate::encoding::CodecRegistry;
use crate::error::ClientResult;
use crate::record::Record;
use crate::resolve::Resolve;

/// A namespace of keys, carrying default quorum settings and the
/// encoder/decoder registries.
///
/// Both defaults and registries are copied from the owning [`Client`] at
/// construction; mutating the client afterwards never affects a bucket that
/// already exists, and mutating a bucket never affects records already
/// constructed from it.
///
/// [`Client`]: crate::client::Client
#[derive(Clone)]
pub struct Bucket {
    transport: Arc<dyn Transport>,
    name: String,
    quorums: QuorumDefaults,
    registry: CodecRegistry,
    resolver: Option<Arc<dyn Resolve>>,
}

impl Bucket {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        name: String,
        quorums: QuorumDefaults,
        registry: CodecRegistry,
        resolver: Option<Arc<dyn Resolve>>,
    ) -> Self {
        Self {
            transport,
            name,
            quorums,
            registry,
            resolver,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quorums(&self) -> QuorumDefaults {
        self.quorums
    }

    /// Override one or more default quorum settings for this bucket.
    pub fn set_quorums(&mut self, quorums: QuorumDefaults) {
        self.quorums = quorums;
    }

    pub fn set_default_r(&mut self, r: Option<Quorum>) {
        self.quorums.r = r;
    }

    pub fn set_default_w(&mut self, w: Option<Quorum>) {
        self.quorums.w = w;
    }

    pub fn set_default_dw(&mut self, dw: Option<Quorum>) {
        self.quorums.dw = dw;
    }

    pub fn set_default_rw(&mut self, rw: Option<Quorum>) {
        self.quorums.rw = rw;
    }

    /// Register an encoder on this bucket's copy of the registry. Records
    /// already constructed keep their earlier snapshot.
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

    /// Set the reconciliation hook records constructed from this bucket
    /// will carry.
    pub fn set_resolver(&mut self, resolver: Arc<dyn Resolve>) {
        self.resolver = Some(resolver);
    }

    /// A fresh in-memory record; no network I/O. `key = None` lets the
    /// store choose a key at first store.
    pub fn new_record(&self, key: Option<&str>) -> ClientResult<Record> {
        Record::new(
            Arc::clone(&self.transport),
            self.name.clone(),
            key.map(str::to_string),
            self.quorums,
            self.registry.clone(),
            self.resolver.clone(),
        )
    }

    /// Fetch a key into a new record.
    pub async fn get(&self, key: &str) -> ClientResult<Record> {
        let mut record = self.new_record(Some(key))?;
        record.fetch().await?;
        Ok(record)
    }

    /// Every key in this bucket. Full-scan; not for production traffic.
    pub async fn list_keys(&self) -> ClientResult<Vec<String>> {
        Ok(self.transport.list_keys(&self.name).await?)
    }

    pub async fn get_properties(&self) -> ClientResult<serde_json::Value> {
        Ok(self.transport.get_bucket_properties(&self.name).await?)
    }

    pub async fn set_properties(&self, props: serde_json::Value) -> ClientResult<()> {
        Ok(self.transport.set_bucket_properties(&self.name, props).await?)
    }

    /// Exact secondary-index lookup.
    pub async fn index(&self, field: &str, value: impl Into<IndexValue>) -> ClientResult<Vec<String>> {
        Ok(self
            .transport
            .index_query(&self.name, field, &value.into(), None)
            .await?)
    }

    /// Range secondary-index lookup over `[start, end]`.
    pub async fn index_range(
        &self,
        field: &str,
        start: impl Into<IndexValue>,
        end: impl Into<IndexValue>,
    ) -> ClientResult<Vec<String>> {
        Ok(self
            .transport
            .index_query(&self.name, field, &start.into(), Some(&end.into()))
            .await?)
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .field("quorums", &self.quorums)
            .finish()
    }
}
