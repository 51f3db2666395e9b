use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

pub type EncodeFn = Arc<dyn Fn(&Value) -> ClientResult<Bytes> + Send + Sync>;
pub type DecodeFn = Arc<dyn Fn(&[u8]) -> ClientResult<Value> + Send + Sync>;

/// Content-type-keyed encoder/decoder registry.
///
/// A Bucket copies the Client's registry at construction, and a Record
/// snapshots the Bucket's at construction; mutating a registry never
/// retroactively affects objects built from an earlier copy. The functions
/// themselves are `Arc`'d, so copies are cheap.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    encoders: HashMap<String, EncodeFn>,
    decoders: HashMap<String, DecodeFn>,
}

impl CodecRegistry {
    /// A registry with the JSON pair registered under `application/json`
    /// and `text/json`.
    pub fn json_defaults() -> Self {
        let mut registry = Self::default();
        for content_type in ["application/json", "text/json"] {
            registry.register_encoder(content_type, |value: &Value| {
                serde_json::to_vec(value)
                    .map(Bytes::from)
                    .map_err(|e| ClientError::Encode(e.to_string()))
            });
            registry.register_decoder(content_type, |data: &[u8]| {
                serde_json::from_slice(data).map_err(|e| ClientError::Decode(e.to_string()))
            });
        }
        registry
    }

    pub fn register_encoder(
        &mut self,
        content_type: impl Into<String>,
        f: impl Fn(&Value) -> ClientResult<Bytes> + Send + Sync + 'static,
    ) {
        self.encoders.insert(content_type.into(), Arc::new(f));
    }

    pub fn register_decoder(
        &mut self,
        content_type: impl Into<String>,
        f: impl Fn(&[u8]) -> ClientResult<Value> + Send + Sync + 'static,
    ) {
        self.decoders.insert(content_type.into(), Arc::new(f));
    }

    pub fn remove_encoder(&mut self, content_type: &str) {
        self.encoders.remove(content_type);
    }

    pub fn remove_decoder(&mut self, content_type: &str) {
        self.decoders.remove(content_type);
    }

    pub fn encoder(&self, content_type: &str) -> Option<EncodeFn> {
        self.encoders.get(content_type).cloned()
    }

    pub fn decoder(&self, content_type: &str) -> Option<DecodeFn> {
        self.decoders.get(content_type).cloned()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut encoders: Vec<&String> = self.encoders.keys().collect();
        let mut decoders: Vec<&String> = self.decoders.keys().collect();
        encoders.sort();
        decoders.sort();
        f.debug_struct("CodecRegistry")
            .field("encoders", &encoders)
            .field("decoders", &decoders)
            .finish()
    }
}
