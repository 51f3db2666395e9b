//! Scripted in-memory transport for object-model tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use silt_codec::{FetchedValue, ObjectMeta, PutMeta};
use silt_transport::{
    GetResponse, PutResponse, Transport, TransportError, TransportResult,
};
use silt_types::{IndexValue, Quorum};

#[derive(Debug)]
pub struct GetCall {
    pub bucket: String,
    pub key: String,
    pub r: Option<Quorum>,
    pub vtag: Option<String>,
}

#[derive(Debug)]
pub struct PutCall {
    pub bucket: String,
    pub key: Option<String>,
    pub body: Bytes,
    pub meta: PutMeta,
    pub w: Option<Quorum>,
    pub dw: Option<Quorum>,
    pub return_body: bool,
}

/// Serves scripted responses and records every call.
#[derive(Default)]
pub struct MockTransport {
    pub gets: Mutex<VecDeque<Option<GetResponse>>>,
    pub puts: Mutex<VecDeque<PutResponse>>,
    pub get_log: Mutex<Vec<GetCall>>,
    pub put_log: Mutex<Vec<PutCall>>,
    pub delete_log: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue_get(&self, response: Option<GetResponse>) {
        self.gets.lock().unwrap().push_back(response);
    }

    pub fn queue_put(&self, response: PutResponse) {
        self.puts.lock().unwrap().push_back(response);
    }
}

/// A fetched single version with the given vclock, content type, and body.
pub fn fetched(vclock: &str, content_type: &str, data: &[u8]) -> FetchedValue {
    FetchedValue {
        vclock: Some(vclock.to_string()),
        meta: ObjectMeta {
            content_type: Some(content_type.to_string()),
            ..ObjectMeta::default()
        },
        data: Bytes::copy_from_slice(data),
    }
}

fn unscripted(op: &str) -> TransportError {
    TransportError::InvalidResponse(format!("unscripted {op} call"))
}

#[async_trait]
impl Transport for MockTransport {
    fn client_id(&self) -> &str {
        "rs_mock"
    }

    async fn ping(&self) -> TransportResult<bool> {
        Ok(true)
    }

    async fn get(
        &self,
        bucket: &str,
        key: &str,
        r: Option<Quorum>,
        vtag: Option<&str>,
    ) -> TransportResult<Option<GetResponse>> {
        self.get_log.lock().unwrap().push(GetCall {
            bucket: bucket.to_string(),
            key: key.to_string(),
            r,
            vtag: vtag.map(str::to_string),
        });
        self.gets
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| unscripted("get"))
    }

    async fn put(
        &self,
        bucket: &str,
        key: Option<&str>,
        body: Bytes,
        meta: PutMeta,
        w: Option<Quorum>,
        dw: Option<Quorum>,
        return_body: bool,
    ) -> TransportResult<PutResponse> {
        self.put_log.lock().unwrap().push(PutCall {
            bucket: bucket.to_string(),
            key: key.map(str::to_string),
            body,
            meta,
            w,
            dw,
            return_body,
        });
        self.puts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| unscripted("put"))
    }

    async fn delete(&self, bucket: &str, key: &str, _rw: Option<Quorum>) -> TransportResult<()> {
        self.delete_log
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_keys(&self, _bucket: &str) -> TransportResult<Vec<String>> {
        Err(unscripted("list_keys"))
    }

    async fn list_buckets(&self) -> TransportResult<Vec<String>> {
        Err(unscripted("list_buckets"))
    }

    async fn get_bucket_properties(&self, _bucket: &str) -> TransportResult<serde_json::Value> {
        Err(unscripted("get_bucket_properties"))
    }

    async fn set_bucket_properties(
        &self,
        _bucket: &str,
        _props: serde_json::Value,
    ) -> TransportResult<()> {
        Err(unscripted("set_bucket_properties"))
    }

    async fn index_query(
        &self,
        _bucket: &str,
        _field: &str,
        _start: &IndexValue,
        _end: Option<&IndexValue>,
    ) -> TransportResult<Vec<String>> {
        Err(unscripted("index_query"))
    }

    async fn mapreduce(
        &self,
        _inputs: serde_json::Value,
        _query: serde_json::Value,
        _timeout_ms: Option<u64>,
    ) -> TransportResult<serde_json::Value> {
        Err(unscripted("mapreduce"))
    }
}
