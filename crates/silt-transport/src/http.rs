use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE, HOST, LOCATION};
use http::{Method, Request};
use http_body_util::{BodyExt, Full};
use serde_json::json;

use silt_codec::{
    build_object_headers, build_rest_path, encode_component, expect_status,
    parse_object_response, ObjectResponse, PutMeta, WireResponse, DEFAULT_CONTENT_TYPE,
};
use silt_pool::{ConnectionManager, PooledConnection};
use silt_types::{ensure_ascii, IndexValue, Quorum};

use crate::error::{TransportError, TransportResult};
use crate::traits::Transport;
use crate::types::{GetResponse, PutResponse};
use crate::{DEFAULT_MAPRED_PREFIX, DEFAULT_PREFIX, RETRY_COUNT};

/// The real transport: one logical operation as one or more HTTP requests
/// over a pooled connection, with bounded retry on transient faults.
pub struct HttpTransport {
    pool: ConnectionManager,
    client_id: String,
    prefix: String,
    mapred_prefix: String,
}

impl HttpTransport {
    /// A transport with a random client id and default path prefixes.
    pub fn new(pool: ConnectionManager) -> Self {
        Self {
            pool,
            client_id: random_client_id(),
            prefix: DEFAULT_PREFIX.to_string(),
            mapred_prefix: DEFAULT_MAPRED_PREFIX.to_string(),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_mapred_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mapred_prefix = prefix.into();
        self
    }

    pub fn pool(&self) -> &ConnectionManager {
        &self.pool
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Issue one request, retrying transient faults.
    ///
    /// Each attempt borrows a pooled connection; a successful exchange gives
    /// the connection back, a failed one discards it so the next attempt
    /// dials fresh. Well-formed error responses come back as `Ok` here;
    /// status checking belongs to the parse step.
    async fn request(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> TransportResult<WireResponse> {
        let mut last = String::new();
        for attempt in 1..=RETRY_COUNT {
            let mut conn = self.pool.take().await?;
            let mut req = Request::builder()
                .method(method.clone())
                .uri(path)
                .header(HOST, conn.endpoint().to_string())
                .body(Full::new(body.clone()))?;
            req.headers_mut().extend(headers.clone());

            let outcome = exchange(&mut conn, req).await;
            match outcome {
                Ok(resp) => {
                    tracing::debug!(%method, path, status = resp.status, "request complete");
                    drop(conn);
                    return Ok(resp);
                }
                Err(err) if is_transient(&err) => {
                    tracing::warn!(%method, path, attempt, error = %err, "transient fault, retrying");
                    last = err.to_string();
                    conn.discard();
                }
                Err(err) => {
                    conn.discard();
                    return Err(TransportError::Connection(err));
                }
            }
        }
        Err(TransportError::RetriesExhausted {
            attempts: RETRY_COUNT,
            last,
        })
    }

    fn object_path(
        &self,
        bucket: &str,
        key: Option<&str>,
        params: &[(&str, String)],
    ) -> String {
        build_rest_path(&self.prefix, Some(bucket), key, params)
    }
}

/// Send the request and read the whole response body.
async fn exchange(
    conn: &mut PooledConnection,
    req: Request<Full<Bytes>>,
) -> hyper::Result<WireResponse> {
    let resp = conn.send(req).await?;
    let (parts, body) = resp.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok(WireResponse {
        status: parts.status.as_u16(),
        headers: parts.headers,
        body,
    })
}

/// The transient class: a reset connection, or an HTTP-level fault
/// (truncated or unparseable response, request canceled by a peer hang-up).
/// Anything else (connect refused, permission errors, timeouts from the
/// OS) is fatal on first occurrence.
fn is_transient(err: &hyper::Error) -> bool {
    if err.is_parse() || err.is_incomplete_message() || err.is_canceled() {
        return true;
    }
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            return io.kind() == std::io::ErrorKind::ConnectionReset;
        }
        source = inner.source();
    }
    false
}

fn random_client_id() -> String {
    format!("rs_{:08x}", rand::random::<u32>())
}

fn json_body(resp: &WireResponse) -> TransportResult<serde_json::Value> {
    Ok(serde_json::from_slice(&resp.body)?)
}

fn string_list(value: &serde_json::Value, field: &str) -> TransportResult<Vec<String>> {
    value
        .get(field)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .ok_or_else(|| {
            TransportError::InvalidResponse(format!("response JSON has no {field:?} list"))
        })
}

fn push_quorum(params: &mut Vec<(&'static str, String)>, name: &'static str, q: Option<Quorum>) {
    if let Some(q) = q {
        params.push((name, q.to_wire()));
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn ping(&self) -> TransportResult<bool> {
        let resp = self
            .request(Method::GET, "/ping", HeaderMap::new(), Bytes::new())
            .await?;
        Ok(resp.status == 200 && &resp.body[..] == b"OK")
    }

    async fn get(
        &self,
        bucket: &str,
        key: &str,
        r: Option<Quorum>,
        vtag: Option<&str>,
    ) -> TransportResult<Option<GetResponse>> {
        ensure_ascii("bucket name", bucket)?;
        ensure_ascii("key", key)?;

        let mut params = Vec::new();
        push_quorum(&mut params, "r", r);
        if let Some(vtag) = vtag {
            params.push(("vtag", vtag.to_string()));
        }
        let path = self.object_path(bucket, Some(key), &params);
        let resp = self
            .request(Method::GET, &path, HeaderMap::new(), Bytes::new())
            .await?;

        match parse_object_response(&resp, &[200, 300, 404])? {
            ObjectResponse::Absent => Ok(None),
            ObjectResponse::Siblings(tags) => Ok(Some(GetResponse::Siblings(tags))),
            ObjectResponse::Value(value) => Ok(Some(GetResponse::Value(value))),
        }
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
        ensure_ascii("bucket name", bucket)?;
        if let Some(key) = key {
            ensure_ascii("key", key)?;
        }

        let mut params = vec![(
            "returnbody",
            if return_body { "true" } else { "false" }.to_string(),
        )];
        push_quorum(&mut params, "w", w);
        push_quorum(&mut params, "dw", dw);
        let headers = build_object_headers(&meta, &self.client_id, &self.prefix)?;

        match key {
            // Server-chosen key: POST to the bucket, read the key back from
            // the Location header. The key is surfaced even when the caller
            // suppressed the body.
            None => {
                let path = self.object_path(bucket, None, &params);
                let resp = self.request(Method::POST, &path, headers, body).await?;
                expect_status(&resp, &[201])?;
                let location = resp
                    .headers
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        TransportError::InvalidResponse(
                            "keyless put response carries no Location header".into(),
                        )
                    })?;
                let generated = location
                    .rsplit('/')
                    .next()
                    .unwrap_or(location)
                    .to_string();
                let echoed = if return_body {
                    match parse_object_response(&resp, &[201])? {
                        ObjectResponse::Value(value) => Some(GetResponse::Value(value)),
                        _ => None,
                    }
                } else {
                    None
                };
                Ok(PutResponse {
                    generated_key: Some(generated),
                    body: echoed,
                })
            }
            Some(key) => {
                let path = self.object_path(bucket, Some(key), &params);
                let resp = self.request(Method::PUT, &path, headers, body).await?;
                let echoed = if return_body {
                    match parse_object_response(&resp, &[200, 201, 300])? {
                        ObjectResponse::Value(value) => Some(GetResponse::Value(value)),
                        ObjectResponse::Siblings(tags) => Some(GetResponse::Siblings(tags)),
                        ObjectResponse::Absent => None,
                    }
                } else {
                    expect_status(&resp, &[204])?;
                    None
                };
                Ok(PutResponse {
                    generated_key: None,
                    body: echoed,
                })
            }
        }
    }

    async fn delete(&self, bucket: &str, key: &str, rw: Option<Quorum>) -> TransportResult<()> {
        ensure_ascii("bucket name", bucket)?;
        ensure_ascii("key", key)?;

        let mut params = Vec::new();
        push_quorum(&mut params, "rw", rw);
        let path = self.object_path(bucket, Some(key), &params);
        let resp = self
            .request(Method::DELETE, &path, HeaderMap::new(), Bytes::new())
            .await?;
        // Deleting a key that never existed is a success.
        expect_status(&resp, &[204, 404])?;
        Ok(())
    }

    async fn list_keys(&self, bucket: &str) -> TransportResult<Vec<String>> {
        ensure_ascii("bucket name", bucket)?;
        tracing::warn!(bucket, "list_keys scans every key in the store; avoid in production");

        let path = self.object_path(bucket, None, &[("keys", "true".to_string())]);
        let resp = self
            .request(Method::GET, &path, HeaderMap::new(), Bytes::new())
            .await?;
        expect_status(&resp, &[200])?;
        string_list(&json_body(&resp)?, "keys")
    }

    async fn list_buckets(&self) -> TransportResult<Vec<String>> {
        tracing::warn!("list_buckets scans every key in the store; avoid in production");

        let path = build_rest_path(&self.prefix, None, None, &[("buckets", "true".to_string())]);
        let resp = self
            .request(Method::GET, &path, HeaderMap::new(), Bytes::new())
            .await?;
        expect_status(&resp, &[200])?;
        string_list(&json_body(&resp)?, "buckets")
    }

    async fn get_bucket_properties(&self, bucket: &str) -> TransportResult<serde_json::Value> {
        ensure_ascii("bucket name", bucket)?;

        let params = [
            ("props", "true".to_string()),
            ("keys", "false".to_string()),
        ];
        let path = self.object_path(bucket, None, &params);
        let resp = self
            .request(Method::GET, &path, HeaderMap::new(), Bytes::new())
            .await?;
        expect_status(&resp, &[200])?;
        json_body(&resp)?
            .get("props")
            .cloned()
            .ok_or_else(|| TransportError::InvalidResponse("response JSON has no \"props\"".into()))
    }

    async fn set_bucket_properties(
        &self,
        bucket: &str,
        props: serde_json::Value,
    ) -> TransportResult<()> {
        ensure_ascii("bucket name", bucket)?;

        let path = self.object_path(bucket, None, &[]);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        let body = serde_json::to_vec(&json!({ "props": props }))?;
        let resp = self
            .request(Method::PUT, &path, headers, Bytes::from(body))
            .await?;
        expect_status(&resp, &[204])?;
        Ok(())
    }

    async fn index_query(
        &self,
        bucket: &str,
        field: &str,
        start: &IndexValue,
        end: Option<&IndexValue>,
    ) -> TransportResult<Vec<String>> {
        ensure_ascii("bucket name", bucket)?;
        ensure_ascii("index field", field)?;

        let mut path = format!(
            "/buckets/{}/index/{}/{}",
            encode_component(bucket),
            encode_component(field),
            encode_component(&start.to_wire()),
        );
        if let Some(end) = end {
            path.push('/');
            path.push_str(&encode_component(&end.to_wire()));
        }
        let resp = self
            .request(Method::GET, &path, HeaderMap::new(), Bytes::new())
            .await?;
        expect_status(&resp, &[200])?;
        string_list(&json_body(&resp)?, "keys")
    }

    async fn mapreduce(
        &self,
        inputs: serde_json::Value,
        query: serde_json::Value,
        timeout_ms: Option<u64>,
    ) -> TransportResult<serde_json::Value> {
        let mut job = json!({ "inputs": inputs, "query": query });
        if let Some(timeout) = timeout_ms {
            job["timeout"] = json!(timeout);
        }
        let path = format!("/{}", self.mapred_prefix);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        let resp = self
            .request(
                Method::POST,
                &path,
                headers,
                Bytes::from(serde_json::to_vec(&job)?),
            )
            .await?;
        expect_status(&resp, &[200])?;
        json_body(&resp)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("client_id", &self.client_id)
            .field("prefix", &self.prefix)
            .field("pool", &self.pool)
            .finish()
    }
}
