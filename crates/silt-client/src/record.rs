use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use silt_codec::{FetchedValue, PutMeta, DEFAULT_CONTENT_TYPE};
use silt_transport::{GetResponse, Transport};
use silt_types::{check_field_value, ensure_ascii, IndexValue, Link, Quorum};

use crate::client::QuorumDefaults;
use crate::encoding::CodecRegistry;
use crate::error::{ClientError, ClientResult};
use crate::resolve::Resolve;

/// One concurrent revision of a stored value.
///
/// Exclusively owned by its [`Record`]; the whole version set is replaced on
/// every reload. Data stays raw until something asks for the decoded form.
pub struct Version {
    vclock: Option<String>,
    content_type: String,
    raw: Option<Bytes>,
    decoded: Option<Value>,
    usermeta: BTreeMap<String, String>,
    indexes: BTreeMap<String, BTreeSet<IndexValue>>,
    links: Vec<Link>,
}

impl Version {
    fn empty() -> Self {
        Self {
            vclock: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            raw: None,
            decoded: None,
            usermeta: BTreeMap::new(),
            indexes: BTreeMap::new(),
            links: Vec::new(),
        }
    }

    fn from_fetched(value: FetchedValue) -> Self {
        let mut indexes: BTreeMap<String, BTreeSet<IndexValue>> = BTreeMap::new();
        for (field, v) in value.meta.indexes {
            indexes.entry(field).or_default().insert(v);
        }
        Self {
            vclock: value.vclock,
            content_type: value
                .meta
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            raw: Some(value.data),
            decoded: None,
            usermeta: value.meta.usermeta,
            indexes,
            links: value.meta.links,
        }
    }

    pub fn vclock(&self) -> Option<&str> {
        self.vclock.as_deref()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn raw_data(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }

    pub fn usermeta(&self) -> &BTreeMap<String, String> {
        &self.usermeta
    }

    pub fn indexes(&self) -> &BTreeMap<String, BTreeSet<IndexValue>> {
        &self.indexes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

impl std::fmt::Debug for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Version")
            .field("vclock", &self.vclock)
            .field("content_type", &self.content_type)
            .field("bytes", &self.raw.as_ref().map(Bytes::len))
            .finish()
    }
}

/// A stored entity identified by (bucket, key).
///
/// Holds zero, one, or many concurrent [`Version`]s. Zero versions means
/// not-found / not-yet-stored; exactly one is the *resolved* state, the only
/// state in which the unified accessors below are valid; two or more is the
/// *conflicted* state and every unified accessor fails until the record is
/// reduced to one version.
pub struct Record {
    transport: Arc<dyn Transport>,
    bucket: String,
    key: Option<String>,
    quorums: QuorumDefaults,
    registry: CodecRegistry,
    resolver: Option<Arc<dyn Resolve>>,
    exists: bool,
    versions: Vec<Version>,
}

/// The resolved-state guard, creating an empty version for fresh records so
/// they can be populated before their first store.
fn sole_version(versions: &mut Vec<Version>) -> ClientResult<&mut Version> {
    match versions.len() {
        0 => {
            versions.push(Version::empty());
            Ok(&mut versions[0])
        }
        1 => Ok(&mut versions[0]),
        n => Err(ClientError::Conflict(n)),
    }
}

fn decode_version(registry: &CodecRegistry, version: &mut Version) -> ClientResult<()> {
    if version.decoded.is_none() {
        let decoded = match &version.raw {
            Some(raw) => {
                let decoder = registry.decoder(&version.content_type).ok_or_else(|| {
                    ClientError::NoDecoder(version.content_type.clone())
                })?;
                decoder(raw)?
            }
            None => Value::Null,
        };
        version.decoded = Some(decoded);
    }
    Ok(())
}

impl Record {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        bucket: String,
        key: Option<String>,
        quorums: QuorumDefaults,
        registry: CodecRegistry,
        resolver: Option<Arc<dyn Resolve>>,
    ) -> ClientResult<Self> {
        if let Some(key) = &key {
            ensure_ascii("key", key)?;
        }
        Ok(Self {
            transport,
            bucket,
            key,
            quorums,
            registry,
            resolver,
            exists: false,
            versions: Vec::new(),
        })
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }

    /// The key, once known. `None` until a keyless store captures the
    /// server-generated key.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// True once the record has been loaded or stored, false after a delete
    /// or a not-found fetch.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_conflicted(&self) -> bool {
        self.versions.len() > 1
    }

    pub fn sibling_count(&self) -> usize {
        self.versions.len()
    }

    /// Read-only view of every version, for reconciliation hooks.
    pub fn siblings(&self) -> &[Version] {
        &self.versions
    }

    /// Replace the reconciliation hook for this record.
    pub fn set_resolver(&mut self, resolver: Arc<dyn Resolve>) {
        self.resolver = Some(resolver);
    }

    /// Collapse the record to the sibling at `index`, discarding the rest.
    pub fn select_sibling(&mut self, index: usize) -> ClientResult<()> {
        if index >= self.versions.len() {
            return Err(ClientError::NoSibling(index));
        }
        let keep = self.versions.swap_remove(index);
        self.versions = vec![keep];
        Ok(())
    }

    /// Decoded data of the sibling at `index`, for reconciliation hooks.
    pub fn sibling_data(&mut self, index: usize) -> ClientResult<Value> {
        let version = self
            .versions
            .get_mut(index)
            .ok_or(ClientError::NoSibling(index))?;
        decode_version(&self.registry, version)?;
        Ok(version.decoded.clone().unwrap_or(Value::Null))
    }

    // ---- Unified accessors (resolved state only) ----

    /// The decoded value, run through the content-type decoder on first
    /// access and cached.
    pub fn data(&mut self) -> ClientResult<&Value> {
        let version = sole_version(&mut self.versions)?;
        decode_version(&self.registry, version)?;
        Ok(version.decoded.get_or_insert(Value::Null))
    }

    pub fn set_data(&mut self, value: Value) -> ClientResult<()> {
        let version = sole_version(&mut self.versions)?;
        version.decoded = Some(value);
        version.raw = None;
        Ok(())
    }

    /// The raw stored bytes, undecoded. Empty for a record built in memory
    /// via [`Record::set_data`] that has not been stored yet.
    pub fn raw_data(&mut self) -> ClientResult<&[u8]> {
        let version = sole_version(&mut self.versions)?;
        Ok(version.raw.as_deref().unwrap_or(&[]))
    }

    pub fn set_raw_data(&mut self, data: impl Into<Bytes>) -> ClientResult<()> {
        let version = sole_version(&mut self.versions)?;
        version.raw = Some(data.into());
        version.decoded = None;
        Ok(())
    }

    pub fn content_type(&mut self) -> ClientResult<&str> {
        Ok(&sole_version(&mut self.versions)?.content_type)
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> ClientResult<()> {
        sole_version(&mut self.versions)?.content_type = content_type.into();
        Ok(())
    }

    /// The opaque vector clock. Absent until first load/store; required for
    /// a correct future write and mandatory when resolving conflicts.
    pub fn vclock(&mut self) -> ClientResult<Option<&str>> {
        Ok(sole_version(&mut self.versions)?.vclock.as_deref())
    }

    pub fn set_vclock(&mut self, vclock: Option<String>) -> ClientResult<()> {
        sole_version(&mut self.versions)?.vclock = vclock;
        Ok(())
    }

    pub fn usermeta(&mut self) -> ClientResult<&BTreeMap<String, String>> {
        Ok(&sole_version(&mut self.versions)?.usermeta)
    }

    pub fn set_usermeta(&mut self, usermeta: BTreeMap<String, String>) -> ClientResult<()> {
        for key in usermeta.keys() {
            ensure_ascii("usermeta key", key)?;
        }
        sole_version(&mut self.versions)?.usermeta = usermeta;
        Ok(())
    }

    pub fn insert_usermeta(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ClientResult<()> {
        let key = key.into();
        ensure_ascii("usermeta key", &key)?;
        sole_version(&mut self.versions)?.usermeta.insert(key, value.into());
        Ok(())
    }

    pub fn remove_usermeta(&mut self, key: &str) -> ClientResult<()> {
        sole_version(&mut self.versions)?.usermeta.remove(key);
        Ok(())
    }

    // ---- Links ----

    pub fn links(&mut self) -> ClientResult<&[Link]> {
        Ok(&sole_version(&mut self.versions)?.links)
    }

    /// Add a link. Duplicates are allowed by design; nothing deduplicates.
    pub fn add_link(&mut self, link: Link) -> ClientResult<()> {
        sole_version(&mut self.versions)?.links.push(link);
        Ok(())
    }

    /// Remove links to (bucket, key). With `tag = None` every tag pointing
    /// at that target goes; with a tag only the exact triple goes.
    pub fn remove_link(&mut self, bucket: &str, key: &str, tag: Option<&str>) -> ClientResult<()> {
        sole_version(&mut self.versions)?.links.retain(|link| {
            !(link.points_at(bucket, key) && tag.map_or(true, |t| link.tag == t))
        });
        Ok(())
    }

    pub fn set_links(&mut self, links: Vec<Link>) -> ClientResult<()> {
        sole_version(&mut self.versions)?.links = links;
        Ok(())
    }

    // ---- Secondary indexes ----

    pub fn indexes(&mut self) -> ClientResult<&BTreeMap<String, BTreeSet<IndexValue>>> {
        Ok(&sole_version(&mut self.versions)?.indexes)
    }

    /// Add one (field, value) pair. The field name must be ASCII and the
    /// value kind must match the `_int` suffix convention.
    pub fn add_index(&mut self, field: &str, value: impl Into<IndexValue>) -> ClientResult<()> {
        let value = value.into();
        ensure_ascii("index field", field)?;
        check_field_value(field, &value)?;
        sole_version(&mut self.versions)?
            .indexes
            .entry(field.to_string())
            .or_default()
            .insert(value);
        Ok(())
    }

    /// Remove one value of a field, or the whole field with `value = None`.
    pub fn remove_index(&mut self, field: &str, value: Option<&IndexValue>) -> ClientResult<()> {
        let indexes = &mut sole_version(&mut self.versions)?.indexes;
        match value {
            None => {
                indexes.remove(field);
            }
            Some(value) => {
                if let Some(values) = indexes.get_mut(field) {
                    values.remove(value);
                    if values.is_empty() {
                        indexes.remove(field);
                    }
                }
            }
        }
        Ok(())
    }

    /// Replace the whole index set.
    pub fn set_indexes(
        &mut self,
        indexes: BTreeMap<String, BTreeSet<IndexValue>>,
    ) -> ClientResult<()> {
        for (field, values) in &indexes {
            ensure_ascii("index field", field)?;
            for value in values {
                check_field_value(field, value)?;
            }
        }
        sole_version(&mut self.versions)?.indexes = indexes;
        Ok(())
    }

    // ---- Store operations ----

    /// Fetch with the record's default read quorum.
    pub async fn fetch(&mut self) -> ClientResult<()> {
        self.fetch_opts(None).await
    }

    /// Fetch, fully replacing the version set. A 404 empties the record; a
    /// conflict materializes every sibling and runs the reconciliation hook.
    pub async fn fetch_opts(&mut self, r: Option<Quorum>) -> ClientResult<()> {
        let key = self.key.clone().ok_or(ClientError::NoKey)?;
        let r = r.or(self.quorums.r);
        let response = self.transport.get(&self.bucket, &key, r, None).await?;
        match response {
            None => {
                self.versions.clear();
                self.exists = false;
            }
            Some(GetResponse::Value(value)) => {
                self.versions = vec![Version::from_fetched(value)];
                self.exists = true;
            }
            Some(GetResponse::Siblings(tags)) => self.load_siblings(tags, r).await?,
        }
        Ok(())
    }

    /// Store with defaults: bucket quorums, body echoed back.
    pub async fn store(&mut self) -> ClientResult<()> {
        self.store_opts(None, None, true).await
    }

    /// Store the sole version.
    ///
    /// Encodes through the content-type encoder (decoded data) or sends the
    /// raw bytes as-is. On success the record is re-populated from the
    /// response; with `return_body = false` the known write payload stands
    /// and only `exists` advances. A keyless record captures the
    /// server-generated key. A store that comes back 300 materializes the
    /// siblings exactly as a conflicted fetch does.
    pub async fn store_opts(
        &mut self,
        w: Option<Quorum>,
        dw: Option<Quorum>,
        return_body: bool,
    ) -> ClientResult<()> {
        let (payload, meta) = {
            let version = sole_version(&mut self.versions)?;
            let payload = match (&version.decoded, &version.raw) {
                (Some(value), _) => {
                    let encoder = self.registry.encoder(&version.content_type).ok_or_else(
                        || ClientError::NoEncoder(version.content_type.clone()),
                    )?;
                    encoder(value)?
                }
                (None, Some(raw)) => raw.clone(),
                (None, None) => Bytes::new(),
            };
            let meta = PutMeta {
                content_type: version.content_type.clone(),
                links: version.links.clone(),
                indexes: version
                    .indexes
                    .iter()
                    .flat_map(|(field, values)| {
                        values.iter().map(move |v| (field.clone(), v.clone()))
                    })
                    .collect(),
                usermeta: version.usermeta.clone(),
                vclock: version.vclock.clone(),
            };
            (payload, meta)
        };

        let response = self
            .transport
            .put(
                &self.bucket,
                self.key.as_deref(),
                payload,
                meta,
                w.or(self.quorums.w),
                dw.or(self.quorums.dw),
                return_body,
            )
            .await?;

        if let Some(generated) = response.generated_key {
            self.key = Some(generated);
        }
        match response.body {
            // Body suppressed: the payload just written is the value.
            None => self.exists = true,
            Some(GetResponse::Value(value)) => {
                self.versions = vec![Version::from_fetched(value)];
                self.exists = true;
            }
            Some(GetResponse::Siblings(tags)) => {
                self.load_siblings(tags, self.quorums.r).await?;
            }
        }
        Ok(())
    }

    /// Delete with the record's default rw quorum.
    pub async fn delete(&mut self) -> ClientResult<()> {
        self.delete_opts(None).await
    }

    /// Delete the key and clear the record unconditionally; deleting a key
    /// that never existed succeeds.
    pub async fn delete_opts(&mut self, rw: Option<Quorum>) -> ClientResult<()> {
        let key = self.key.clone().ok_or(ClientError::NoKey)?;
        self.transport
            .delete(&self.bucket, &key, rw.or(self.quorums.rw))
            .await?;
        self.versions.clear();
        self.exists = false;
        Ok(())
    }

    /// Materialize every sibling with one fetch-by-vtag each, then hand the
    /// whole record to the reconciliation hook (when one is set). The hook
    /// runs exactly once, after all siblings are populated.
    async fn load_siblings(&mut self, tags: Vec<String>, r: Option<Quorum>) -> ClientResult<()> {
        let key = self.key.clone().ok_or(ClientError::NoKey)?;
        let mut versions = Vec::with_capacity(tags.len());
        for tag in &tags {
            match self.transport.get(&self.bucket, &key, r, Some(tag)).await? {
                Some(GetResponse::Value(value)) => versions.push(Version::from_fetched(value)),
                _ => return Err(ClientError::SiblingShape(tag.clone())),
            }
        }
        self.versions = versions;
        self.exists = true;
        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            siblings = self.versions.len(),
            "conflict materialized"
        );
        if let Some(resolver) = self.resolver.clone() {
            resolver.resolve(self)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("exists", &self.exists)
            .field("versions", &self.versions.len())
            .finish()
    }
}
