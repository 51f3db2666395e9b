use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed, one-directional reference from one stored object to another.
///
/// Links are identified by (bucket, key, tag). A record may carry the same
/// link more than once; the store round-trips duplicates as-is.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub bucket: String,
    pub key: String,
    pub tag: String,
}

impl Link {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            tag: tag.into(),
        }
    }

    /// A link whose tag defaults to the target bucket's name.
    pub fn untagged(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let tag = bucket.clone();
        Self {
            bucket,
            key: key.into(),
            tag,
        }
    }

    /// Whether this link points at the given (bucket, key), any tag.
    pub fn points_at(&self, bucket: &str, key: &str) -> bool {
        self.bucket == bucket && self.key == key
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.bucket, self.key, self.tag)
    }
}
