//! 📬 Upload events: the envelope object storage sends when a file lands.
//!
//! Only the two fields we care about are modeled: the bucket name and the object
//! key. Everything else in an S3 notification (region, ETag, requester, the
//! sequencer, the ancient runes) is ignored by serde and nobody misses it.
//!
//! S3 delivers keys form-encoded: `my+report%281%29.avro` is really
//! `my report(1).avro`. We decode on the way in so the byte source never has to.

use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::Deserialize;

use crate::errors::PipelineError;

/// 📍 Where an object lives. `bucket/key`, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocator {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

impl FromStr for ObjectLocator {
    type Err = PipelineError;

    /// 🔪 `bucket/some/deep/key.avro` → bucket `bucket`, key `some/deep/key.avro`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Ok(ObjectLocator::new(bucket, key))
            }
            _ => Err(PipelineError::InvalidConfig(format!(
                "'{s}' is not a <bucket>/<key> locator"
            ))),
        }
    }
}

/// 📬 One notification, possibly carrying several records.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<UploadEventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadEventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
}

impl UploadEvent {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// 📍 Locators in event order, keys decoded.
    pub fn locators(&self) -> Vec<ObjectLocator> {
        self.records
            .iter()
            .map(|r| ObjectLocator::new(r.s3.bucket.name.clone(), decode_key(&r.s3.object.key)))
            .collect()
    }
}

/// 🔓 Form-decoding for object keys: `+` is a space, `%XX` is a byte.
pub fn decode_key(raw: &str) -> String {
    let the_spaced = raw.replace('+', " ");
    percent_decode_str(&the_spaced)
        .decode_utf8_lossy()
        .into_owned()
}
