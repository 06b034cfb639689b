use std::io::Read;

use async_trait::async_trait;

use crate::backends::{in_mem, local_bucket};
use crate::errors::PipelineError;
use crate::events::ObjectLocator;

/// 🚰 Given a locator, hand back something readable. That's the entire contract.
///
/// # Contract 📜
/// - `open` either returns a fresh stream positioned at byte zero, or
///   `PipelineError::SourceUnavailable`. Nothing in between.
/// - The source does NOT know the stream is Avro. It's a faucet, not a chef.
/// - Sources are `&self`: opening object B doesn't care that object A is open.
#[async_trait]
pub(crate) trait ByteSource: std::fmt::Debug {
    /// 📂 Open one object for reading.
    async fn open(&self, locator: &ObjectLocator) -> Result<Box<dyn Read + Send>, PipelineError>;
}

/// 🎭 The byte sources we know how to talk to.
#[derive(Debug)]
pub(crate) enum SourceBackend {
    LocalBucket(local_bucket::LocalBucketSource),
    #[cfg_attr(not(test), allow(dead_code))]
    InMemory(in_mem::InMemorySource),
}

#[async_trait]
impl ByteSource for SourceBackend {
    async fn open(&self, locator: &ObjectLocator) -> Result<Box<dyn Read + Send>, PipelineError> {
        match self {
            SourceBackend::LocalBucket(s) => s.open(locator).await,
            SourceBackend::InMemory(s) => s.open(locator).await,
        }
    }
}
