//! 🧠 In-memory backends: a bucket and a cluster that live entirely in RAM.
//!
//! [`InMemorySource`] serves objects out of a `HashMap`. [`InMemorySink`] hoards
//! every payload it receives behind an `Arc<Mutex<..>>` so a test can hand the
//! sink to the pipeline and still peek inside afterwards. It can also be told to
//! fail specific deliveries, for tests about what happens when the cluster says no.
//!
//! ⚠️ This is NOT for production. If you're deploying this to prod, please also
//! deploy a therapist.

use std::collections::{BTreeSet, HashMap};
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::{ByteSource, Sink};
use crate::errors::{DispatchError, PipelineError};
use crate::events::ObjectLocator;

/// 📦 A bucket made of heap.
#[derive(Debug, Default)]
pub(crate) struct InMemorySource {
    objects: HashMap<ObjectLocator, Vec<u8>>,
}

impl InMemorySource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_object(mut self, locator: ObjectLocator, bytes: Vec<u8>) -> Self {
        self.objects.insert(locator, bytes);
        self
    }
}

#[async_trait]
impl ByteSource for InMemorySource {
    async fn open(&self, locator: &ObjectLocator) -> Result<Box<dyn Read + Send>, PipelineError> {
        match self.objects.get(locator) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(PipelineError::SourceUnavailable {
                locator: locator.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such object in memory"),
            }),
        }
    }
}

/// 📦 A sink that never forgets. Clone it before handing it off; the clones share the vault.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySink {
    /// 🔒 Every payload that was accepted, in order.
    pub(crate) received: Arc<Mutex<Vec<String>>>,
    /// 🔢 How many times `send` has been called, accepted or not.
    attempts: Arc<Mutex<usize>>,
    /// 💣 Zero-based send attempts that answer with a 500 instead.
    failing: BTreeSet<usize>,
    pub(crate) closed: Arc<Mutex<bool>>,
}

impl InMemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 💣 Make the listed send attempts fail, like a cluster having a bad day on schedule.
    pub(crate) fn failing_on(attempts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing: attempts.into_iter().collect(),
            ..Self::default()
        }
    }

    pub(crate) async fn payloads(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn send(&mut self, payload: String) -> Result<(), DispatchError> {
        let the_attempt = {
            let mut the_count = self.attempts.lock().await;
            let the_attempt = *the_count;
            *the_count += 1;
            the_attempt
        };
        if self.failing.contains(&the_attempt) {
            return Err(DispatchError::Rejected {
                status: 500,
                body: format!("scripted failure on attempt {the_attempt}"),
            });
        }
        self.received.lock().await.push(payload);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DispatchError> {
        *self.closed.lock().await = true;
        Ok(())
    }
}
