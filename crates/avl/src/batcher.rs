//! 🪣 Batcher: the bucket brigade between the decoder and the bulk endpoint.
//!
//! Records go in one at a time. Every `threshold` records, a full batch comes
//! out and the bucket starts over. When the source runs dry, the caller drains
//! whatever is left. That's it. That's the whole job.
//!
//! Ancient proverb: "He who forgets to drain, loses the last 999 documents."

use crate::common::Record;
use crate::errors::PipelineError;

/// 📦 The batch size the bulk endpoint has been getting since forever.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// 🪣 Fixed-threshold accumulator. Owned by exactly one object's processing.
#[derive(Debug)]
pub struct Batcher {
    threshold: usize,
    pending: Vec<Record>,
}

impl Batcher {
    pub fn new(threshold: usize) -> Result<Self, PipelineError> {
        if threshold == 0 {
            return Err(PipelineError::InvalidConfig(
                "batch_size must be at least 1, a batch of zero is just a very expensive no-op"
                    .to_string(),
            ));
        }
        Ok(Self {
            threshold,
            pending: Vec::with_capacity(threshold),
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// ➕ Append one record. Returns the full batch when this record filled it.
    pub fn push(&mut self, record: Record) -> Option<Vec<Record>> {
        self.pending.push(record);
        if self.pending.len() >= self.threshold {
            // -- 🔄 swap in a fresh bucket, hand the full one downstream
            Some(std::mem::replace(
                &mut self.pending,
                Vec::with_capacity(self.threshold),
            ))
        } else {
            None
        }
    }

    /// 🏁 Whatever's left. `None` when there's nothing, so calling it twice is harmless.
    pub fn drain(&mut self) -> Option<Vec<Record>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

impl Default for Batcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BATCH_SIZE,
            pending: Vec::with_capacity(DEFAULT_BATCH_SIZE),
        }
    }
}
