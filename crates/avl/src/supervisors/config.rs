// ai
//! 🔧 Pipeline config: the knobs that turn one generic pipeline into "the
//! products pipeline" or "the sales pipeline".
//!
//! 🧠 Knowledge graph:
//! - `index` + `action` + `id_field` → [`BulkActionPolicy`] (validated here, not at render time)
//! - `coercions` → [`Normalizer`]
//! - `batch_size` → [`Batcher`] threshold
//!
//! Three near-identical pipelines used to differ in exactly these five fields.
//! Now they differ in five lines of TOML. 🦆

use serde::Deserialize;

use crate::batcher::{Batcher, DEFAULT_BATCH_SIZE};
use crate::errors::PipelineError;
use crate::transforms::{BulkAction, BulkActionPolicy, BulkRenderer, CoercionTable, Normalizer};

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// 📦 Target index. Every document in every batch goes here.
    pub index: String,
    #[serde(default)]
    pub action: BulkAction,
    /// 🪪 Field holding the document id. Required for `upsert`.
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub coercions: CoercionTable,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl PipelineConfig {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            action: BulkAction::default(),
            id_field: None,
            batch_size: DEFAULT_BATCH_SIZE,
            coercions: CoercionTable::new(),
        }
    }

    /// ✅ Everything that can be wrong with the knobs, found before the first byte is read.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.policy()?;
        Batcher::new(self.batch_size)?;
        Ok(())
    }

    pub fn policy(&self) -> Result<BulkActionPolicy, PipelineError> {
        BulkActionPolicy::new(self.index.clone(), self.action, self.id_field.clone())
    }

    pub fn renderer(&self) -> Result<BulkRenderer, PipelineError> {
        Ok(BulkRenderer::new(self.policy()?))
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.coercions.clone())
    }

    pub fn batcher(&self) -> Result<Batcher, PipelineError> {
        Batcher::new(self.batch_size)
    }
}
