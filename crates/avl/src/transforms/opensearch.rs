// ai
//! 📡 OpenSearch Bulk Renderer: formatting batches for the bulk API's peculiar tastes 🚀
//!
//! The bulk API has rules.
//!
//! Rule 1: Two lines per document. Action metadata, then document body. Always.
//! Rule 2: Newline-delimited. Not comma-separated. Not XML. NEWLINES.
//! Rule 3: The trailing newline on the whole body matters. It MATTERS.
//!
//! This module turns a batch of normalized [`Record`]s plus a [`BulkActionPolicy`]
//! into exactly that. The policy says which verb (`create`, `index`, or `update`
//! with `doc_as_upsert`), which index, and which field (if any) carries the `_id`.
//!
//! ## Knowledge Graph 🧠
//! - Action line: `{"<verb>":{"_index":"...","_id":"..."}}`: `_id` only when the policy has an id field
//! - Document line: bare record for create/index, `{"doc":...,"doc_as_upsert":true}` for upsert
//! - A record without a string id (when one is required) contributes ZERO lines. It still
//!   counted toward the batch size upstream. That asymmetry is old and on purpose.
//! - Empty batch (or everything dropped) → empty payload, and the sink never sees it
//!
//! ⚠️ When the singularity happens, the bulk API will still require two lines
//! per document. Some things transcend consciousness. 🦆

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::common::Record;
use crate::errors::PipelineError;

/// 🎬 Which bulk verb every document in the batch gets.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    /// ➕ append; fails on an existing `_id`, auto-generates one if absent
    #[default]
    Create,
    /// ♻️ append or overwrite whole document
    Index,
    /// 🔁 `update` + `doc_as_upsert: true`; needs an `_id`, merges into what's there
    Upsert,
}

impl BulkAction {
    /// 📛 The key that goes in the action line.
    pub fn verb(&self) -> &'static str {
        match self {
            BulkAction::Create => "create",
            BulkAction::Index => "index",
            BulkAction::Upsert => "update",
        }
    }
}

/// 📜 Per-deployment bulk semantics: where documents go and how they get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkActionPolicy {
    index: String,
    action: BulkAction,
    id_field: Option<String>,
}

impl BulkActionPolicy {
    /// 🔒 Validates up front. An upsert with no id is a bulk request that fails
    /// one item at a time, 1000 times per batch. We'd rather fail once, here.
    pub fn new(
        index: impl Into<String>,
        action: BulkAction,
        id_field: Option<String>,
    ) -> Result<Self, PipelineError> {
        let index = index.into();
        if index.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "the target index name is empty".to_string(),
            ));
        }
        let id_field = id_field.filter(|field| !field.is_empty());
        if action == BulkAction::Upsert && id_field.is_none() {
            return Err(PipelineError::InvalidConfig(format!(
                "upsert into '{index}' needs an id_field, update without an _id is not a thing"
            )));
        }
        Ok(Self { index, action, id_field })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn action(&self) -> BulkAction {
        self.action
    }

    pub fn id_field(&self) -> Option<&str> {
        self.id_field.as_deref()
    }
}

/// 🏷️ What happened to one record during rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRender {
    Rendered,
    /// 🚪 the policy wants an id, the record has none (or not a string one)
    DroppedMissingIdentity,
}

/// 📦 One rendered bulk body plus the receipts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedBatch {
    pub payload: String,
    pub rendered: usize,
    pub dropped: usize,
}

impl RenderedBatch {
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
}

#[derive(Serialize)]
struct UpsertDoc<'a> {
    doc: &'a Record,
    doc_as_upsert: bool,
}

/// 📡 Renders batches under one policy. Stateless beyond the policy itself.
#[derive(Debug, Clone)]
pub struct BulkRenderer {
    policy: BulkActionPolicy,
}

impl BulkRenderer {
    pub fn new(policy: BulkActionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BulkActionPolicy {
        &self.policy
    }

    /// 🔄 Render one record's two lines onto the end of `out`, or skip it.
    pub fn render_record(
        &self,
        record: &Record,
        out: &mut String,
    ) -> Result<RecordRender, PipelineError> {
        // 📎 _id: only looked up when the policy asks for it, and only a string will do
        let the_id = match self.policy.id_field() {
            Some(field) => match record.get(field).and_then(|v| v.as_str()) {
                Some(id) => Some(id),
                None => return Ok(RecordRender::DroppedMissingIdentity),
            },
            None => None,
        };

        // 📦 {"<verb>": {...}}: a one-entry map is the whole action envelope
        let the_action_line = BTreeMap::from([(
            self.policy.action.verb(),
            ActionMeta { index: &self.policy.index, id: the_id },
        )]);
        out.push_str(&serde_json::to_string(&the_action_line)?);
        out.push('\n');

        let the_doc_line = match self.policy.action {
            BulkAction::Upsert => serde_json::to_string(&UpsertDoc {
                doc: record,
                doc_as_upsert: true,
            })?,
            BulkAction::Create | BulkAction::Index => serde_json::to_string(record)?,
        };
        out.push_str(&the_doc_line);
        out.push('\n');

        Ok(RecordRender::Rendered)
    }

    /// 📦 Render a whole batch, in order. Trailing newline included (when there's anything at all).
    pub fn render(&self, batch: &[Record]) -> Result<RenderedBatch, PipelineError> {
        // -- 🧮 vibes-based pre-allocation: ~256 bytes per record, usually close enough
        let mut the_rendered = RenderedBatch {
            payload: String::with_capacity(batch.len() * 256),
            ..RenderedBatch::default()
        };

        for record in batch {
            match self.render_record(record, &mut the_rendered.payload)? {
                RecordRender::Rendered => the_rendered.rendered += 1,
                RecordRender::DroppedMissingIdentity => {
                    trace!(
                        "🚪 record without a string '{}' left out of the payload",
                        self.policy.id_field().unwrap_or_default()
                    );
                    the_rendered.dropped += 1;
                }
            }
        }

        Ok(the_rendered)
    }
}
