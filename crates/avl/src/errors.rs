//! 💀 Errors: the taxonomy of things that go wrong between a bucket and an index.
//!
//! Two families. [`PipelineError`] is what can sink a whole object (file won't
//! open, header is garbage, config is nonsense). [`DispatchError`] is what a
//! single `_bulk` POST can come back with. Dispatch errors are recorded and the
//! pipeline keeps walking; pipeline errors end the current object and the
//! supervisor moves on to the next one.
//!
//! Record-level trouble (one bad datum, a coercion that didn't take, a missing
//! id) never shows up here. Those are named outcomes, not errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// 🪣 The byte source couldn't produce a stream for this locator.
    #[error("💀 source unavailable for '{locator}': {source}")]
    SourceUnavailable {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    /// 🧨 Header or block structure is broken. Nothing after this point can be trusted.
    #[error("💀 malformed container stream in '{locator}': {reason}")]
    StreamMalformed { locator: String, reason: String },

    /// 🔧 Pipeline settings that can't possibly work (upsert without an id field, etc.)
    #[error("💀 invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// 📝 A batch refused to become JSON. Should be impossible with our value type. Should.
    #[error("💀 failed to render bulk payload: {0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// 📡 The endpoint answered, just not with a 200.
    #[error("💀 bulk endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },

    /// 🔌 The request never got an answer at all.
    #[error("💀 bulk request never landed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 💾 Local sinks (dry-run file) hit the disk and the disk hit back.
    #[error("💀 could not write bulk payload: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// 🔢 HTTP status, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Rejected { status, .. } => Some(*status),
            DispatchError::Transport(err) => err.status().map(|s| s.as_u16()),
            DispatchError::Io(_) => None,
        }
    }
}
