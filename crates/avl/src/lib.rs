// ai
//! 🪣 avl: Avro files land in a bucket, documents land in OpenSearch.
//!
//! 🧠 Knowledge graph:
//! ```text
//!  UploadEvent ──▶ ObjectLocator ──▶ ByteSource::open ──▶ RecordDecoder
//!                                                            │ Pull::Record
//!                                                            ▼
//!   Sink::send ◀── BulkRenderer ◀── Batcher (1000) ◀── Normalizer
//! ```
//! One object at a time, one batch in flight, no retries. Every outcome that
//! isn't a clean success gets counted in the [`InvocationReport`].

pub mod app_config;
pub mod batcher;
pub mod common;
pub mod decoder;
pub mod errors;
pub mod events;
pub mod report;
pub mod transforms;

pub(crate) mod backends;
pub(crate) mod supervisors;

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

pub use app_config::{AppConfig, load_config};
pub use backends::{FileSinkConfig, LocalBucketConfig, OpenSearchSinkConfig};
pub use events::{ObjectLocator, UploadEvent};
pub use report::{InvocationReport, ObjectReport};
pub use supervisors::config::PipelineConfig;

use backends::file::FileSink;
use backends::local_bucket::LocalBucketSource;
use backends::opensearch::OpenSearchSink;
use backends::{SinkBackend, SourceBackend};
use errors::PipelineError;
use supervisors::Supervisor;

/// 🚀 Run one invocation: every locator through the pipeline, in order.
///
/// `dry_run` swaps the OpenSearch sink for a file that collects the payloads
/// instead. Per-object failures live in the returned report; only set-up
/// trouble (bad config, unbuildable sink, a sink that won't close) is an `Err`.
pub async fn run(
    app_config: AppConfig,
    locators: Vec<ObjectLocator>,
    dry_run: Option<PathBuf>,
) -> anyhow::Result<InvocationReport> {
    let the_sink = match dry_run {
        Some(path) => {
            info!("🧪 dry run: payloads go to {}", path.display());
            SinkBackend::File(
                FileSink::new(FileSinkConfig { path })
                    .await
                    .context("💀 The dry-run file refused to open. Check the parent directory exists.")?,
            )
        }
        None => {
            if app_config.opensearch.url.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "no OpenSearch url configured (set OPENSEARCH_URL or [opensearch] url)"
                        .to_string(),
                )
                .into());
            }
            SinkBackend::OpenSearch(OpenSearchSink::new(app_config.opensearch)?)
        }
    };
    let the_source = SourceBackend::LocalBucket(LocalBucketSource::new(app_config.source));

    let mut the_supervisor = Supervisor::new(&app_config.pipeline, the_source, the_sink)?;
    let the_report = the_supervisor.run(&locators).await;
    the_supervisor
        .close()
        .await
        .context("💀 The sink would not close cleanly. The last batch may not have made it.")?;
    Ok(the_report)
}
