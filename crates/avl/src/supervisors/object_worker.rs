// ai
//! 🧵 ObjectWorker: one object, start to finish: open → decode → normalize →
//! batch → render → send. Strictly in that order, one batch in flight, no
//! parallelism, no surprises.
//!
//! 🧠 Knowledge graph:
//! - Fatal for the object: source unavailable, malformed stream, render failure.
//!   Whatever sat in the half-full batch at that moment is dropped on the floor.
//! - Not fatal: skipped datums, coercions that didn't take, records with no id,
//!   and failed sends. Those are counted in the [`ObjectReport`] and we keep going.
//! - Decoding (and gunzip) reads the stream synchronously on this task. One
//!   object at a time, so nothing else is queued behind it on the runtime.

use tracing::{debug, error, info, trace, warn};

use crate::backends::{ByteSource, Sink};
use crate::common::Record;
use crate::decoder::{Pull, RecordDecoder};
use crate::errors::{DispatchError, PipelineError};
use crate::events::ObjectLocator;
use crate::report::ObjectReport;
use crate::supervisors::config::PipelineConfig;
use crate::transforms::{BulkRenderer, Normalizer};

#[derive(Debug)]
pub(crate) struct ObjectWorker {
    pipeline: PipelineConfig,
    normalizer: Normalizer,
    renderer: BulkRenderer,
}

impl ObjectWorker {
    pub(crate) fn new(pipeline: &PipelineConfig) -> Result<Self, PipelineError> {
        pipeline.validate()?;
        Ok(Self {
            pipeline: pipeline.clone(),
            normalizer: pipeline.normalizer(),
            renderer: pipeline.renderer()?,
        })
    }

    /// 🚀 Run one object through the whole pipe. Always returns a report; a fatal
    /// error ends up in `report.fatal` rather than in the caller's lap.
    pub(crate) async fn process<S, K>(
        &self,
        source: &S,
        sink: &mut K,
        locator: &ObjectLocator,
    ) -> ObjectReport
    where
        S: ByteSource + ?Sized,
        K: Sink + ?Sized,
    {
        let mut report = ObjectReport::new(locator.to_string());
        info!("📂 processing {}", locator);
        match self.try_process(source, sink, locator, &mut report).await {
            Ok(()) => info!(
                "✅ {} done: {} decoded, {} skipped, {} dropped, {} batch(es), {} failed",
                locator,
                report.decoded,
                report.skipped,
                report.dropped,
                report.batches,
                report.batches_failed
            ),
            Err(err) => {
                error!("💀 giving up on {}: {}", locator, err);
                report.fatal = Some(err.to_string());
            }
        }
        report
    }

    async fn try_process<S, K>(
        &self,
        source: &S,
        sink: &mut K,
        locator: &ObjectLocator,
        report: &mut ObjectReport,
    ) -> Result<(), PipelineError>
    where
        S: ByteSource + ?Sized,
        K: Sink + ?Sized,
    {
        let the_stream = source.open(locator).await?;
        let mut the_decoder = RecordDecoder::new(the_stream, &locator.to_string())?;
        let mut the_batcher = self.pipeline.batcher()?;

        loop {
            match the_decoder.pull()? {
                Pull::Record(mut record) => {
                    report.decoded += 1;
                    let the_normalized = self.normalizer.normalize(&mut record);
                    report.unwrapped += the_normalized.unwrapped;
                    report.coerced += the_normalized.coerced;
                    report.left_as_string += the_normalized.left_as_string;
                    if let Some(batch) = the_batcher.push(record) {
                        self.dispatch(sink, &batch, report).await?;
                    }
                }
                Pull::Skipped(reason) => {
                    warn!("🗑️ skipped a datum in {}: {}", locator, reason);
                    report.skipped += 1;
                }
                Pull::Exhausted => break,
            }
        }

        if let Some(batch) = the_batcher.drain() {
            trace!("🏁 draining the last {} record(s) of {}", batch.len(), locator);
            self.dispatch(sink, &batch, report).await?;
        }
        Ok(())
    }

    /// 📡 Render and send one batch. A failed send is written down, not raised.
    async fn dispatch<K>(
        &self,
        sink: &mut K,
        batch: &[Record],
        report: &mut ObjectReport,
    ) -> Result<(), PipelineError>
    where
        K: Sink + ?Sized,
    {
        let the_rendered = self.renderer.render(batch)?;
        report.dropped += the_rendered.dropped;
        if the_rendered.dropped > 0 {
            debug!(
                "🚫 {} record(s) had no usable '{}' and were left out",
                the_rendered.dropped,
                self.renderer.policy().id_field().unwrap_or_default()
            );
        }
        if the_rendered.is_empty() {
            debug!("🫥 batch of {} rendered to nothing, not sending", batch.len());
            return Ok(());
        }

        report.batches += 1;
        debug!(
            "📦 sending batch #{} ({} docs, {} bytes)",
            report.batches,
            the_rendered.rendered,
            the_rendered.payload.len()
        );
        if let Err(err) = sink.send(the_rendered.payload).await {
            error!("📡 batch #{} failed: {}", report.batches, err);
            report.batches_failed += 1;
            if matches!(err, DispatchError::Transport(_)) {
                report.unreachable += 1;
            }
            report.dispatch_errors.push(err.to_string());
        }
        Ok(())
    }
}
