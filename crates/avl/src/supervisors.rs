//! 🎬 *[an upload event arrives. it is carrying three objects. one of them is cursed.]*
//!
//! 📦 The Supervisor walks the objects of one invocation, one at a time, and
//! hands each to the [`ObjectWorker`](object_worker::ObjectWorker). It owns the
//! byte source and the sink; the worker only borrows them.
//!
//! A cursed object does not take the rest of the invocation down with it: its
//! failure lands in the [`InvocationReport`] and the next object gets its turn.
//!
//! ⚠️ Workers are the supervisor's private little minions. Do not pub them.

mod object_worker;
pub mod config;

use tracing::info;

use crate::backends::{Sink, SinkBackend, SourceBackend};
use crate::errors::{DispatchError, PipelineError};
use crate::events::ObjectLocator;
use crate::report::InvocationReport;
use config::PipelineConfig;
use object_worker::ObjectWorker;

#[derive(Debug)]
pub(crate) struct Supervisor {
    worker: ObjectWorker,
    source: SourceBackend,
    sink: SinkBackend,
}

impl Supervisor {
    pub(crate) fn new(
        pipeline: &PipelineConfig,
        source: SourceBackend,
        sink: SinkBackend,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            worker: ObjectWorker::new(pipeline)?,
            source,
            sink,
        })
    }

    /// 🔁 Every locator, in order, each one finishing before the next starts.
    pub(crate) async fn run(&mut self, locators: &[ObjectLocator]) -> InvocationReport {
        let mut the_report = InvocationReport::default();
        for locator in locators {
            let the_object = self
                .worker
                .process(&self.source, &mut self.sink, locator)
                .await;
            the_report.push(the_object);
        }
        info!(
            "🏁 invocation finished: {} object(s), {} record(s), {} batch(es)",
            the_report.objects.len(),
            the_report.total_decoded(),
            the_report.total_batches()
        );
        the_report
    }

    /// 🗑️ Close the sink. Call it. Always.
    pub(crate) async fn close(&mut self) -> Result<(), DispatchError> {
        self.sink.close().await
    }
}
