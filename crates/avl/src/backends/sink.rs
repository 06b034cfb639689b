use async_trait::async_trait;

use crate::backends::{file, in_mem, opensearch};
use crate::errors::DispatchError;

/// 🕳️ A sink that sends pre-rendered `_bulk` payloads. Pure I/O, zero logic.
///
/// Like a postal worker who delivers the mail without reading it.
///
/// # Contract 📜
/// - `send` performs exactly one delivery of the payload and reports how it went.
///   No retry. A failed batch stays failed; the caller writes it down and moves on.
/// - `close` flushes whatever the sink buffers. MUST be called. Skipping it is rude.
#[async_trait]
pub(crate) trait Sink: std::fmt::Debug {
    /// 📡 One payload, one delivery.
    async fn send(&mut self, payload: String) -> Result<(), DispatchError>;
    /// 🗑️ Flush, finalize, release.
    async fn close(&mut self) -> Result<(), DispatchError>;
}

/// 🎭 Where rendered batches can end up.
#[derive(Debug)]
pub(crate) enum SinkBackend {
    OpenSearch(opensearch::OpenSearchSink),
    File(file::FileSink),
    #[cfg_attr(not(test), allow(dead_code))]
    InMemory(in_mem::InMemorySink),
}

#[async_trait]
impl Sink for SinkBackend {
    async fn send(&mut self, payload: String) -> Result<(), DispatchError> {
        match self {
            SinkBackend::OpenSearch(sink) => sink.send(payload).await,
            SinkBackend::File(sink) => sink.send(payload).await,
            SinkBackend::InMemory(sink) => sink.send(payload).await,
        }
    }

    async fn close(&mut self) -> Result<(), DispatchError> {
        match self {
            SinkBackend::OpenSearch(sink) => sink.close().await,
            SinkBackend::File(sink) => sink.close().await,
            SinkBackend::InMemory(sink) => sink.close().await,
        }
    }
}
