//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 Byte sources hand us a readable stream for an object locator. Sinks take
//! a fully rendered `_bulk` body and put it somewhere: an OpenSearch cluster, a
//! dry-run file on disk, or a `Vec` in RAM for the tests.
//!
//! Everything between those two ends (decode, normalize, batch, render) is
//! synchronous and lives elsewhere. This module only moves bytes. 🦆
//!
//! 🧠 Knowledge graph:
//! - Pattern: trait → concrete impls → `*Backend` enum that dispatches by match
//! - `ByteSource::open` is async so a future remote source can await its GET;
//!   the stream it returns is plain `std::io::Read` because the Avro reader is sync
//! - `Sink::send` is one network call (or one file write) per batch. No retries.

pub(crate) mod file;
// -- 🧪 only the tests construct these
#[cfg_attr(not(test), allow(dead_code))]
pub(crate) mod in_mem;
pub(crate) mod local_bucket;
pub(crate) mod opensearch;
pub(crate) mod sink;
pub(crate) mod source;

pub use file::FileSinkConfig;
pub use local_bucket::LocalBucketConfig;
pub use opensearch::OpenSearchSinkConfig;

pub(crate) use sink::{Sink, SinkBackend};
pub(crate) use source::{ByteSource, SourceBackend};
