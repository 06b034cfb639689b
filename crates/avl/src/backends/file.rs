//! 💾 FileSink: the dry-run destination. Every payload that would have gone to
//! `_bulk` gets appended to a local NDJSON file instead, byte for byte.
//!
//! Append, not truncate: several dry runs in a row pile up in the same file,
//! which is exactly what you want when comparing them and exactly what you
//! don't want when you forgot. `rm` is right there. 🦆

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::trace;

use crate::backends::Sink;
use crate::errors::DispatchError;

#[derive(Debug, Deserialize, Clone)]
pub struct FileSinkConfig {
    pub path: PathBuf,
}

#[derive(Debug)]
pub(crate) struct FileSink {
    file_buf: BufWriter<File>,
    config: FileSinkConfig,
}

impl FileSink {
    pub(crate) async fn new(config: FileSinkConfig) -> Result<Self, DispatchError> {
        let the_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .await?;
        Ok(Self {
            file_buf: BufWriter::new(the_file),
            config,
        })
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn send(&mut self, payload: String) -> Result<(), DispatchError> {
        trace!(
            "📬 {} bytes walked into the dry-run file {}",
            payload.len(),
            self.config.path.display()
        );
        self.file_buf.write_all(payload.as_bytes()).await?;
        Ok(())
    }

    /// 🗑️ Flush the BufWriter. Without this the last batch sits in the buffer, warm and unwritten.
    async fn close(&mut self) -> Result<(), DispatchError> {
        trace!("🎬 final flush of {}", self.config.path.display());
        self.file_buf.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_payloads_pile_up_across_runs() -> anyhow::Result<()> {
        let the_dir = tempfile::tempdir()?;
        let the_config = FileSinkConfig {
            path: the_dir.path().join("dry-run.ndjson"),
        };

        let mut the_first_run = FileSink::new(the_config.clone()).await?;
        the_first_run.send("{\"create\":{\"_index\":\"a\"}}\n{}\n".to_string()).await?;
        the_first_run.close().await?;

        let mut the_second_run = FileSink::new(the_config.clone()).await?;
        the_second_run.send("{\"create\":{\"_index\":\"b\"}}\n{}\n".to_string()).await?;
        the_second_run.close().await?;

        let the_contents = std::fs::read_to_string(&the_config.path)?;
        assert_eq!(
            the_contents,
            "{\"create\":{\"_index\":\"a\"}}\n{}\n{\"create\":{\"_index\":\"b\"}}\n{}\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_missing_directory_is_an_io_error() -> anyhow::Result<()> {
        let the_dir = tempfile::tempdir()?;
        let the_result = FileSink::new(FileSinkConfig {
            path: the_dir.path().join("nope/never/out.ndjson"),
        })
        .await;
        assert!(matches!(the_result, Err(DispatchError::Io(_))));
        Ok(())
    }
}
