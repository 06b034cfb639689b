//! 🪣 LocalBucketSource: a directory pretending to be object storage.
//!
//! `<root_dir>/<bucket>/<key>` is where an object lives. Mirror a bucket with
//! `aws s3 sync` (or just drop files in by hand) and point the pipeline at it.
//! Keys ending in `.gz` are gunzipped on the fly, because somebody always
//! compresses the Avro file that is already snappy-compressed inside. 🦆

use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::debug;

use crate::backends::ByteSource;
use crate::errors::PipelineError;
use crate::events::ObjectLocator;

#[derive(Debug, Deserialize, Clone)]
pub struct LocalBucketConfig {
    /// 📁 The directory whose children are buckets.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for LocalBucketConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct LocalBucketSource {
    config: LocalBucketConfig,
}

impl LocalBucketSource {
    pub(crate) fn new(config: LocalBucketConfig) -> Self {
        Self { config }
    }

    /// 🧭 Map a locator onto the filesystem, refusing anything that climbs out of the root.
    pub(crate) fn resolve(&self, locator: &ObjectLocator) -> io::Result<PathBuf> {
        let the_escape_attempt = |part: &str| {
            let the_path = Path::new(part);
            part.is_empty()
                || the_path.is_absolute()
                || the_path
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        };
        if the_escape_attempt(&locator.bucket)
            || locator.bucket.contains('/')
            || the_escape_attempt(&locator.key)
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "locator escapes the bucket root",
            ));
        }
        Ok(self
            .config
            .root_dir
            .join(&locator.bucket)
            .join(&locator.key))
    }
}

#[async_trait]
impl ByteSource for LocalBucketSource {
    async fn open(&self, locator: &ObjectLocator) -> Result<Box<dyn Read + Send>, PipelineError> {
        let the_unavailable = |source: io::Error| PipelineError::SourceUnavailable {
            locator: locator.to_string(),
            source,
        };
        let the_path = self.resolve(locator).map_err(the_unavailable)?;
        debug!("📂 opening '{}' from {}", locator, the_path.display());

        let the_file = tokio::fs::File::open(&the_path)
            .await
            .map_err(the_unavailable)?
            .into_std()
            .await;
        let the_buffered = BufReader::new(the_file);

        if locator.key.ends_with(".gz") {
            Ok(Box::new(GzDecoder::new(the_buffered)))
        } else {
            Ok(Box::new(the_buffered))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn source_over(root: &Path) -> LocalBucketSource {
        LocalBucketSource::new(LocalBucketConfig {
            root_dir: root.to_path_buf(),
        })
    }

    async fn read_all(source: &LocalBucketSource, locator: &ObjectLocator) -> anyhow::Result<Vec<u8>> {
        let mut the_stream = source.open(locator).await?;
        let mut the_bytes = Vec::new();
        the_stream.read_to_end(&mut the_bytes)?;
        Ok(the_bytes)
    }

    #[tokio::test]
    async fn the_one_where_a_plain_object_is_read_back() -> anyhow::Result<()> {
        let the_root = tempfile::tempdir()?;
        std::fs::create_dir_all(the_root.path().join("drops/daily"))?;
        std::fs::write(the_root.path().join("drops/daily/a.avro"), b"Obj\x01 pretend")?;

        let the_source = source_over(the_root.path());
        let the_bytes = read_all(&the_source, &ObjectLocator::new("drops", "daily/a.avro")).await?;
        assert_eq!(the_bytes, b"Obj\x01 pretend");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_gz_objects_arrive_already_unzipped() -> anyhow::Result<()> {
        let the_root = tempfile::tempdir()?;
        std::fs::create_dir_all(the_root.path().join("drops"))?;
        let mut the_encoder = GzEncoder::new(Vec::new(), Compression::default());
        the_encoder.write_all(b"squashed and restored")?;
        std::fs::write(the_root.path().join("drops/a.avro.gz"), the_encoder.finish()?)?;

        let the_source = source_over(the_root.path());
        let the_bytes = read_all(&the_source, &ObjectLocator::new("drops", "a.avro.gz")).await?;
        assert_eq!(the_bytes, b"squashed and restored");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_missing_object_is_unavailable_not_a_panic() -> anyhow::Result<()> {
        let the_root = tempfile::tempdir()?;
        let the_source = source_over(the_root.path());
        let the_result = the_source.open(&ObjectLocator::new("drops", "ghost.avro")).await;
        assert!(matches!(
            the_result,
            Err(PipelineError::SourceUnavailable { ref locator, ref source })
                if locator == "drops/ghost.avro" && source.kind() == io::ErrorKind::NotFound
        ));
        Ok(())
    }

    #[test]
    fn the_one_where_nobody_climbs_out_of_the_root() {
        let the_source = source_over(Path::new("/srv/buckets"));
        for (bucket, key) in [
            ("drops", "../../etc/passwd"),
            ("drops", "/etc/passwd"),
            ("..", "secrets.avro"),
            ("drops/inner", "a.avro"),
            ("drops", ""),
            ("", "a.avro"),
        ] {
            assert!(
                the_source.resolve(&ObjectLocator::new(bucket, key)).is_err(),
                "{bucket}/{key} should have been refused"
            );
        }
        assert_eq!(
            the_source
                .resolve(&ObjectLocator::new("drops", "daily/./a.avro"))
                .ok(),
            Some(PathBuf::from("/srv/buckets/drops/daily/./a.avro"))
        );
    }
}
