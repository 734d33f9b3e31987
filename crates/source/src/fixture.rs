//! Data source backed by a local file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::DataSource;
use crate::error::{ErrorKind, Result};

/// Reads the payload from a file on disk and reports a version that is
/// always newer than the given local one (the local version with `1`
/// appended), so an import against it never ends in "no new version".
///
/// Intended for tests and offline seeding.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    path: PathBuf,
    version: String,
}

impl FixtureSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            version: "1".to_string(),
        }
    }

    /// Claim a version newer than `local`.
    pub fn newer_than(mut self, local: Option<&str>) -> Self {
        self.version = format!("{}1", local.unwrap_or_default());
        self
    }

    /// Report exactly `version`.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataSource for FixtureSource {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn data(&self) -> Result<String> {
        let data = tokio::fs::read_to_string(&self.path).await.map_err(ErrorKind::Io)?;
        if data.trim().is_empty() {
            exn::bail!(ErrorKind::EmptyResponse);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_version_is_always_newer() {
        assert_eq!(FixtureSource::new("x.ini").version().await.unwrap(), "1");
        assert_eq!(FixtureSource::new("x.ini").newer_than(Some("6000013")).version().await.unwrap(), "60000131");
        assert_eq!(FixtureSource::new("x.ini").with_version("42").version().await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[DefaultProperties]\nBrowser=\"DefaultProperties\"\n").unwrap();
        let source = FixtureSource::new(file.path());
        assert!(source.data().await.unwrap().starts_with("[DefaultProperties]"));
    }

    #[tokio::test]
    async fn test_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FixtureSource::new(dir.path().join("missing.ini"));
        assert!(matches!(&*missing.data().await.unwrap_err(), ErrorKind::Io(_)));

        let empty = dir.path().join("empty.ini");
        std::fs::write(&empty, "  \n").unwrap();
        assert!(matches!(&*FixtureSource::new(&empty).data().await.unwrap_err(), ErrorKind::EmptyResponse));
    }
}
