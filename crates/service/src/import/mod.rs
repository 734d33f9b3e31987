//! Importing a new catalog version.
//!
//! An import walks a small state machine:
//!
//! ```text
//! checking version ──► no new version
//!        │        └──► version error
//!        ▼
//!   downloading ─────► data error
//!        ▼
//!   processing ──────► data error
//!        ▼
//!   committed
//! ```
//!
//! Only the last step writes anything: every stored record and the version
//! marker are replaced in one operation, then the lookup cache is cleared.
//! Every other path leaves the store exactly as it was.

mod process;

pub use self::process::{Processed, Release, process};
use crate::Browscap;
use crate::error::{Error, ErrorKind, Result};
use crate::sanitize::plain_text;
use browscap_source::DataSource;
use browscap_store::Marker;
use derive_more::Display;
use exn::ResultExt;
use time::UtcDateTime;
use tracing::instrument;

/// What started an import.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Trigger {
    /// Requested by a person, who expects to be told how it went.
    #[display("manual")]
    Manual,
    /// Started in the background; the outcome is only logged.
    #[display("scheduled")]
    Scheduled,
}

/// Summary of a successful import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Imported {
    /// Version token reported by the data source, now stored as the marker.
    pub version: String,
    /// Number of pattern records stored.
    pub records: u64,
    pub release: Release,
}

/// Result of an import. Never raised as an error: callers decide what to do
/// with each outcome, and must not treat [`NoNewVersion`](Self::NoNewVersion)
/// as a failure.
#[derive(Debug)]
pub enum ImportOutcome {
    /// New data was committed.
    Imported(Imported),
    /// The stored data is already the current version.
    NoNewVersion { version: String },
    /// The remote version couldn't be determined. Nothing was changed.
    VersionError(Error),
    /// The payload couldn't be downloaded, validated, parsed or stored.
    /// Nothing was changed.
    DataError(Error),
}

impl ImportOutcome {
    /// `true` for [`Imported`](Self::Imported) and
    /// [`NoNewVersion`](Self::NoNewVersion).
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Imported(_) | Self::NoNewVersion { .. })
    }

    /// The message to show whoever triggered the import, if anyone is
    /// waiting for one.
    pub fn message(&self, trigger: Trigger) -> Option<String> {
        match trigger {
            Trigger::Manual => Some(self.to_string()),
            Trigger::Scheduled => None,
        }
    }

    fn log(&self) {
        match self {
            Self::Imported(imported) => tracing::info!(
                version = %imported.version,
                records = imported.records,
                release = imported.release.version.as_deref(),
                released = imported.release.released.as_deref(),
                "New version of browscap imported"
            ),
            Self::NoNewVersion { version } => tracing::info!(%version, "No new version of browscap to import"),
            Self::VersionError(error) => tracing::error!(?error, "Couldn't check version"),
            Self::DataError(error) => tracing::error!(?error, "Couldn't import browscap data"),
        }
    }
}

impl std::fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imported(imported) => write!(
                f,
                "New version of browscap imported: {} ({} patterns)",
                imported.version, imported.records
            ),
            Self::NoNewVersion { .. } => write!(f, "No new version of browscap to import"),
            Self::VersionError(error) => write!(f, "Couldn't check version: {}", &**error),
            Self::DataError(error) => write!(f, "Couldn't import browscap data: {}", &**error),
        }
    }
}

impl Browscap {
    /// Runs one import against `source`.
    ///
    /// Imports are serialized: a second call waits for the first to finish.
    /// Each outcome is logged exactly once; see [`ImportOutcome::message`] for
    /// what to show a person.
    #[instrument(skip_all, fields(source = source.name(), %trigger))]
    pub async fn import(&self, source: &dyn DataSource, trigger: Trigger) -> ImportOutcome {
        let _guard = self.import_lock.lock().await;
        let outcome = self.import_locked(source).await;
        outcome.log();
        outcome
    }

    async fn import_locked(&self, source: &dyn DataSource) -> ImportOutcome {
        let (local, remote) = match self.check_version(source).await {
            Ok(versions) => versions,
            Err(error) => return ImportOutcome::VersionError(error),
        };
        if local.as_deref() == Some(remote.as_str()) {
            return ImportOutcome::NoNewVersion { version: remote };
        }
        tracing::debug!(local = local.as_deref(), %remote, "new version available");
        match self.refresh(source, remote).await {
            Ok(imported) => ImportOutcome::Imported(imported),
            Err(error) => ImportOutcome::DataError(error),
        }
    }

    /// Returns the stored and the (sanitized) remote version.
    async fn check_version(&self, source: &dyn DataSource) -> Result<(Option<String>, String)> {
        let local = self.store.marker().await.or_raise(|| ErrorKind::Store)?.map(|m| m.version);
        let remote = plain_text(&source.version().await.or_raise(|| ErrorKind::Version)?);
        if remote.is_empty() {
            exn::bail!(ErrorKind::Version);
        }
        Ok((local, remote))
    }

    async fn refresh(&self, source: &dyn DataSource, version: String) -> Result<Imported> {
        let payload = source.data().await.or_raise(|| ErrorKind::Fetch)?;
        // Tens of thousands of sections: keep it off the async workers.
        let Processed { release, records } =
            tokio::task::spawn_blocking(move || process(&payload)).await.or_raise(|| ErrorKind::Processing)??;

        let marker = Marker::new(version, UtcDateTime::now());
        let stored = self.store.replace_all(&records, &marker).await.or_raise(|| ErrorKind::Store)?;
        // Classifications that read the old records must not land in the cache
        // after it has been cleared.
        let mut generation = self.generation.write().await;
        *generation += 1;
        // The new records are committed whatever happens here; stale entries
        // at worst live out their TTL.
        if let Err(error) = self.cache.invalidate_all().await {
            tracing::warn!(?error, "Couldn't clear the lookup cache after import");
        }
        drop(generation);
        Ok(Imported {
            version: marker.version,
            records: stored,
            release,
        })
    }
}
