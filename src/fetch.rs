//! The `in` operation: resolve, fetch, extract.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::action::{self, Resolution};
use crate::error::ResourceError;
use crate::metadata;
use crate::request::{InRequest, InResponse};
use crate::storage::StateStorage;
use crate::terraform::{STATE_FILE_NAME, TerraformState};
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Resolving,
    Fetching,
    Extracting,
    Done,
    Failed,
}

impl Stage {
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Init, Resolving)
                | (Resolving, Fetching)
                | (Resolving, Done)
                | (Resolving, Failed)
                | (Fetching, Extracting)
                | (Fetching, Failed)
                | (Extracting, Done)
                | (Extracting, Failed)
        )
    }
}

pub struct FetchOrchestrator<'a> {
    storage: &'a dyn StateStorage,
    destination: PathBuf,
    clock: fn() -> DateTime<Utc>,
    stages: Vec<Stage>,
}

impl<'a> FetchOrchestrator<'a> {
    pub fn new(storage: &'a dyn StateStorage, destination: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            destination: destination.into(),
            clock: Utc::now,
            stages: vec![Stage::Init],
        }
    }

    /// Replaces the clock used to stamp the version of an already-deleted
    /// state object.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Init)
    }

    /// Every stage visited so far, starting with `Init`.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub async fn run(&mut self, request: &InRequest) -> Result<InResponse, ResourceError> {
        self.advance(Stage::Resolving);
        match self.execute(request).await {
            Ok(response) => {
                self.advance(Stage::Done);
                Ok(response)
            }
            Err(err) => {
                self.advance(Stage::Failed);
                Err(err)
            }
        }
    }

    fn advance(&mut self, next: Stage) {
        let current = self.stage();
        debug_assert!(
            current.can_advance_to(next),
            "illegal stage transition {:?} -> {:?}",
            current,
            next
        );
        tracing::debug!(from = ?current, to = ?next, "stage transition");
        self.stages.push(next);
    }

    async fn execute(&mut self, request: &InRequest) -> Result<InResponse, ResourceError> {
        let key = request.source.storage.object_key();
        let action = request.params.action;

        let exists = self.storage.exists().await?;
        let resolution = action::resolve(action, exists);

        tracing::info!(
            storage = self.storage.name(),
            key = %key,
            ?action,
            exists,
            ?resolution,
            "resolved action"
        );

        match resolution {
            Resolution::StateFileMissing => Err(ResourceError::StateFileMissing { key }),
            Resolution::ReportDeletedNoFetch => Ok(InResponse {
                version: Version::deleted_at((self.clock)()),
                metadata: Vec::new(),
            }),
            Resolution::Fetch => self.fetch_and_extract(request).await,
        }
    }

    async fn fetch_and_extract(&mut self, request: &InRequest) -> Result<InResponse, ResourceError> {
        self.advance(Stage::Fetching);

        tokio::fs::create_dir_all(&self.destination).await?;
        let state_path = self.destination.join(STATE_FILE_NAME);
        let version = self.storage.fetch(&state_path).await?;

        match &request.version {
            Some(requested) if *requested != version => tracing::info!(
                requested = %requested.last_modified,
                fetched = %version.last_modified,
                "requested version is no longer current, fetched latest"
            ),
            _ => {}
        }

        self.advance(Stage::Extracting);

        let bytes = tokio::fs::read(&state_path).await?;
        let state = TerraformState::parse(&bytes)?;
        let entries = metadata::extract(&state);
        let written =
            metadata::write(&self.destination, &entries, request.params.output_layout).await?;

        tracing::info!(
            last_modified = %version.last_modified,
            digest = %version.content_digest,
            format_version = ?state.format_version,
            serial = ?state.serial,
            lineage = state.lineage.as_deref().unwrap_or(""),
            outputs = entries.len(),
            files = written.len(),
            "state fetched"
        );

        Ok(InResponse {
            version,
            metadata: metadata::response_fields(&entries),
        })
    }
}

/// Runs one `in` invocation against `storage`, writing into `destination`.
pub async fn run_in(
    storage: &dyn StateStorage,
    request: &InRequest,
    destination: &Path,
) -> Result<InResponse, ResourceError> {
    FetchOrchestrator::new(storage, destination).run(request).await
}
