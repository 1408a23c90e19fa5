use std::sync::Arc;

use tracing::info;

use crate::domain::{Cursor, SortMode, Source, SourceStatus, UserId};
use crate::errors::{RelayError, RelayResult};
use crate::services::health::HealthBoard;
use crate::sources::ContentProvider;
use crate::storage::traits::{CursorRepository, SourceRepository};

/// One row of `/status`
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub source: Source,
    pub cursor: Option<Cursor>,
    pub status: SourceStatus,
}

/// Admin-facing membership operations. Every call is authorized against the
/// privileged identity before anything else is looked at.
pub struct RegistryService<S: SourceRepository, C: CursorRepository> {
    sources: S,
    cursors: C,
    provider: Option<Arc<dyn ContentProvider>>,
    health: HealthBoard,
    admin: UserId,
}

impl<S: SourceRepository, C: CursorRepository> RegistryService<S, C> {
    pub fn new(sources: S, cursors: C, admin: UserId) -> Self {
        Self {
            sources,
            cursors,
            provider: None,
            health: HealthBoard::new(),
            admin,
        }
    }

    /// Verify new sources upstream before registering them
    pub fn with_provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Share poll outcomes with the loop that records them
    pub fn with_health(mut self, health: HealthBoard) -> Self {
        self.health = health;
        self
    }

    fn authorize(&self, caller: UserId) -> RelayResult<()> {
        if caller == self.admin {
            Ok(())
        } else {
            Err(RelayError::Unauthorized)
        }
    }

    /// Register a source
    pub async fn add(&self, caller: UserId, raw_name: &str, sort_mode: SortMode) -> RelayResult<Source> {
        self.authorize(caller)?;
        let name = Source::normalize_name(raw_name)?;

        if self.sources.exists(&name)? {
            return Err(RelayError::SourceAlreadyExists(name));
        }

        // Confirm it exists upstream
        if let Some(provider) = &self.provider {
            provider.verify(&name).await?;
        }

        let source = Source::new(name, sort_mode);
        self.sources.add(&source)?;
        info!(source = %source.name, sort = %source.sort_mode, "source added");

        Ok(source)
    }

    /// Unregister a source; its cursor goes with it. Returns the normalized name.
    pub fn remove(&self, caller: UserId, raw_name: &str) -> RelayResult<String> {
        self.authorize(caller)?;
        let name = Source::normalize_name(raw_name)?;

        if !self.sources.remove(&name)? {
            return Err(RelayError::SourceNotRegistered(name));
        }
        self.health.forget(&name);
        info!(source = %name, "source removed");

        Ok(name)
    }

    /// All sources in registration order
    pub fn list(&self, caller: UserId) -> RelayResult<Vec<Source>> {
        self.authorize(caller)?;
        self.sources.get_all()
    }

    /// Drop a source's cursor so the next cycle delivers a full batch again.
    /// Returns the normalized name.
    pub fn reset(&self, caller: UserId, raw_name: &str) -> RelayResult<String> {
        self.authorize(caller)?;
        let name = Source::normalize_name(raw_name)?;

        if !self.sources.exists(&name)? {
            return Err(RelayError::SourceNotRegistered(name));
        }
        self.cursors.reset(&name)?;
        info!(source = %name, "cursor reset");

        Ok(name)
    }

    pub fn status(&self, caller: UserId) -> RelayResult<Vec<SourceReport>> {
        self.authorize(caller)?;

        let mut cursors = self.cursors.get_all()?;
        let reports = self
            .sources
            .get_all()?
            .into_iter()
            .map(|source| {
                let cursor = cursors
                    .iter()
                    .position(|c| c.source_name == source.name)
                    .map(|i| cursors.swap_remove(i));
                let status = self.health.get(&source.name);
                SourceReport {
                    source,
                    cursor,
                    status,
                }
            })
            .collect();

        Ok(reports)
    }
}
