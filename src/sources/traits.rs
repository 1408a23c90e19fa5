use async_trait::async_trait;

use crate::domain::{Item, Source};
use crate::errors::RelayResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Latest items of a source in the provider's order for its sort mode.
    ///
    /// Fails with `SourceNotFound` when the source is gone upstream and with
    /// `ProviderUnavailable` for anything transient.
    async fn list_new(&self, source: &Source, limit: u32) -> RelayResult<Vec<Item>>;

    /// Check that a source exists upstream before it is registered
    async fn verify(&self, name: &str) -> RelayResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoResolver: Send + Sync {
    /// Resolve a provider-hosted video to a temporary direct URL and download it.
    /// Returns `None` when there is no playable file or it exceeds `max_bytes`.
    async fn fetch_video(&self, item_id: &str, max_bytes: u64) -> RelayResult<Option<Vec<u8>>>;
}
