use crate::domain::{Cursor, Source};
use crate::errors::RelayResult;

#[cfg_attr(test, mockall::automock)]
pub trait SourceRepository: Send + Sync {
    /// Fails with SourceAlreadyExists if the name is taken
    fn add(&self, source: &Source) -> RelayResult<()>;
    /// Returns false if nothing was removed
    fn remove(&self, name: &str) -> RelayResult<bool>;
    /// All sources in registration order
    fn get_all(&self) -> RelayResult<Vec<Source>>;
    fn exists(&self, name: &str) -> RelayResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
pub trait CursorRepository: Send + Sync {
    fn get(&self, source_name: &str) -> RelayResult<Option<Cursor>>;
    /// Move the cursor forward. Returns false when the update was refused
    /// because it is older than the stored cursor or the source is gone.
    fn advance(&self, cursor: &Cursor) -> RelayResult<bool>;
    /// Forget the cursor so the next cycle starts from the latest items
    fn reset(&self, source_name: &str) -> RelayResult<bool>;
    fn get_all(&self) -> RelayResult<Vec<Cursor>>;
}
