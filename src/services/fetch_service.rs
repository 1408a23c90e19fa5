use std::sync::Arc;

use tracing::debug;

use crate::domain::{Cursor, Item, Source};
use crate::errors::RelayResult;
use crate::sources::ContentProvider;

pub struct FetchService {
    provider: Arc<dyn ContentProvider>,
    limit: u32,
}

impl FetchService {
    pub fn new(provider: Arc<dyn ContentProvider>, limit: u32) -> Self {
        Self { provider, limit }
    }

    /// Fetch a source and keep only items newer than its cursor, oldest first
    pub async fn fetch(&self, source: &Source, cursor: Option<&Cursor>) -> RelayResult<Vec<Item>> {
        let items = self.provider.list_new(source, self.limit).await?;
        let fetched = items.len();

        let fresh = filter_new(items, cursor);
        debug!(
            source = %source.name,
            fetched,
            fresh = fresh.len(),
            "fetched source"
        );

        Ok(fresh)
    }
}

/// Order items oldest first and drop everything at or before the cursor.
///
/// When the cursor's item is still in the batch, everything after it is new.
/// Otherwise (the item was deleted or fell out of the listing) the cursor's
/// timestamp is the watermark. Without a cursor the whole batch is new.
pub fn filter_new(mut items: Vec<Item>, cursor: Option<&Cursor>) -> Vec<Item> {
    // Listings come newest first; reversing keeps same-second items in posting order
    items.reverse();
    items.sort_by_key(|item| item.created_time);

    let Some(cursor) = cursor else {
        return items;
    };

    match items.iter().position(|item| item.id == cursor.last_item_id) {
        Some(pos) => items.split_off(pos + 1),
        None => items
            .into_iter()
            .filter(|item| item.created_time > cursor.last_seen_time)
            .collect(),
    }
}
