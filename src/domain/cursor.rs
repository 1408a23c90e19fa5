use chrono::{DateTime, Utc};

use super::Item;

/// Watermark of the most recently delivered item of a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub source_name: String,
    pub last_item_id: String,
    pub last_seen_time: DateTime<Utc>,
}

impl Cursor {
    pub fn new(source_name: String, last_item_id: String, last_seen_time: DateTime<Utc>) -> Self {
        Self {
            source_name,
            last_item_id,
            last_seen_time,
        }
    }

    /// Cursor pointing at a delivered item
    pub fn at_item(source_name: &str, item: &Item) -> Self {
        Self::new(source_name.to_string(), item.id.clone(), item.created_time)
    }
}
