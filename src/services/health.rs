use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::SourceStatus;

/// Last poll outcome per source, written by the poll loop and read by `/status`.
/// Not persisted: a restart starts every source at `Pending`.
#[derive(Debug, Clone, Default)]
pub struct HealthBoard {
    inner: Arc<RwLock<HashMap<String, SourceStatus>>>,
}

impl HealthBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, source_name: &str, status: SourceStatus) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(source_name.to_string(), status);
    }

    pub fn get(&self, source_name: &str) -> SourceStatus {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(source_name).cloned().unwrap_or(SourceStatus::Pending)
    }

    pub fn forget(&self, source_name: &str) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.remove(source_name);
    }
}
