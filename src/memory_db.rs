use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::url_db::{Result, UrlRecord, UrlStore};

/// Keeps records in insertion order, duplicates included. Used when `store = "memory"` and by
/// the tests.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<UrlRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<UrlRecord>) -> Self {
        MemoryStore {
            records: RwLock::new(records),
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl UrlStore for MemoryStore {
    async fn find_one(&self, key: &str) -> Result<Option<UrlRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| record.url() == key).cloned())
    }

    async fn clear(&self) -> Result<u64> {
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    async fn insert_many(&self, new_records: &[UrlRecord]) -> Result<u64> {
        let mut records = self.records.write().await;
        records.extend_from_slice(new_records);
        Ok(new_records.len() as u64)
    }
}
