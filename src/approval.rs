use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    normalize::normalize,
    url_db::{StoreError, UrlRecord, UrlStore},
};

/// Raw urls written to the store by [`ApprovalService::seed_test_data`]. The sfu `test.pl` url
/// is left out on purpose so there is always something that isn't approved.
pub const TEST_DATA: [(&str, bool); 5] = [
    ("www.sfu.ca/about/economic-recovery/1-10.html", true),
    ("ubc.ca/academics/", true),
    ("umbrella.cisco.com/?dtid=osscdc000283", true),
    (
        "www.geeksforgeeks.org:443/python-build-a-rest-api-using-flask/",
        true,
    ),
    ("www.central1.com:443/cgi-bin/badstuff.pl", true),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found { approved: bool },
    NotFound,
}

impl Lookup {
    pub fn approved(&self) -> bool {
        matches!(self, Lookup::Found { approved: true })
    }
}

#[derive(Clone)]
pub struct ApprovalService {
    store: Arc<dyn UrlStore>,
}

impl ApprovalService {
    pub fn new(store: Arc<dyn UrlStore>) -> Self {
        ApprovalService { store }
    }

    /// Looks `raw_url` up without hiding store failures.
    #[instrument(skip(self))]
    pub async fn lookup(&self, raw_url: &str) -> Result<Lookup, StoreError> {
        let encoded_url = normalize(raw_url);
        debug!("encoded url: {encoded_url}");

        match self.store.find_one(&encoded_url).await? {
            Some(record) => {
                debug!("found url in store: {record:?}");
                Ok(Lookup::Found {
                    approved: record.approved(),
                })
            }
            None => Ok(Lookup::NotFound),
        }
    }

    /// Whether `raw_url` is on the approved list. Anything that can't be confirmed, a store
    /// failure included, counts as not approved.
    pub async fn is_approved(&self, raw_url: &str) -> bool {
        match self.lookup(raw_url).await {
            Ok(lookup) => lookup.approved(),
            Err(err) => {
                warn!("treating {raw_url} as not approved: {err}");
                false
            }
        }
    }

    /// Wipes the store and writes [`TEST_DATA`] back. Returns false if either step fails.
    pub async fn seed_test_data(&self) -> bool {
        let records: Vec<UrlRecord> = TEST_DATA
            .iter()
            .map(|(url, approved)| UrlRecord::new(normalize(url), *approved))
            .collect();

        match self.replace_all(&records).await {
            Ok(inserted) => {
                info!("number of records added: {inserted}");
                true
            }
            Err(err) => {
                warn!("could not add test records: {err}");
                false
            }
        }
    }

    async fn replace_all(&self, records: &[UrlRecord]) -> Result<u64, StoreError> {
        let removed = self.store.clear().await?;
        debug!("removed {removed} url records");
        self.store.insert_many(records).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{memory_db::MemoryStore, url_db::Result};

    /// Every call fails the way an unreachable database does.
    struct DownStore;

    #[async_trait]
    impl UrlStore for DownStore {
        async fn find_one(&self, _key: &str) -> Result<Option<UrlRecord>> {
            Err(StoreError::Unavailable(String::from("connection refused")))
        }
        async fn clear(&self) -> Result<u64> {
            Err(StoreError::Unavailable(String::from("connection refused")))
        }
        async fn insert_many(&self, _records: &[UrlRecord]) -> Result<u64> {
            Err(StoreError::Unavailable(String::from("connection refused")))
        }
    }

    fn memory_service() -> ApprovalService {
        ApprovalService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn empty_store_approves_nothing() {
        let service = memory_service();
        assert!(!service.is_approved("www.sfu.ca").await);
        assert!(!service.is_approved("").await);
        assert_eq!(service.lookup("www.sfu.ca").await.unwrap(), Lookup::NotFound);
    }

    #[tokio::test]
    async fn seeded_urls_are_approved() {
        let service = memory_service();
        assert!(service.seed_test_data().await);

        assert!(
            service
                .is_approved("www.sfu.ca/about/economic-recovery/1-10.html")
                .await
        );
        assert!(service.is_approved("ubc.ca/academics/").await);
        assert!(
            service
                .is_approved("umbrella.cisco.com/?dtid=osscdc000283")
                .await
        );
        assert!(
            service
                .is_approved("www.central1.com:443/cgi-bin/badstuff.pl")
                .await
        );
        assert!(
            !service
                .is_approved("www.sfu.ca:443/cgi-bin/test.pl?first=first_tst&second=second-value")
                .await
        );
    }

    #[tokio::test]
    async fn seeded_keys_match_stored_encoding() {
        let store = Arc::new(MemoryStore::new());
        let service = ApprovalService::new(store.clone());
        assert!(service.seed_test_data().await);

        let record = store
            .find_one("www.sfu.ca%2Fabout%2Feconomic-recovery%2F1-10.html")
            .await
            .unwrap();
        assert!(record.is_some());
        // Pre-encoded input gets encoded a second time and misses.
        assert!(
            !service
                .is_approved("www.sfu.ca%2Fabout%2Feconomic-recovery%2F1-10.html")
                .await
        );
    }

    #[tokio::test]
    async fn seeding_twice_leaves_the_same_records() {
        let store = Arc::new(MemoryStore::new());
        let service = ApprovalService::new(store.clone());

        assert!(service.seed_test_data().await);
        assert!(service.seed_test_data().await);
        assert_eq!(store.len().await, TEST_DATA.len());
    }

    #[tokio::test]
    async fn first_match_decides_on_duplicates() {
        let store = MemoryStore::with_records(vec![
            UrlRecord::new(normalize("ubc.ca/academics/"), false),
            UrlRecord::new(normalize("ubc.ca/academics/"), true),
        ]);
        let service = ApprovalService::new(Arc::new(store));

        assert_eq!(
            service.lookup("ubc.ca/academics/").await.unwrap(),
            Lookup::Found { approved: false }
        );
        assert!(!service.is_approved("ubc.ca/academics/").await);
    }

    #[tokio::test]
    async fn unreachable_store_fails_closed() {
        let service = ApprovalService::new(Arc::new(DownStore));

        assert!(matches!(
            service.lookup("ubc.ca/academics/").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(!service.is_approved("ubc.ca/academics/").await);
        assert!(!service.seed_test_data().await);
    }

    #[tokio::test]
    async fn concurrent_lookups_agree() {
        let service = memory_service();
        assert!(service.seed_test_data().await);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.is_approved("ubc.ca/academics/").await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }
}
