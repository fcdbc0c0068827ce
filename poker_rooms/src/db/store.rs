//! Typed read-modify-write on top of a [`VersionedRepository`].

use log::debug;
use serde::{Serialize, de::DeserializeOwned};
use std::{marker::PhantomData, sync::Arc, time::Duration};

use super::{
    errors::{StoreError, StoreResult},
    repository::{Entry, Version, VersionedRepository},
};

/// What a mutation wants done with the value it was shown.
#[derive(Debug, PartialEq)]
pub enum Mutation<T> {
    Write(T),
    NoChange,
}

/// A decoded value and the version it was read (or written) at.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    pub version: Version,
    pub value: Option<T>,
}

/// One JSON document under one key.
pub struct VersionedStore<T> {
    repository: Arc<dyn VersionedRepository>,
    key: String,
    _document: PhantomData<fn() -> T>,
}

impl<T> VersionedStore<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn new(repository: Arc<dyn VersionedRepository>, key: impl Into<String>) -> Self {
        Self {
            repository,
            key: key.into(),
            _document: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn decode(entry: Entry) -> StoreResult<Versioned<T>> {
        let value = entry.value.map(serde_json::from_value).transpose()?;
        Ok(Versioned {
            version: entry.version,
            value,
        })
    }

    pub async fn get(&self) -> StoreResult<Versioned<T>> {
        Self::decode(self.repository.get(&self.key).await?)
    }

    /// Apply `mutate` to the current value until a write goes through
    /// without interference.
    ///
    /// `mutate` may run several times and must be free of side effects.
    /// Returning an error or [`Mutation::NoChange`] ends the loop without
    /// writing; no change reports the value and version that were read.
    pub async fn mutate<F, E>(&self, mut mutate: F) -> Result<Versioned<T>, E>
    where
        F: FnMut(Option<T>) -> Result<Mutation<T>, E>,
        E: From<StoreError>,
    {
        loop {
            let current = self.get().await?;
            let cas = if current.value.is_some() {
                current.version
            } else {
                0
            };

            match mutate(current.value.clone())? {
                Mutation::NoChange => return Ok(current),
                Mutation::Write(value) => {
                    let document = serde_json::to_value(&value).map_err(StoreError::from)?;
                    if let Some(version) = self.repository.put(&self.key, document, cas).await? {
                        return Ok(Versioned {
                            version,
                            value: Some(value),
                        });
                    }
                    debug!("{} moved past version {cas}, retrying", self.key);
                }
            }
        }
    }

    /// Long-poll until the document's version exceeds `since` or `timeout`
    /// passes.
    pub async fn wait(&self, since: Version, timeout: Duration) -> StoreResult<Versioned<T>> {
        Self::decode(self.repository.wait(&self.key, since, timeout).await?)
    }

    pub async fn delete(&self) -> StoreResult<()> {
        self.repository.delete(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{MemoryRepository, mock::ContendedRepository};
    use std::sync::atomic::Ordering;

    fn counter(repository: Arc<dyn VersionedRepository>) -> VersionedStore<u32> {
        VersionedStore::new(repository, "counter")
    }

    fn increment(current: Option<u32>) -> StoreResult<Mutation<u32>> {
        Ok(Mutation::Write(current.unwrap_or(0) + 1))
    }

    #[tokio::test]
    async fn test_mutate_creates_missing_document() {
        let store = counter(Arc::new(MemoryRepository::new()));
        let written = store.mutate(increment).await.unwrap();
        assert_eq!(written.value, Some(1));
        assert_eq!(store.get().await.unwrap(), written);
    }

    #[tokio::test]
    async fn test_no_change_skips_the_write() {
        let repository = Arc::new(ContendedRepository::new(0));
        let store = counter(repository.clone());
        store.mutate(increment).await.unwrap();

        let seen = store
            .mutate(|_| Ok::<_, StoreError>(Mutation::NoChange))
            .await
            .unwrap();
        assert_eq!(seen.value, Some(1));
        assert_eq!(repository.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_conflict_reruns_the_mutation() {
        let repository = Arc::new(ContendedRepository::new(1));
        let store = counter(repository.clone());
        store.mutate(increment).await.unwrap();

        let mut calls = 0;
        let written = store
            .mutate(|current| {
                calls += 1;
                increment(current)
            })
            .await
            .unwrap();

        // The first attempt raced the injected write and was retried.
        assert_eq!(calls, 2);
        assert_eq!(written.value, Some(2));
        assert_eq!(repository.puts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_errors_abort_without_writing() {
        let repository = Arc::new(ContendedRepository::new(0));
        let store = counter(repository.clone());
        let err = store
            .mutate(|_| Err::<Mutation<u32>, _>(StoreError::Timeout(Duration::ZERO)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        assert_eq!(repository.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_all_land() {
        let store = Arc::new(counter(Arc::new(MemoryRepository::new())));
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.mutate(increment).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(store.get().await.unwrap().value, Some(32));
    }

    #[tokio::test]
    async fn test_malformed_document_is_a_serialization_error() {
        let repository = Arc::new(MemoryRepository::new());
        repository
            .put("counter", serde_json::json!("not a number"), 0)
            .await
            .unwrap();
        let err = counter(repository).get().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
