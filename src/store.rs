use crate::errors::StoreError;
use crate::models::UserId;
use crate::snapshot::RawDocument;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::{collections::BTreeMap, path::Path, path::PathBuf, sync::Arc};
use tokio::{
    fs,
    sync::{Mutex, broadcast},
};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{debug, error};

const CHANGE_BUFFER: usize = 64;

pub type DocumentStream = BoxStream<'static, Result<RawDocument, StoreError>>;

/// Document store the counters are synchronised with.
///
/// `subscribe` yields the current document first (empty when absent) and then
/// the full document after every change, in write order. Dropping the stream
/// unsubscribes.
#[async_trait]
pub trait RemoteCounterStore: Send + Sync + 'static {
    async fn subscribe(&self, key: &str) -> Result<DocumentStream, StoreError>;

    async fn write(&self, key: &str, patch: RawDocument, merge: bool) -> Result<(), StoreError>;
}

pub fn document_path(app_id: &str, user: &UserId) -> String {
    format!("artifacts/{app_id}/users/{user}/integrationCounts/dailyCounts")
}

/// In-memory document store, optionally persisted to one JSON file.
#[derive(Clone)]
pub struct DocumentStore {
    path: Option<PathBuf>,
    documents: Arc<Mutex<BTreeMap<String, RawDocument>>>,
    changes: broadcast::Sender<(String, RawDocument)>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self::with_documents(None, BTreeMap::new())
    }

    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let documents = load_documents(&path).await;
        Self::with_documents(Some(path), documents)
    }

    fn with_documents(path: Option<PathBuf>, documents: BTreeMap<String, RawDocument>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            path,
            documents: Arc::new(Mutex::new(documents)),
            changes,
        }
    }

    pub async fn document(&self, key: &str) -> Option<RawDocument> {
        self.documents.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl RemoteCounterStore for DocumentStore {
    async fn subscribe(&self, key: &str) -> Result<DocumentStream, StoreError> {
        // receiver first so no change between the read and the subscription is missed
        let receiver = self.changes.subscribe();
        let initial = self.document(key).await.unwrap_or_default();
        let key = key.to_string();

        let changes = BroadcastStream::new(receiver).filter_map(move |change| {
            let item = match change {
                Ok((changed, document)) if changed == key => Some(Ok(document)),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    Some(Err(StoreError::Lagged(skipped)))
                }
            };
            futures::future::ready(item)
        });

        Ok(stream::once(futures::future::ready(Ok(initial)))
            .chain(changes)
            .boxed())
    }

    async fn write(&self, key: &str, patch: RawDocument, merge: bool) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().await;
        let mut updated = if merge {
            documents.get(key).cloned().unwrap_or_default()
        } else {
            RawDocument::new()
        };
        updated.extend(patch);

        // a write that cannot be persisted leaves the store untouched
        if let Some(path) = &self.path {
            let mut staged = documents.clone();
            staged.insert(key.to_string(), updated.clone());
            persist_documents(path, &staged).await?;
            *documents = staged;
        } else {
            documents.insert(key.to_string(), updated.clone());
        }

        // sent under the lock so subscribers observe writes in order
        if self.changes.send((key.to_string(), updated)).is_err() {
            debug!(key, "no subscribers for document change");
        }
        Ok(())
    }
}

async fn load_documents(path: &Path) -> BTreeMap<String, RawDocument> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(documents) => documents,
            Err(err) => {
                error!("failed to parse data file: {err}");
                BTreeMap::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
        Err(err) => {
            error!("failed to read data file: {err}");
            BTreeMap::new()
        }
    }
}

async fn persist_documents(
    path: &Path,
    documents: &BTreeMap<String, RawDocument>,
) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(documents)?;
    fs::write(path, payload).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawDocument {
        value.as_object().cloned().unwrap()
    }

    fn unique_data_path() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("progress_tracker_store_{}_{}.json", std::process::id(), nanos));
        path
    }

    #[test]
    fn document_path_follows_user_layout() {
        let path = document_path("default-app-id", &UserId::new("abc"));
        assert_eq!(path, "artifacts/default-app-id/users/abc/integrationCounts/dailyCounts");
    }

    #[tokio::test]
    async fn subscribe_starts_with_empty_document() {
        let store = DocumentStore::in_memory();
        let mut stream = store.subscribe("doc").await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert!(first.is_empty());
    }

    #[tokio::test]
    async fn merge_write_keeps_other_fields() {
        let store = DocumentStore::in_memory();
        store.write("doc", raw(json!({ "2026-01-01": 1 })), true).await.unwrap();
        store.write("doc", raw(json!({ "2026-01-02": 2 })), true).await.unwrap();
        assert_eq!(
            store.document("doc").await.map(serde_json::Value::Object),
            Some(json!({ "2026-01-01": 1, "2026-01-02": 2 }))
        );

        store.write("doc", raw(json!({ "2026-01-03": 3 })), false).await.unwrap();
        assert_eq!(
            store.document("doc").await.map(serde_json::Value::Object),
            Some(json!({ "2026-01-03": 3 }))
        );
    }

    #[tokio::test]
    async fn subscribers_only_see_their_document_in_order() {
        let store = DocumentStore::in_memory();
        let mut stream = store.subscribe("mine").await.unwrap();
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        store.write("other", raw(json!({ "2026-01-01": 9 })), true).await.unwrap();
        store.write("mine", raw(json!({ "2026-01-01": 1 })), true).await.unwrap();
        store.write("mine", raw(json!({ "2026-01-01": 2 })), true).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(first.get("2026-01-01"), Some(&json!(1)));
        assert_eq!(second.get("2026-01-01"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn documents_survive_reopen() {
        let path = unique_data_path();
        let store = DocumentStore::open(&path).await;
        store.write("doc", raw(json!({ "2026-01-01": 5 })), true).await.unwrap();

        let reopened = DocumentStore::open(&path).await;
        let document = reopened.document("doc").await.unwrap();
        assert_eq!(document.get("2026-01-01"), Some(&json!(5)));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let path = unique_data_path();
        std::fs::write(&path, b"not json").unwrap();
        let store = DocumentStore::open(&path).await;
        assert!(store.document("doc").await.is_none());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn failed_persist_leaves_document_unchanged() {
        let mut path = unique_data_path();
        path.set_extension("missing");
        path.push("data.json");
        let store = DocumentStore::open(&path).await;
        let mut stream = store.subscribe("doc").await.unwrap();
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        let result = store.write("doc", raw(json!({ "2026-01-05": 9 })), true).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(store.document("doc").await.is_none());
        assert!(futures::FutureExt::now_or_never(stream.next()).is_none());
    }
}
