//! Asset ingestion service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use super::error::UploadError;
use super::existence::ExistenceChecker;
use super::key::{KeyResolver, normalize_folder};
use super::locks::KeyLocks;
use super::policy::AssetPolicy;
use super::publisher::Publisher;
use super::types::{PublicUrl, StorageKey, UploadOutcome, UploadRequest};
use super::validator::Validator;
use crate::storage::ObjectStore;

/// Composes validation, key resolution, existence check and publishing into
/// one asynchronous upload.
///
/// Deduplication is name-addressed: an existing key is assumed to hold the
/// same content, and bytes are never compared.
pub struct AssetService {
    validator: Validator,
    keys: KeyResolver,
    checker: ExistenceChecker,
    publisher: Publisher,
    locks: KeyLocks,
    deadline: Duration,
}

impl AssetService {
    /// Default overall deadline: 30 seconds.
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

    /// Create a new asset service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        policy: AssetPolicy,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            keys: KeyResolver::new(policy.dedup),
            validator: Validator::new(policy),
            checker: ExistenceChecker::new(Arc::clone(&store)),
            publisher: Publisher::new(store, public_base_url),
            locks: KeyLocks::new(),
            deadline: Self::DEFAULT_DEADLINE,
        }
    }

    /// Set the overall deadline for one upload.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Validator, for gating multipart parts before they are buffered.
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Policy in force.
    #[must_use]
    pub fn policy(&self) -> &AssetPolicy {
        self.validator.policy()
    }

    /// Upload a file and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by validation, the existence check or
    /// publishing. No partial or default URL is ever returned.
    pub async fn upload_to_storage(&self, request: UploadRequest) -> Result<PublicUrl, UploadError> {
        self.ingest(request).await.map(|outcome| outcome.url)
    }

    /// Upload a file and report where it landed and whether it was new.
    ///
    /// # Errors
    ///
    /// See [`upload_to_storage`](Self::upload_to_storage). Also fails with
    /// `DeadlineExceeded` when the lock, check and publish steps together run
    /// past the configured deadline.
    pub async fn ingest(&self, mut request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        // Validation and key resolution see the same folder.
        request.folder = normalize_folder(&request.folder)?;
        let class = self.validator.validate(&request)?;
        let key = self.keys.resolve(&request.folder, &request.original_name)?;

        debug!(
            key = %key,
            folder = %request.folder,
            class = class.map_or("unclassified", |c| c.as_str()),
            size = request.size_bytes,
            keys_in_flight = self.locks.len(),
            "Upload validated"
        );

        let deadline = Instant::now() + self.deadline;
        let Ok(_guard) = timeout_at(deadline, self.locks.lock(key.as_str())).await else {
            return Err(self.deadline_exceeded(&key));
        };

        let write_started = AtomicBool::new(false);
        match timeout_at(deadline, self.check_and_publish(&key, request, &write_started)).await {
            Ok(result) => result,
            Err(_) => {
                if write_started.load(Ordering::Acquire) {
                    self.publisher.discard(&key).await;
                }
                Err(self.deadline_exceeded(&key))
            }
        }
    }

    /// Remove an object this service published, e.g. when a sibling upload
    /// of the same request failed. Waits for any upload holding the key.
    pub async fn discard(&self, key: &StorageKey) {
        let _guard = self.locks.lock(key.as_str()).await;
        self.publisher.discard(key).await;
        info!(key = %key, "Asset discarded");
    }

    async fn check_and_publish(
        &self,
        key: &StorageKey,
        request: UploadRequest,
        write_started: &AtomicBool,
    ) -> Result<UploadOutcome, UploadError> {
        if self.checker.exists(key).await? {
            info!(key = %key, "Asset already stored, skipping upload");
            return Ok(UploadOutcome {
                key: key.clone(),
                url: self.publisher.url_for(key),
                deduplicated: true,
            });
        }

        write_started.store(true, Ordering::Release);
        let url = self
            .publisher
            .publish(key, request.bytes, &request.mime_type)
            .await?;

        Ok(UploadOutcome {
            key: key.clone(),
            url,
            deduplicated: false,
        })
    }

    fn deadline_exceeded(&self, key: &StorageKey) -> UploadError {
        warn!(key = %key, deadline_secs = self.deadline.as_secs(), "Upload deadline exceeded");
        UploadError::DeadlineExceeded {
            key: key.to_string(),
            after: self.deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetClass, DedupPolicy};
    use crate::storage::StorageError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    const BASE_URL: &str = "https://storage.googleapis.com";

    #[derive(Debug, Clone)]
    struct StoredObject {
        bytes: Bytes,
        content_type: String,
        public: bool,
    }

    /// In-memory store that counts calls and can be told to fail.
    #[derive(Default)]
    struct FakeStore {
        objects: Mutex<HashMap<String, StoredObject>>,
        exists_calls: AtomicUsize,
        write_calls: AtomicUsize,
        fail_exists: AtomicBool,
        fail_write: AtomicBool,
        fail_make_public: AtomicBool,
        write_delay: Mutex<Option<Duration>>,
    }

    impl FakeStore {
        fn store_calls(&self) -> usize {
            self.exists_calls.load(Ordering::SeqCst) + self.write_calls.load(Ordering::SeqCst)
        }

        fn object(&self, key: &str) -> Option<StoredObject> {
            self.objects.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        fn bucket(&self) -> &str {
            "melodia-test"
        }

        async fn exists(&self, key: &str) -> Result<bool, StorageError> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail_exists.load(Ordering::SeqCst) {
                return Err(StorageError::operation("connection refused"));
            }
            Ok(self.objects.lock().unwrap().contains_key(key))
        }

        async fn write(
            &self,
            key: &str,
            body: Bytes,
            content_type: &str,
        ) -> Result<(), StorageError> {
            self.write_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.write_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let partial = StoredObject {
                bytes: body.slice(..body.len() / 2),
                content_type: content_type.to_string(),
                public: false,
            };
            if self.fail_write.load(Ordering::SeqCst) {
                // Leave half an object behind, like an interrupted stream.
                self.objects.lock().unwrap().insert(key.to_string(), partial);
                return Err(StorageError::operation("stream reset"));
            }

            self.objects.lock().unwrap().insert(
                key.to_string(),
                StoredObject {
                    bytes: body,
                    content_type: content_type.to_string(),
                    public: false,
                },
            );
            Ok(())
        }

        async fn make_public(&self, key: &str) -> Result<(), StorageError> {
            if self.fail_make_public.load(Ordering::SeqCst) {
                return Err(StorageError::operation("permission denied"));
            }
            match self.objects.lock().unwrap().get_mut(key) {
                Some(object) => {
                    object.public = true;
                    Ok(())
                }
                None => Err(StorageError::NotFound(key.to_string())),
            }
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn service_with(policy: AssetPolicy) -> (Arc<FakeStore>, AssetService) {
        let store = Arc::new(FakeStore::default());
        let service = AssetService::new(store.clone(), policy, BASE_URL);
        (store, service)
    }

    fn image(name: &str, mime: &str, size: usize, folder: &str) -> UploadRequest {
        UploadRequest::new("image", name, mime, Bytes::from(vec![7u8; size]), folder)
    }

    fn song(name: &str, mime: &str, size: usize) -> UploadRequest {
        UploadRequest::new(
            "file_song",
            name,
            mime,
            Bytes::from(vec![1u8; size]),
            "songs/audio",
        )
    }

    #[tokio::test]
    async fn test_cover_upload_returns_public_url() {
        let (store, service) = service_with(AssetPolicy::default());

        let url = service
            .upload_to_storage(image("cover.png", "image/png", 500_000, "albums/images"))
            .await
            .expect("upload should succeed");

        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/melodia-test/albums/images/cover.png"
        );
        let stored = store.object("albums/images/cover.png").expect("object stored");
        assert!(stored.public);
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(stored.bytes.len(), 500_000);
    }

    #[tokio::test]
    async fn test_invalid_image_format_makes_no_store_call() {
        let (store, service) = service_with(AssetPolicy::default());

        let err = service
            .upload_to_storage(image("cover.webp", "image/webp", 1000, "albums/images"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::InvalidFormat { class: AssetClass::Image, .. }
        ));
        assert_eq!(store.store_calls(), 0);
    }

    #[tokio::test]
    async fn test_ogg_song_rejected() {
        let (store, service) = service_with(AssetPolicy::default());

        let err = service
            .upload_to_storage(song("track.ogg", "audio/ogg", 1000))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::InvalidFormat { .. }));
        assert_eq!(store.store_calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_audio_makes_no_store_call() {
        let (store, service) = service_with(AssetPolicy::default());

        let err = service
            .upload_to_storage(song("long.wav", "audio/wav", 15 * 1024 * 1024 + 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::TooLarge { class: AssetClass::Audio, limit: 15_728_640, .. }
        ));
        assert_eq!(store.store_calls(), 0);
    }

    #[tokio::test]
    async fn test_name_stable_dedup_publishes_once() {
        let (store, service) = service_with(AssetPolicy::default());

        let first = service
            .ingest(image("cover.png", "image/png", 100, "songs/images"))
            .await
            .unwrap();
        let second = service
            .ingest(image("cover.png", "image/png", 200, "songs/images"))
            .await
            .unwrap();

        assert_eq!(first.url, second.url);
        assert!(!first.deduplicated);
        assert!(second.deduplicated);
        assert_eq!(store.write_calls.load(Ordering::SeqCst), 1);
        // Name-addressed: the first payload is kept even though the second differs.
        assert_eq!(store.object("songs/images/cover.png").unwrap().bytes.len(), 100);
    }

    #[tokio::test]
    async fn test_always_unique_never_dedups() {
        let policy = AssetPolicy::default().with_dedup(DedupPolicy::AlwaysUnique);
        let (store, service) = service_with(policy);

        let first = service
            .ingest(image("cover.png", "image/png", 100, "songs/images"))
            .await
            .unwrap();
        let second = service
            .ingest(image("cover.png", "image/png", 100, "songs/images"))
            .await
            .unwrap();

        assert_ne!(first.key, second.key);
        assert_ne!(first.url, second.url);
        assert!(!first.deduplicated && !second.deduplicated);
        assert_eq!(store.write_calls.load(Ordering::SeqCst), 2);
        assert!(first.key.file_name().ends_with("_cover.png"));
    }

    #[tokio::test]
    async fn test_write_failure_leaves_no_public_object() {
        let (store, service) = service_with(AssetPolicy::default());
        store.fail_write.store(true, Ordering::SeqCst);

        let err = service
            .upload_to_storage(song("track.mp3", "audio/mpeg", 4096))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::UploadFailed { .. }));
        assert!(err.is_retryable());
        assert!(store.object("songs/audio/track.mp3").is_none());
    }

    #[tokio::test]
    async fn test_publish_failure_returns_no_url_and_rolls_back() {
        let (store, service) = service_with(AssetPolicy::default());
        store.fail_make_public.store(true, Ordering::SeqCst);

        let err = service
            .upload_to_storage(image("avatar.gif", "image/gif", 64, "artists/images"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::PublishFailed { .. }));
        assert!(store.object("artists/images/avatar.gif").is_none());

        // A retry writes again instead of deduplicating onto an unpublished object.
        store.fail_make_public.store(false, Ordering::SeqCst);
        let outcome = service
            .ingest(image("avatar.gif", "image/gif", 64, "artists/images"))
            .await
            .unwrap();
        assert!(!outcome.deduplicated);
        assert_eq!(store.write_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_existence_failure_is_not_absence() {
        let (store, service) = service_with(AssetPolicy::default());
        store.fail_exists.store(true, Ordering::SeqCst);

        let err = service
            .upload_to_storage(image("flag.png", "image/png", 10, "countries/images"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::StorageUnavailable { .. }));
        assert_eq!(store.write_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deadline_cancels_write_and_rolls_back() {
        let store = Arc::new(FakeStore::default());
        *store.write_delay.lock().unwrap() = Some(Duration::from_secs(5));
        let service = AssetService::new(store.clone(), AssetPolicy::default(), BASE_URL)
            .with_deadline(Duration::from_millis(50));

        let err = service
            .upload_to_storage(song("slow.mp3", "audio/mpeg", 128))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::DeadlineExceeded { .. }));
        assert!(store.object("songs/audio/slow.mp3").is_none());
    }

    #[tokio::test]
    async fn test_trailing_slash_folder_keeps_size_cap() {
        let (store, service) = service_with(AssetPolicy::default());

        let err = service
            .ingest(image("big.png", "image/png", 10 * 1024 * 1024, "albums/images/"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::TooLarge { class: AssetClass::Image, ref folder, .. } if folder == "albums/images"
        ));
        assert_eq!(store.store_calls(), 0);
    }

    #[tokio::test]
    async fn test_leading_slash_folder_keeps_format_rules() {
        let (store, service) = service_with(AssetPolicy::default());

        let err = service
            .ingest(UploadRequest::new(
                "file_song",
                "track.ogg",
                "audio/ogg",
                Bytes::from_static(b"ogg"),
                "/songs/audio",
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::InvalidFormat { class: AssetClass::Audio, .. }
        ));
        assert_eq!(store.store_calls(), 0);
    }

    #[tokio::test]
    async fn test_padded_folder_lands_on_canonical_key() {
        let (_, service) = service_with(AssetPolicy::default());

        let first = service
            .ingest(image("cover.png", "image/png", 10, "/albums/images/"))
            .await
            .unwrap();
        let second = service
            .ingest(image("cover.png", "image/png", 10, "albums/images"))
            .await
            .unwrap();

        assert_eq!(first.key.as_str(), "albums/images/cover.png");
        assert!(second.deduplicated);
    }

    #[tokio::test]
    async fn test_traversal_folder_makes_no_store_call() {
        let (store, service) = service_with(AssetPolicy::default());

        let err = service
            .ingest(image("x.png", "image/png", 10, "albums/../../etc"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::InvalidFolder { .. }));
        assert_eq!(store.store_calls(), 0);
    }

    #[tokio::test]
    async fn test_discard_removes_published_object() {
        let (store, service) = service_with(AssetPolicy::default());

        let outcome = service
            .ingest(song("demo.mp3", "audio/mpeg", 64))
            .await
            .unwrap();
        service.discard(&outcome.key).await;

        assert!(store.object("songs/audio/demo.mp3").is_none());
        let again = service.ingest(song("demo.mp3", "audio/mpeg", 64)).await.unwrap();
        assert!(!again.deduplicated);
    }

    #[tokio::test]
    async fn test_unknown_folder_passes_through() {
        let (store, service) = service_with(AssetPolicy::default());

        let url = service
            .upload_to_storage(UploadRequest::new(
                "image",
                "me.webp",
                "image/webp",
                Bytes::from_static(b"webp"),
                "users/avatars",
            ))
            .await
            .unwrap();

        assert!(url.as_str().ends_with("/melodia-test/users/avatars/me.webp"));
        assert!(store.object("users/avatars/me.webp").unwrap().public);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_key_single_writer() {
        let (store, service) = service_with(AssetPolicy::default());
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .ingest(image("cover.jpg", "image/jpeg", 32, "albums/images"))
                        .await
                })
            })
            .collect();

        let mut urls = Vec::new();
        for handle in handles {
            urls.push(handle.await.unwrap().unwrap().url);
        }

        assert_eq!(store.write_calls.load(Ordering::SeqCst), 1);
        assert!(urls.windows(2).all(|w| w[0] == w[1]));
    }
}
