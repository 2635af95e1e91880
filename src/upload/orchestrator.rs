use crate::config::WidgetConfig;
use crate::error::{Result, UploaderError, ValidationError};
use crate::events::{EventSink, UploaderEvent};
use crate::files::{chunked, AcceptPattern, BlobStore, ManagedFile};
use crate::upload::{ImageCompressor, PresignClient, PresignedTarget, ProgressTracker};
use bytes::Bytes;
use futures::future::{join_all, AbortHandle, AbortRegistration, Abortable};
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

const CHUNK_SIZE: usize = 64 * 1024;

type SharedTracker = Arc<Mutex<ProgressTracker>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Abort handles of in-flight uploads, keyed by file id.
#[derive(Debug, Clone, Default)]
pub struct UploadHandles {
    inner: Arc<Mutex<HashMap<String, AbortHandle>>>,
}

impl UploadHandles {
    fn register(&self, file_id: &str) -> AbortRegistration {
        let (handle, registration) = AbortHandle::new_pair();
        lock(&self.inner).insert(file_id.to_string(), handle);
        registration
    }

    fn release(&self, file_id: &str) {
        lock(&self.inner).remove(file_id);
    }

    /// Aborts the upload of `file_id` if one is registered.
    pub fn cancel(&self, file_id: &str) -> bool {
        match lock(&self.inner).remove(file_id) {
            Some(handle) => {
                tracing::info!(file_id, "cancelling in-flight upload");
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.inner).len()
    }
}

/// Files registered for upload. Each one can be cancelled from the moment the batch exists.
pub struct UploadBatch {
    orchestrator: UploadOrchestrator,
    files: Vec<(ManagedFile, AbortRegistration)>,
}

impl UploadBatch {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub async fn run(self, events: &EventSink) -> Vec<ManagedFile> {
        self.orchestrator.run(self.files, events).await
    }
}

/// Presigns, streams and reports each file of a batch independently.
#[derive(Clone)]
pub struct UploadOrchestrator {
    client: reqwest::Client,
    presign: PresignClient,
    accept: AcceptPattern,
    config: WidgetConfig,
    blobs: BlobStore,
    compressor: Option<ImageCompressor>,
    handles: UploadHandles,
}

impl UploadOrchestrator {
    pub fn new(config: &WidgetConfig, blobs: BlobStore) -> Self {
        let client = reqwest::Client::new();
        Self {
            presign: PresignClient::new(client.clone(), config),
            client,
            accept: AcceptPattern::from_config(config.accept.as_deref()),
            config: config.clone(),
            blobs,
            compressor: config.compress_images.map(ImageCompressor::new),
            handles: UploadHandles::default(),
        }
    }

    pub fn handles(&self) -> UploadHandles {
        self.handles.clone()
    }

    /// Registers an abort handle for every file right away. Nothing is sent until the batch runs.
    pub fn prepare(&self, files: Vec<ManagedFile>) -> UploadBatch {
        let files = files
            .into_iter()
            .map(|file| {
                let registration = self.handles.register(&file.id);
                (file, registration)
            })
            .collect();
        UploadBatch {
            orchestrator: self.clone(),
            files,
        }
    }

    /// Uploads every file concurrently. One file failing never stops the others.
    /// Returns the uploaded files, carrying their public URLs, in input order.
    pub async fn upload(&self, files: Vec<ManagedFile>, events: &EventSink) -> Vec<ManagedFile> {
        self.prepare(files).run(events).await
    }

    async fn run(
        &self,
        files: Vec<(ManagedFile, AbortRegistration)>,
        events: &EventSink,
    ) -> Vec<ManagedFile> {
        let tracker: SharedTracker = Arc::new(Mutex::new(ProgressTracker::new(files.len())));
        tracing::info!(count = files.len(), "starting upload batch");

        let uploads = files.into_iter().map(|(file, registration)| {
            let tracker = tracker.clone();
            async move {
                let file_id = file.id.clone();
                let name = file.name.clone();

                let result = Abortable::new(self.upload_one(file, &tracker, events), registration).await;
                self.handles.release(&file_id);

                match result {
                    Ok(Ok(file)) => Some(file),
                    // Already reported as a type or size rejection.
                    Ok(Err(UploaderError::FileValidation(_))) => {
                        lock(&tracker).remove(&file_id);
                        None
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(file = %name, "upload failed: {}", e);
                        lock(&tracker).remove(&file_id);
                        events.emit(UploaderEvent::FileUploadError {
                            file_id,
                            name,
                            reason: e.to_string(),
                        });
                        None
                    }
                    Err(_aborted) => {
                        lock(&tracker).remove(&file_id);
                        events.emit(UploaderEvent::FileUploadError {
                            file_id,
                            name,
                            reason: "cancelled".to_string(),
                        });
                        None
                    }
                }
            }
        });

        let uploaded: Vec<ManagedFile> = join_all(uploads).await.into_iter().flatten().collect();

        tracing::info!(uploaded = uploaded.len(), "upload batch finished");
        events.emit(UploaderEvent::FilesUploadComplete {
            files: uploaded.clone(),
        });
        uploaded
    }

    pub fn validate(&self, file: &ManagedFile) -> std::result::Result<(), ValidationError> {
        if !self.accept.matches(&file.name, &file.mime) {
            return Err(ValidationError::TypeMismatch {
                name: file.name.clone(),
                mime: file.mime.clone(),
                accept: self.accept.as_str().to_string(),
            });
        }

        let max = file
            .source
            .map(|source| self.config.max_bytes_for(source))
            .unwrap_or_else(|| self.config.max_file_bytes());
        if let Some(max) = max {
            if file.size > max {
                return Err(ValidationError::SizeExceeded {
                    name: file.name.clone(),
                    size: file.size,
                    max,
                });
            }
        }

        Ok(())
    }

    async fn upload_one(
        &self,
        mut file: ManagedFile,
        tracker: &SharedTracker,
        events: &EventSink,
    ) -> Result<ManagedFile> {
        if let Err(e) = self.validate(&file) {
            crate::files::report_rejection(&e, events);
            return Err(e.into());
        }

        events.emit(UploaderEvent::FileUploadStart {
            file_id: file.id.clone(),
            name: file.name.clone(),
        });

        let payload = self.compress(&file).await;
        if let Some(bytes) = &payload {
            file.size = bytes.len() as u64;
        }
        lock(tracker).start(&file.id, file.size);

        let target = self.presign.presign(&file).await?;
        self.put(&file, &target, payload, tracker, events).await?;

        file.key = Some(target.key);
        file.public_url = Some(target.public_url);

        let total = lock(tracker).complete(&file.id);
        tracing::info!(file = %file.name, url = ?file.public_url, "upload complete");
        events.emit(UploaderEvent::FileUploadComplete { file: file.clone() });
        events.emit(UploaderEvent::TotalUploadProgress { percentage: total });
        Ok(file)
    }

    /// Re-encodes the image when compression is configured. Any failure keeps the original.
    async fn compress(&self, file: &ManagedFile) -> Option<Bytes> {
        let compressor = self.compressor?;
        if !ImageCompressor::supports(&file.mime) {
            return None;
        }

        let original = match self.blobs.read(&file.content_url).await {
            Ok(original) => original,
            Err(e) => {
                tracing::warn!(file = %file.name, "cannot read image for compression: {}", e);
                return None;
            }
        };
        let mime = file.mime.clone();
        match tokio::task::spawn_blocking(move || compressor.compress(&original, &mime)).await {
            Ok(Ok(Some(bytes))) => {
                tracing::info!(file = %file.name, before = file.size, after = bytes.len(), "image compressed");
                Some(Bytes::from(bytes))
            }
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                tracing::warn!(file = %file.name, "keeping original image: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!(file = %file.name, "image compression task failed: {}", e);
                None
            }
        }
    }

    /// Streams the content to the presigned URL, reporting progress per chunk.
    async fn put(
        &self,
        file: &ManagedFile,
        target: &PresignedTarget,
        payload: Option<Bytes>,
        tracker: &SharedTracker,
        events: &EventSink,
    ) -> Result<()> {
        if target.is_expired() {
            return Err(UploaderError::PresignedUrl(format!(
                "upload URL for {} expired before the upload started",
                file.name
            )));
        }

        let (total, content) = match payload {
            Some(bytes) => (bytes.len() as u64, chunked(bytes, CHUNK_SIZE)),
            None => self.blobs.stream(&file.content_url, CHUNK_SIZE).await?,
        };
        if total != file.size {
            lock(tracker).start(&file.id, total);
        }

        let mut loaded = 0u64;
        let file_id = file.id.clone();
        let progress_tracker = tracker.clone();
        let progress_events = events.clone();
        let body = content.map(move |chunk: io::Result<Bytes>| {
            if let Ok(bytes) = &chunk {
                loaded += bytes.len() as u64;
                if let Some(entry) = lock(&progress_tracker).advance(&file_id, loaded) {
                    progress_events.emit(UploaderEvent::FileUploadProgress {
                        file_id: file_id.clone(),
                        loaded: entry.loaded,
                        total: entry.total,
                        percentage: entry.percentage(),
                    });
                }
            }
            chunk
        });

        let response = self
            .client
            .put(&target.upload_url)
            .header(CONTENT_TYPE, &file.mime)
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| UploaderError::Transport(format!("Failed to send upload: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploaderError::Transport(format!(
                "Upload failed with status: {}",
                status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterId;
    use crate::files::{Normalizer, RawItem};
    use mockito::Matcher;
    use serde_json::json;

    fn config(endpoint: String) -> WidgetConfig {
        WidgetConfig {
            token_endpoint: endpoint,
            ..Default::default()
        }
    }

    fn managed(normalizer: &Normalizer, name: &str, bytes: Vec<u8>) -> ManagedFile {
        normalizer
            .normalize(RawItem::from_bytes(name, None, bytes, AdapterId::Internal))
            .unwrap()
    }

    fn target(server: &mockito::Server, key: &str, expires_in: u64) -> String {
        json!({
            "key": key,
            "publicUrl": format!("https://cdn.example.com/{}", key),
            "uploadUrl": format!("{}/bucket/{}", server.url(), key),
            "expiresIn": expires_in,
        })
        .to_string()
    }

    #[tokio::test]
    async fn one_failed_presign_does_not_stop_the_batch() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("POST", "/presign")
            .match_body(Matcher::PartialJson(json!({"name": "a.png", "type": "image/png"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(target(&server, "a.png", 600))
            .create_async()
            .await;
        let _failing = server
            .mock("POST", "/presign")
            .match_body(Matcher::PartialJson(json!({"name": "b.png"})))
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/bucket/a.png")
            .match_header("content-type", "image/png")
            .match_header("content-length", "3")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let config = config(format!("{}/presign", server.url()));
        let blobs = BlobStore::new();
        let normalizer = Normalizer::new(&config, blobs.clone());
        let files = vec![
            managed(&normalizer, "a.png", vec![1, 2, 3]),
            managed(&normalizer, "b.png", vec![4, 5]),
        ];
        let (sink, events) = EventSink::channel();

        let uploaded = UploadOrchestrator::new(&config, blobs).upload(files, &sink).await;

        put.assert_async().await;
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].key.as_deref(), Some("a.png"));
        assert_eq!(
            uploaded[0].public_url.as_deref(),
            Some("https://cdn.example.com/a.png")
        );

        let seen: Vec<_> = events.try_iter().collect();
        assert!(seen.iter().any(|e| matches!(
            e,
            UploaderEvent::FileUploadError { name, reason, .. }
                if name == "b.png" && reason.contains("500")
        )));
        assert!(seen.iter().any(|e| matches!(
            e,
            UploaderEvent::FileUploadProgress { percentage: 100, total: 3, .. }
        )));
        assert!(seen.iter().any(|e| matches!(
            e,
            UploaderEvent::TotalUploadProgress { percentage: 50 }
        )));
        assert!(matches!(
            seen.last(),
            Some(UploaderEvent::FilesUploadComplete { files }) if files.len() == 1
        ));
    }

    #[tokio::test]
    async fn expired_target_is_not_uploaded() {
        let mut server = mockito::Server::new_async().await;
        let _presign = server
            .mock("POST", "/presign")
            .with_status(200)
            .with_body(target(&server, "late.txt", 0))
            .create_async()
            .await;
        let put = server
            .mock("PUT", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let config = config(format!("{}/presign", server.url()));
        let blobs = BlobStore::new();
        let normalizer = Normalizer::new(&config, blobs.clone());
        let files = vec![managed(&normalizer, "late.txt", b"hello".to_vec())];
        let (sink, events) = EventSink::channel();

        let uploaded = UploadOrchestrator::new(&config, blobs).upload(files, &sink).await;

        put.assert_async().await;
        assert!(uploaded.is_empty());
        assert!(events.try_iter().any(|e| matches!(
            e,
            UploaderEvent::FileUploadError { reason, .. } if reason.contains("expired")
        )));
    }

    #[tokio::test]
    async fn rejected_put_reports_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _presign = server
            .mock("POST", "/presign")
            .with_status(200)
            .with_body(target(&server, "a.txt", 600))
            .create_async()
            .await;
        let _put = server
            .mock("PUT", "/bucket/a.txt")
            .with_status(403)
            .create_async()
            .await;

        let config = config(format!("{}/presign", server.url()));
        let blobs = BlobStore::new();
        let normalizer = Normalizer::new(&config, blobs.clone());
        let files = vec![managed(&normalizer, "a.txt", b"abc".to_vec())];
        let (sink, events) = EventSink::channel();

        let uploaded = UploadOrchestrator::new(&config, blobs).upload(files, &sink).await;

        assert!(uploaded.is_empty());
        assert!(events.try_iter().any(|e| matches!(
            e,
            UploaderEvent::FileUploadError { reason, .. } if reason.contains("403")
        )));
    }

    #[tokio::test]
    async fn files_violating_accept_are_skipped_without_requests() {
        let mut server = mockito::Server::new_async().await;
        let presign = server
            .mock("POST", "/presign")
            .expect(0)
            .create_async()
            .await;

        let open = WidgetConfig::default();
        let blobs = BlobStore::new();
        let file = managed(&Normalizer::new(&open, blobs.clone()), "notes.txt", b"x".to_vec());

        let strict = WidgetConfig {
            accept: Some("image/*".into()),
            ..config(format!("{}/presign", server.url()))
        };
        let (sink, events) = EventSink::channel();
        let uploaded = UploadOrchestrator::new(&strict, blobs).upload(vec![file], &sink).await;

        presign.assert_async().await;
        assert!(uploaded.is_empty());
        let seen: Vec<_> = events.try_iter().collect();
        assert!(seen
            .iter()
            .any(|e| matches!(e, UploaderEvent::FileTypeMismatch { name, .. } if name == "notes.txt")));
        assert!(!seen
            .iter()
            .any(|e| matches!(e, UploaderEvent::FileUploadStart { .. })));
    }

    #[tokio::test]
    async fn cancelling_unknown_upload_is_a_no_op() {
        let orchestrator = UploadOrchestrator::new(&WidgetConfig::default(), BlobStore::new());
        let handles = orchestrator.handles();
        assert!(!handles.cancel("missing"));
        assert_eq!(handles.in_flight(), 0);
    }

    #[tokio::test]
    async fn cancelling_a_prepared_batch_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let presign = server
            .mock("POST", "/presign")
            .expect(0)
            .create_async()
            .await;

        let config = config(format!("{}/presign", server.url()));
        let blobs = BlobStore::new();
        let normalizer = Normalizer::new(&config, blobs.clone());
        let file = managed(&normalizer, "early.txt", b"abc".to_vec());
        let file_id = file.id.clone();
        let (sink, events) = EventSink::channel();

        let orchestrator = UploadOrchestrator::new(&config, blobs);
        let handles = orchestrator.handles();
        let batch = orchestrator.prepare(vec![file]);
        assert_eq!(batch.len(), 1);
        assert_eq!(handles.in_flight(), 1);

        assert!(handles.cancel(&file_id));
        let uploaded = batch.run(&sink).await;

        presign.assert_async().await;
        assert!(uploaded.is_empty());
        let seen: Vec<_> = events.try_iter().collect();
        assert!(seen.iter().any(|e| matches!(
            e,
            UploaderEvent::FileUploadError { name, reason, .. }
                if name == "early.txt" && reason == "cancelled"
        )));
        assert!(matches!(
            seen.last(),
            Some(UploaderEvent::FilesUploadComplete { files }) if files.is_empty()
        ));
    }

    #[tokio::test]
    async fn cancelling_during_the_put_reports_cancelled() {
        // Accepts the upload connection and never answers.
        let stalled = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let stalled_addr = stalled.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = stalled.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let mut server = mockito::Server::new_async().await;
        let _presign = server
            .mock("POST", "/presign")
            .with_body(
                json!({
                    "key": "slow.bin",
                    "publicUrl": "https://cdn.example.com/slow.bin",
                    "uploadUrl": format!("http://{}/bucket/slow.bin", stalled_addr),
                    "expiresIn": 600,
                })
                .to_string(),
            )
            .create_async()
            .await;

        let config = config(format!("{}/presign", server.url()));
        let blobs = BlobStore::new();
        let normalizer = Normalizer::new(&config, blobs.clone());
        let file = managed(&normalizer, "slow.bin", vec![0u8; 1024]);
        let file_id = file.id.clone();
        let (sink, events) = EventSink::channel();

        let orchestrator = UploadOrchestrator::new(&config, blobs);
        let handles = orchestrator.handles();
        let batch = orchestrator.prepare(vec![file]);
        let upload = tokio::spawn(async move { batch.run(&sink).await });

        let mut seen = Vec::new();
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                seen.extend(events.try_iter());
                if seen
                    .iter()
                    .any(|e| matches!(e, UploaderEvent::FileUploadProgress { .. }))
                {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("body never reached the connection");

        assert!(handles.cancel(&file_id));
        let uploaded = upload.await.unwrap();
        seen.extend(events.try_iter());

        assert!(uploaded.is_empty());
        assert_eq!(handles.in_flight(), 0);
        assert!(seen.iter().any(|e| matches!(
            e,
            UploaderEvent::FileUploadError { name, reason, .. }
                if name == "slow.bin" && reason == "cancelled"
        )));
        assert!(!seen
            .iter()
            .any(|e| matches!(e, UploaderEvent::FileUploadComplete { .. })));
        assert!(matches!(
            seen.last(),
            Some(UploaderEvent::FilesUploadComplete { files }) if files.is_empty()
        ));
    }

    #[tokio::test]
    async fn path_backed_files_are_streamed_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "0123456789").unwrap();

        let mut server = mockito::Server::new_async().await;
        let _presign = server
            .mock("POST", "/presign")
            .match_body(Matcher::PartialJson(json!({"name": "report.txt", "size": 10})))
            .with_body(target(&server, "report.txt", 600))
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/bucket/report.txt")
            .match_header("content-length", "10")
            .match_body("0123456789")
            .expect(1)
            .create_async()
            .await;

        let config = config(format!("{}/presign", server.url()));
        let blobs = BlobStore::new();
        let normalizer = Normalizer::new(&config, blobs.clone());
        let file = normalizer
            .normalize(RawItem::from_path(&path, AdapterId::Internal).unwrap())
            .unwrap();
        let (sink, _events) = EventSink::channel();

        let uploaded = UploadOrchestrator::new(&config, blobs).upload(vec![file], &sink).await;

        put.assert_async().await;
        assert_eq!(uploaded.len(), 1);
    }

    #[tokio::test]
    async fn configured_compression_shrinks_images_before_presign() {
        use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

        let pixels = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 3) as u8, (y * 3) as u8, 40]));
        let mut original = Vec::new();
        DynamicImage::ImageRgb8(pixels)
            .write_to(&mut std::io::Cursor::new(&mut original), ImageOutputFormat::Png)
            .unwrap();

        let mut server = mockito::Server::new_async().await;
        let _presign = server
            .mock("POST", "/presign")
            .with_body(target(&server, "photo.png", 600))
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/bucket/photo.png")
            .expect(1)
            .create_async()
            .await;

        let config = WidgetConfig {
            compress_images: Some(crate::config::ImageCompression {
                quality: 80,
                max_dimension: Some(8),
            }),
            ..config(format!("{}/presign", server.url()))
        };
        let blobs = BlobStore::new();
        let normalizer = Normalizer::new(&config, blobs.clone());
        let file = managed(&normalizer, "photo.png", original.clone());
        let (sink, _events) = EventSink::channel();

        let uploaded = UploadOrchestrator::new(&config, blobs).upload(vec![file], &sink).await;

        put.assert_async().await;
        assert_eq!(uploaded.len(), 1);
        assert!(uploaded[0].size < original.len() as u64);
    }
}
