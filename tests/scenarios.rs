use dropzone_uploader::adapters::{AdapterId, AdapterRegistry, DriveEntry, LocalAdapter};
use dropzone_uploader::config::DriveCredentials;
use dropzone_uploader::files::{BlobStore, Normalizer, RawItem};
use dropzone_uploader::preview::{PreviewContent, PreviewLoader};
use dropzone_uploader::selection::{DragController, SelectionState};
use dropzone_uploader::upload::UploadOrchestrator;
use dropzone_uploader::{EventSink, UploaderEvent, WidgetConfig};
use mockito::Matcher;
use serde_json::json;
use std::io::Write;

#[test]
fn drop_keeps_only_accepted_types() {
    let config = WidgetConfig {
        accept: Some(".png".into()),
        ..Default::default()
    };
    let blobs = BlobStore::new();
    let (sink, events) = EventSink::channel();
    let normalizer = Normalizer::new(&config, blobs.clone());
    let mut selection = SelectionState::new(&config, blobs.clone(), sink.clone());
    let mut drag = DragController::new(config.allows_multiple(), sink);

    drag.on_drag_enter();
    let outcome = drag.on_drop(
        vec![
            RawItem::from_bytes("notes.txt", None, b"hello".to_vec(), AdapterId::Internal),
            RawItem::from_bytes("logo.png", None, vec![0x89, 0x50], AdapterId::Internal),
        ],
        &normalizer,
        &mut selection,
    );

    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(selection.files()[0].name, "logo.png");
    assert_eq!(blobs.len(), 1);

    let mismatches: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            UploaderEvent::FileTypeMismatch { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(mismatches, vec!["notes.txt".to_string()]);
}

#[tokio::test]
async fn drive_confirm_is_capped_at_the_limit() {
    let mut server = mockito::Server::new_async().await;
    let _download = server
        .mock("GET", Matcher::Regex(r"^/drive/v3/files/\d+$".into()))
        .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
        .match_header("authorization", "Bearer token")
        .with_body("pixels")
        .expect(3)
        .create_async()
        .await;

    let config = WidgetConfig {
        limit: Some(2),
        google_drive: Some(DriveCredentials {
            client_id: "client".into(),
            access_token: Some("token".into()),
            api_base: Some(server.url()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let blobs = BlobStore::new();
    let (sink, events) = EventSink::channel();
    let normalizer = Normalizer::new(&config, blobs.clone());
    let mut selection = SelectionState::new(&config, blobs.clone(), sink.clone());

    let adapter = AdapterRegistry::from_config(&config)
        .build(AdapterId::GoogleDrive)
        .expect("google drive is configured");
    selection.choose(AdapterId::GoogleDrive);

    let entries: Vec<DriveEntry> = (1..=3)
        .map(|i| {
            let mut entry = DriveEntry::file(i.to_string(), format!("photo-{}.jpg", i));
            entry.mime = Some("image/jpeg".into());
            entry
        })
        .collect();
    let batch = adapter.fetch_all(&entries).await;
    assert!(batch.failures.is_empty());
    let outcome = selection.confirm(normalizer.normalize_all(batch.items, &sink));

    assert_eq!(selection.len(), 2);
    assert_eq!(outcome.dropped, vec!["photo-3.jpg".to_string()]);
    assert_eq!(selection.active_adapter(), None);
    assert_eq!(blobs.len(), 2);

    let warnings: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            UploaderEvent::Warning(message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("1 file(s)"));
}

#[tokio::test]
async fn failed_presign_leaves_the_rest_of_the_batch() {
    let mut server = mockito::Server::new_async().await;
    let _first = server
        .mock("POST", "/api/upload/presign")
        .match_body(Matcher::PartialJson(json!({"name": "one.txt"})))
        .with_body(
            json!({
                "key": "uploads/one.txt",
                "publicUrl": "https://cdn.example.com/uploads/one.txt",
                "uploadUrl": format!("{}/bucket/uploads/one.txt", server.url()),
                "expiresIn": 300
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _second = server
        .mock("POST", "/api/upload/presign")
        .match_body(Matcher::PartialJson(json!({"name": "two.txt"})))
        .with_status(500)
        .create_async()
        .await;
    let _put = server
        .mock("PUT", "/bucket/uploads/one.txt")
        .with_status(200)
        .create_async()
        .await;

    let config = WidgetConfig {
        token_endpoint: format!("{}/api/upload/presign", server.url()),
        ..Default::default()
    };
    let blobs = BlobStore::new();
    let (sink, events) = EventSink::channel();
    let normalizer = Normalizer::new(&config, blobs.clone());
    let files = normalizer.normalize_all(
        vec![
            RawItem::from_bytes("one.txt", None, b"first".to_vec(), AdapterId::Internal),
            RawItem::from_bytes("two.txt", None, b"second".to_vec(), AdapterId::Internal),
        ],
        &sink,
    );

    let uploaded = UploadOrchestrator::new(&config, blobs).upload(files, &sink).await;

    assert_eq!(uploaded.len(), 1);
    assert_eq!(
        uploaded[0].public_url.as_deref(),
        Some("https://cdn.example.com/uploads/one.txt")
    );

    let events: Vec<_> = events.try_iter().collect();
    let completed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            UploaderEvent::FileUploadComplete { file } => Some(file.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec!["one.txt"]);
    assert!(events.iter().any(|e| matches!(
        e,
        UploaderEvent::FileUploadError { name, reason, .. }
            if name == "two.txt" && reason.starts_with("Presigned URL error")
    )));
    match events.last() {
        Some(UploaderEvent::FilesUploadComplete { files }) => {
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].name, "one.txt");
        }
        other => panic!("expected batch completion, got {:?}", other),
    }
}

#[test]
fn mini_mode_keeps_the_first_picked_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for name in ["first.jpg", "second.jpg"] {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(b"jpeg").unwrap();
        paths.push(path);
    }

    let config = WidgetConfig {
        mini: true,
        ..Default::default()
    };
    let blobs = BlobStore::new();
    let (sink, _events) = EventSink::channel();
    let normalizer = Normalizer::new(&config, blobs.clone());
    let mut selection = SelectionState::new(&config, blobs, sink.clone());

    let items = LocalAdapter::to_raw_items(&paths);
    selection.confirm(normalizer.normalize_all(items, &sink));

    assert_eq!(selection.len(), 1);
    assert_eq!(selection.files()[0].name, "first.jpg");
}

#[tokio::test]
async fn previews_text_remotely_and_images_locally() {
    let mut server = mockito::Server::new_async().await;
    let remote = server
        .mock("GET", "/uploads/readme.md")
        .with_body("# Title\nbody")
        .expect(1)
        .create_async()
        .await;

    let config = WidgetConfig::default();
    let blobs = BlobStore::new();
    let (sink, _events) = EventSink::channel();
    let normalizer = Normalizer::new(&config, blobs.clone());
    let mut files = normalizer.normalize_all(
        vec![
            RawItem::from_bytes("readme.md", None, b"# Title\nbody".to_vec(), AdapterId::Internal),
            RawItem::from_bytes("photo.png", None, vec![0x89, b'P', b'N', b'G'], AdapterId::Internal),
        ],
        &sink,
    );
    let loader = PreviewLoader::new(blobs.clone(), config.preview_text_limit);

    // After upload the local reference is gone and the text comes from the public URL.
    let markdown = &mut files[0];
    blobs.revoke(&markdown.content_url);
    markdown.public_url = Some(format!("{}/uploads/readme.md", server.url()));
    match loader.load(markdown).await.unwrap() {
        PreviewContent::Text { body, truncated } => {
            assert_eq!(body, "# Title\nbody");
            assert!(!truncated);
        }
        other => panic!("expected text preview, got {:?}", other),
    }
    remote.assert_async().await;

    match loader.load(&files[1]).await.unwrap() {
        PreviewContent::Image { bytes, .. } => assert_eq!(&bytes[..], &[0x89, b'P', b'N', b'G']),
        other => panic!("expected image preview, got {:?}", other),
    }
}
