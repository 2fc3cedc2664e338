//! Integration tests for the image catalog pipeline

use frameart::{
    CurrentArtStatus, Error, FrameArtClient, Image, ImageCatalog, PhotoSource, RemoteArtSession,
    UnsplashBridge,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{any, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> FrameArtClient {
    FrameArtClient::builder()
        .base_url(server.uri())
        .build()
        .unwrap()
}

async fn mount_listing(server: &MockServer, images: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(images))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_upload_send_apply_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"file": "sunset.jpg", "remote_filename": null})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/send-to-tv"))
        .and(body_json(json!({"filename": "sunset.jpg"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"file": "sunset.jpg", "remote_filename": "SUN001"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/set-image"))
        .and(body_json(json!({"remote_filename": "SUN001"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/current-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content_id": "SUN001",
            "thumbnail": "aGVsbG8=",
            "title": "Sunset",
            "artist": null
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let catalog = ImageCatalog::new(client.clone());
    let session = RemoteArtSession::new(client);

    let image = catalog.upload(b"jpeg".to_vec(), "sunset.jpg").await.unwrap();
    assert_eq!(image, Image::new("sunset.jpg"));
    assert_eq!(catalog.get("sunset.jpg").await, Some(Image::new("sunset.jpg")));

    let image = catalog.send_to_device("sunset.jpg").await.unwrap();
    assert_eq!(image.remote_filename.as_deref(), Some("SUN001"));
    assert_eq!(
        catalog.get("sunset.jpg").await,
        Some(Image::on_device("sunset.jpg", "SUN001"))
    );

    let reply = catalog.apply_as_current("SUN001").await.unwrap();
    assert!(reply.is_success());

    match session.refresh().await {
        CurrentArtStatus::Displaying {
            content_id,
            thumbnail,
            title,
            artist,
        } => {
            assert_eq!(content_id, "SUN001");
            assert_eq!(thumbnail.unwrap().decode().unwrap(), b"hello");
            assert_eq!(title.as_deref(), Some("Sunset"));
            assert_eq!(artist, None);
        }
        other => panic!("unexpected status: {other:?}"),
    }
}

#[tokio::test]
async fn test_apply_unknown_remote_filename_is_local() {
    let mock_server = MockServer::start().await;

    mount_listing(
        &mock_server,
        json!([{"file": "forest.png", "remote_filename": null}]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/set-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let catalog = ImageCatalog::new(client_for(&mock_server));
    catalog.list().await;

    let err = catalog.apply_as_current("NOPE42").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = catalog.apply_as_current("").await.unwrap_err();
    assert!(err.is_validation());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "only the listing reached the backend");
}

#[tokio::test]
async fn test_failed_list_keeps_previous_images() {
    let mock_server = MockServer::start().await;

    mount_listing(
        &mock_server,
        json!([
            {"file": "a.jpg", "remote_filename": "A1"},
            {"file": "b.jpg", "remote_filename": null},
            {"file": "c.png", "remote_filename": "C3"}
        ]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/api/images"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "Disk unavailable"})),
        )
        .mount(&mock_server)
        .await;

    let catalog = ImageCatalog::new(client_for(&mock_server));

    let listing = catalog.list().await;
    assert!(listing.error.is_none());
    assert_eq!(listing.images.len(), 3);

    let listing = catalog.list().await;
    assert!(listing.is_stale());
    assert_eq!(listing.images.len(), 3);
    assert_eq!(listing.images[0].id, "a.jpg");
    assert_eq!(catalog.len().await, 3);
    assert_eq!(
        catalog.last_error().await.and_then(|e| e.status()),
        Some(500)
    );
}

#[tokio::test]
async fn test_transport_failure_keeps_previous_images() {
    let mock_server = MockServer::start().await;
    mount_listing(
        &mock_server,
        json!([{"file": "a.jpg"}, {"file": "b.jpg"}, {"file": "c.jpg"}]),
    )
    .await;

    let catalog = ImageCatalog::new(client_for(&mock_server));
    catalog.list().await;
    assert_eq!(catalog.len().await, 3);

    drop(mock_server);

    let listing = catalog.list().await;
    assert!(listing.error.as_ref().is_some_and(Error::is_transport));
    assert_eq!(catalog.images().await.len(), 3);
}

#[tokio::test]
async fn test_failed_send_leaves_image_untouched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": "sunset.jpg"})))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/send-to-tv"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "Échec de l'upload via les deux méthodes (directe et SmartThings)"
        })))
        .mount(&mock_server)
        .await;

    let catalog = ImageCatalog::new(client_for(&mock_server));
    catalog.upload(b"jpeg".to_vec(), "sunset.jpg").await.unwrap();

    let err = catalog.send_to_device("sunset.jpg").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(catalog.get("sunset.jpg").await, Some(Image::new("sunset.jpg")));
}

#[tokio::test]
async fn test_failed_upload_does_not_mutate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Format non supporté"})),
        )
        .mount(&mock_server)
        .await;

    let catalog = ImageCatalog::new(client_for(&mock_server));
    let err = catalog.upload(b"GIF89a".to_vec(), "anim.gif").await.unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(catalog.is_empty().await);
}

#[tokio::test]
async fn test_reupload_resets_device_association() {
    let mock_server = MockServer::start().await;

    mount_listing(
        &mock_server,
        json!([
            {"file": "a.jpg", "remote_filename": "A1"},
            {"file": "b.jpg", "remote_filename": "B2"}
        ]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": "a.jpg"})))
        .mount(&mock_server)
        .await;

    let catalog = ImageCatalog::new(client_for(&mock_server));
    catalog.list().await;
    catalog.upload(b"jpeg".to_vec(), "a.jpg").await.unwrap();

    let images = catalog.images().await;
    assert_eq!(images, vec![Image::new("a.jpg"), Image::on_device("b.jpg", "B2")]);
}

#[tokio::test]
async fn test_newer_listing_supersedes_older() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/images"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"file": "old.jpg"}]))
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"file": "new.jpg"}])))
        .mount(&mock_server)
        .await;

    let catalog = ImageCatalog::new(client_for(&mock_server));

    let slow = tokio::spawn({
        let catalog = catalog.clone();
        async move { catalog.list().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fresh = catalog.list().await;
    assert_eq!(fresh.images, vec![Image::new("new.jpg")]);

    let stale = slow.await.unwrap();
    assert!(stale.error.is_none());
    assert_eq!(catalog.images().await, vec![Image::new("new.jpg")]);
}

#[tokio::test]
async fn test_ingest_featured_photo() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/unsplash-featured"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "xyz789",
            "description": null,
            "urls": {
                "regular": format!("{}/photos/xyz789.jpg", mock_server.uri()),
                "small": format!("{}/photos/xyz789-small.jpg", mock_server.uri())
            },
            "user": {"name": "John Smith", "profile": "https://unsplash.com/@john"},
            "download_location": format!("{}/track/xyz789", mock_server.uri())
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/track/xyz789"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/photos/xyz789.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xff\xd8photo".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"file": "unsplash-xyz789.jpg"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let bridge = UnsplashBridge::new(client.clone());
    let catalog = ImageCatalog::new(client);

    let photos = bridge.featured().await.unwrap();
    assert_eq!(photos[0].alt_text(), "Unsplash photo");

    let image = catalog.ingest(&bridge, &photos[0]).await.unwrap();
    assert_eq!(image, Image::new("unsplash-xyz789.jpg"));
    assert!(catalog.get("unsplash-xyz789.jpg").await.is_some());
}

#[tokio::test]
async fn test_blank_search_is_local() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let bridge = UnsplashBridge::new(client_for(&mock_server));
    assert!(bridge.search("").await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_apply_invalidates_refresh_in_flight() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/current-image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "no_current_image"}))
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/current-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content_id": "SUN001"})))
        .mount(&mock_server)
        .await;

    mount_listing(
        &mock_server,
        json!([{"file": "sunset.jpg", "remote_filename": "SUN001"}]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/set-image"))
        .and(body_json(json!({"remote_filename": "SUN001"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let session = RemoteArtSession::new(client.clone());
    let catalog = ImageCatalog::new(client).with_session(session.clone());

    let before_apply = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    catalog.list().await;
    catalog.apply_as_current("SUN001").await.unwrap();

    let status = session.refresh().await;
    assert_eq!(status.content_id(), Some("SUN001"));

    let stale = before_apply.await.unwrap();
    assert!(matches!(stale, CurrentArtStatus::NoCurrentImage { .. }));
    assert_eq!(session.status().await, status);

    let refreshes = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/api/current-image")
        .count();
    assert_eq!(refreshes, 2);
}
