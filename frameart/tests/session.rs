//! Integration tests for RemoteArtSession

use frameart::session::REFRESH_FAILED_MESSAGE;
use frameart::{CurrentArtStatus, FrameArtClient, RemoteArtSession};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_for(server: &MockServer) -> RemoteArtSession {
    RemoteArtSession::new(
        FrameArtClient::builder()
            .base_url(server.uri())
            .build()
            .unwrap(),
    )
}

async fn mount_current(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/current-image"))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_initial_state_is_loading() {
    let mock_server = MockServer::start().await;
    let session = session_for(&mock_server);

    assert_eq!(session.status().await, CurrentArtStatus::Loading);
    assert!(session.last_error().await.is_none());
}

#[tokio::test]
async fn test_not_in_art_mode_is_a_state() {
    let mock_server = MockServer::start().await;
    mount_current(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "status": "no_art_mode",
            "message": "La TV n'est pas en mode Art"
        })),
    )
    .await;

    let session = session_for(&mock_server);
    let status = session.refresh().await;

    assert!(matches!(status, CurrentArtStatus::NoArtMode { .. }));
    assert_eq!(status.message(), Some("La TV n'est pas en mode Art"));
    assert_eq!(session.status().await, status);
    assert!(session.last_error().await.is_none());
}

#[tokio::test]
async fn test_no_current_image() {
    let mock_server = MockServer::start().await;
    mount_current(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({"status": "no_current_image"})),
    )
    .await;

    let session = session_for(&mock_server);
    assert_eq!(
        session.refresh().await,
        CurrentArtStatus::NoCurrentImage {
            message: "No image is currently displayed on the TV".to_string()
        }
    );
}

#[tokio::test]
async fn test_server_failure_is_fail_soft() {
    let mock_server = MockServer::start().await;
    mount_current(
        &mock_server,
        ResponseTemplate::new(500).set_body_json(json!({"detail": "TV unreachable"})),
    )
    .await;

    let session = session_for(&mock_server);
    let status = session.refresh().await;

    assert_eq!(
        status,
        CurrentArtStatus::NoCurrentImage {
            message: REFRESH_FAILED_MESSAGE.to_string()
        }
    );
    assert_eq!(session.last_error().await.and_then(|e| e.status()), Some(500));
}

#[tokio::test]
async fn test_transport_failure_is_fail_soft() {
    let session = RemoteArtSession::new(
        FrameArtClient::builder()
            .base_url("http://127.0.0.1:1")
            .build()
            .unwrap(),
    );

    let status = session.refresh().await;
    assert_eq!(status.message(), Some(REFRESH_FAILED_MESSAGE));
    assert!(session.last_error().await.is_some_and(|e| e.is_transport()));
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/current-image"))
        .respond_with(ResponseTemplate::new(200).set_body_string("garbage"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_current(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({"content_id": "MY_F0042"})),
    )
    .await;

    let session = session_for(&mock_server);
    session.refresh().await;
    assert!(session.last_error().await.is_some());

    let status = session.refresh().await;
    assert_eq!(status.content_id(), Some("MY_F0042"));
    assert!(session.last_error().await.is_none());
}

#[tokio::test]
async fn test_loading_while_in_flight() {
    let mock_server = MockServer::start().await;
    mount_current(
        &mock_server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"content_id": "SUN001"}))
            .set_delay(Duration::from_millis(300)),
    )
    .await;

    let session = session_for(&mock_server);
    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.status().await.is_loading());
    assert!(session.is_refreshing().await);

    let status = pending.await.unwrap();
    assert_eq!(status.content_id(), Some("SUN001"));
    assert_eq!(session.status().await, status);
    assert!(!session.is_refreshing().await);
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/current-image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"content_id": "SUN001", "title": "Sunset"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = session_for(&mock_server);
    let (a, b, c) = tokio::join!(session.refresh(), session.refresh(), session.refresh());

    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a.content_id(), Some("SUN001"));
    assert_eq!(session.status().await, a);
}

#[tokio::test]
async fn test_timed_out_refresh_is_abandoned() {
    let mock_server = MockServer::start().await;
    mount_current(
        &mock_server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"content_id": "OLD001"}))
            .set_delay(Duration::from_millis(300)),
    )
    .await;

    let session = session_for(&mock_server);
    let timed_out = tokio::time::timeout(Duration::from_millis(50), session.refresh()).await;
    assert!(timed_out.is_err());
    assert!(!session.is_refreshing().await);

    mock_server.reset().await;
    mount_current(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({"content_id": "NEW001"})),
    )
    .await;

    let status = session.refresh().await;
    assert_eq!(status.content_id(), Some("NEW001"));
    assert_eq!(session.status().await, status);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_refresh_after_invalidate_does_not_join() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/current-image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"content_id": "OLD001"}))
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_current(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({"content_id": "NEW001"})),
    )
    .await;

    let session = session_for(&mock_server);
    let older = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    session.invalidate();
    let newer = session.refresh().await;
    assert_eq!(newer.content_id(), Some("NEW001"));

    // Older settlement reaches its caller without being recorded
    let older = older.await.unwrap();
    assert_eq!(older.content_id(), Some("OLD001"));
    assert_eq!(session.status().await, newer);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}
