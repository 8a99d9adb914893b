use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use gallery_engine::{
    FailureKind, PresignedClient, ProgressSink, RetryPolicy, TransferProgress, TransferSettings,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, max_retries: u32) -> PresignedClient {
    let mut settings = TransferSettings::new(server.uri());
    settings.retry = RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
    };
    PresignedClient::new(settings).expect("client")
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<TransferProgress>>,
}

impl Recorder {
    fn take(&self) -> Vec<TransferProgress> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for Recorder {
    fn emit(&self, progress: TransferProgress) {
        self.events.lock().unwrap().push(progress);
    }
}

async fn mount_upload_url(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "upload_url": format!("{}/bucket/object", server.uri()) })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn upload_puts_payload_and_reports_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_json(json!({ "key": "prints/rose.png" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "upload_url": format!("{}/bucket/object", server.uri()) })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bucket/object"))
        .and(header("content-type", "image/png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let recorder = Arc::new(Recorder::default());
    let payload = Bytes::from(vec![7u8; 200 * 1024]);

    let result = client
        .upload(
            "prints/rose.png",
            payload,
            "image/png",
            Some(recorder.clone() as Arc<dyn ProgressSink>),
        )
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.key, "prints/rose.png");
    assert_eq!(result.error, None);

    let percents: Vec<u8> = recorder
        .take()
        .into_iter()
        .filter_map(|event| match event {
            TransferProgress::Upload { percent } => Some(percent),
            TransferProgress::Download { .. } => None,
        })
        .collect();
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percents.last(), Some(&100));
}

#[tokio::test]
async fn upload_gives_up_after_retry_budget_on_acquisition_failure() {
    gallery_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let result = client
        .upload("prints/a.png", Bytes::from_static(b"x"), "image/png", None)
        .await;

    assert!(!result.success);
    assert_eq!(result.key, "prints/a.png");
    let message = result.error.expect("error message");
    assert!(message.contains("500"), "{message}");
    assert!(message.contains("boom"), "{message}");
}

#[tokio::test]
async fn failing_put_retries_inside_each_whole_upload_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "upload_url": format!("{}/bucket/object", server.uri()) })),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bucket/object"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let client = client_for(&server, 1);
    let err = client
        .try_upload("prints/a.png", Bytes::from_static(b"x"), "image/png", None)
        .await
        .expect_err("upload must fail");

    assert_eq!(err.kind, FailureKind::HttpStatus(503));
}

#[tokio::test]
async fn missing_upload_url_is_an_acquisition_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "other": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let err = client
        .try_upload("k.png", Bytes::from_static(b"x"), "image/png", None)
        .await
        .expect_err("no url");

    assert_eq!(err.kind, FailureKind::UrlAcquisition { status: Some(200) });
    assert!(err.message.contains("upload url missing"));
}

#[tokio::test]
async fn refused_acquisition_keeps_its_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let err = client
        .try_upload("k.png", Bytes::from_static(b"x"), "image/png", None)
        .await
        .expect_err("refused");

    assert_eq!(err.kind, FailureKind::UrlAcquisition { status: Some(403) });
}

#[tokio::test]
async fn download_returns_body_and_reports_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .and(query_param("key", "prints/red rose.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "download_url": format!("{}/bucket/rose", server.uri()) })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bucket/rose"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 4096]))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let recorder = Arc::new(Recorder::default());
    let body = client
        .download(
            "prints/red rose.png",
            Some(recorder.clone() as Arc<dyn ProgressSink>),
        )
        .await
        .expect("download ok");

    assert_eq!(body.len(), 4096);
    let events = recorder.take();
    assert!(!events.is_empty());
    assert_eq!(
        events.last(),
        Some(&TransferProgress::Download {
            loaded: 4096,
            total: 4096
        })
    );
}

#[tokio::test]
async fn download_is_attempted_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "download_url": format!("{}/bucket/gone", server.uri()) })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bucket/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let err = client.download("gone.png", None).await.expect_err("404");
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn missing_download_url_fails_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let err = client.download("a.png", None).await.expect_err("no url");
    assert_eq!(err.kind, FailureKind::UrlAcquisition { status: Some(200) });
}

#[tokio::test]
async fn upload_without_progress_sink_still_succeeds() {
    let server = MockServer::start().await;
    mount_upload_url(&server).await;
    Mock::given(method("PUT"))
        .and(path("/bucket/object"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 0);
    let receipt = client
        .try_upload("a.txt", Bytes::from_static(b"hello"), "text/plain", None)
        .await
        .expect("uploaded");
    assert_eq!(receipt.key, "a.txt");
}

#[tokio::test]
async fn slow_storage_put_is_not_cut_off_by_the_request_timeout() {
    let server = MockServer::start().await;
    mount_upload_url(&server).await;
    Mock::given(method("PUT"))
        .and(path("/bucket/object"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(400)))
        .expect(1)
        .mount(&server)
        .await;

    let mut client_settings = TransferSettings::new(server.uri());
    client_settings.retry = RetryPolicy {
        max_retries: 0,
        base_delay: Duration::from_millis(1),
    };
    client_settings.request_timeout = Duration::from_millis(100);
    let client = PresignedClient::new(client_settings).expect("client");

    let receipt = client
        .try_upload("big.png", Bytes::from(vec![0u8; 1024]), "image/png", None)
        .await
        .expect("slow PUT still completes");
    assert_eq!(receipt.key, "big.png");
}

#[tokio::test]
async fn slow_url_acquisition_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "upload_url": format!("{}/bucket/object", server.uri()) }))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let mut client_settings = TransferSettings::new(server.uri());
    client_settings.retry = RetryPolicy {
        max_retries: 0,
        base_delay: Duration::from_millis(1),
    };
    client_settings.request_timeout = Duration::from_millis(100);
    let client = PresignedClient::new(client_settings).expect("client");

    let err = client
        .try_upload("big.png", Bytes::from_static(b"x"), "image/png", None)
        .await
        .expect_err("acquisition deadline");
    assert_eq!(err.kind, FailureKind::Timeout);
}
