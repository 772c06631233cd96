use sync_core::content::ContentSource;
use sync_core::error::content::ContentError;

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REMOTE: &str = r#"{"moments":[{"id":"live","title":"Live","beats":[{},{},{},{}]}]}"#;
const STATIC: &str = r#"{"moments":[{"id":"welcome","beats":[{},{}]}]}"#;

fn static_file(dir: &TempDir) -> PathBuf {
    let file = dir.path().join("content.json");
    std::fs::write(&file, STATIC).unwrap();
    file
}

async fn cms(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/content"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

/// **VALUE**: Verifies CMS content wins when the endpoint answers.
#[tokio::test]
async fn given_healthy_cms_when_loading_then_remote_content_used() {
    // GIVEN
    let dir = TempDir::new().unwrap();
    let server = cms(ResponseTemplate::new(200).set_body_string(REMOTE)).await;
    let source = ContentSource::new(
        Some(static_file(&dir)),
        Some(format!("{}/content", server.uri())),
        Duration::from_secs(2),
    )
    .unwrap();

    // WHEN
    let sequence = source.load().await.unwrap();

    // THEN
    assert_eq!(sequence.moments()[0].id(), "live");
    assert_eq!(sequence.total_beats(), 4);
}

/// **VALUE**: Verifies server errors fall back to the static file.
#[tokio::test]
async fn given_cms_error_status_when_loading_then_static_content_used() {
    // GIVEN
    let dir = TempDir::new().unwrap();
    let server = cms(ResponseTemplate::new(500)).await;
    let source = ContentSource::new(
        Some(static_file(&dir)),
        Some(format!("{}/content", server.uri())),
        Duration::from_secs(2),
    )
    .unwrap();

    // WHEN
    let sequence = source.load().await.unwrap();

    // THEN
    assert_eq!(sequence.moments()[0].id(), "welcome");
}

/// **VALUE**: Verifies a CMS slower than the timeout falls back instead of stalling startup.
///
/// **WHY THIS MATTERS**: The exhibit must come up on opening day even when the CMS is slow.
#[tokio::test]
async fn given_slow_cms_when_loading_then_timeout_falls_back() {
    // GIVEN
    let dir = TempDir::new().unwrap();
    let server = cms(
        ResponseTemplate::new(200)
            .set_body_string(REMOTE)
            .set_delay(Duration::from_secs(2)),
    )
    .await;
    let url = format!("{}/content", server.uri());
    let source = ContentSource::new(
        Some(static_file(&dir)),
        Some(url.clone()),
        Duration::from_millis(200),
    )
    .unwrap();

    // WHEN
    let sequence = source.load().await.unwrap();
    let direct = source.fetch(&url).await;

    // THEN
    assert_eq!(sequence.moments()[0].id(), "welcome");
    assert!(matches!(
        direct,
        Err(ContentError::Fetch {
            is_timeout: true,
            ..
        })
    ));
}

/// **VALUE**: Verifies garbage from the CMS falls back.
#[tokio::test]
async fn given_cms_returning_bad_json_when_loading_then_static_content_used() {
    // GIVEN
    let dir = TempDir::new().unwrap();
    let server = cms(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>")).await;
    let source = ContentSource::new(
        Some(static_file(&dir)),
        Some(format!("{}/content", server.uri())),
        Duration::from_secs(2),
    )
    .unwrap();

    // WHEN
    let sequence = source.load().await.unwrap();

    // THEN
    assert_eq!(sequence.total_beats(), 2);
}

/// **VALUE**: Verifies the fetch error surfaces when there is nothing to fall back to.
#[tokio::test]
async fn given_failing_cms_and_no_static_file_when_loading_then_fetch_error() {
    // GIVEN
    let server = cms(ResponseTemplate::new(503)).await;
    let source = ContentSource::new(
        None,
        Some(format!("{}/content", server.uri())),
        Duration::from_secs(2),
    )
    .unwrap();

    // WHEN
    let result = source.load().await;

    // THEN
    assert!(matches!(
        result,
        Err(ContentError::Fetch {
            is_timeout: false,
            ..
        })
    ));
}
