//! End-to-end ingest runs against a mock catalog.

use std::path::{Path, PathBuf};

use orbitscrape_core::{SilentProgress, run_ingest};
use orbitscrape_shared::{CatalogConfig, IngestConfig, NoradId, OrbitScrapeError};
use orbitscrape_storage::Store;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn temp_root(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("orbitscrape-e2e-{tag}-{}", Uuid::now_v7()))
}

fn config_for(server: &MockServer, root: &Path, start: u32, end: u32) -> IngestConfig {
    IngestConfig {
        start: NoradId(start),
        end: NoradId(end),
        output_dir: root.to_path_buf(),
        concurrency: 2,
        pacing_ms: 0,
        request_timeout_secs: 5,
        catalog: CatalogConfig {
            base_url: server.uri(),
            detail_path: "/satellite/?s={id}".into(),
            description_domain: "127.0.0.1".into(),
            thumbnail_url: format!("{}/thumbs/{{id}}.jpg", server.uri()),
        },
    }
}

async fn mount_html(server: &MockServer, at: &str, query: Option<(&str, &str)>, body: String, expected: u64) {
    let mut mock = Mock::given(method("GET")).and(path(at));
    if let Some((key, value)) = query {
        mock = mock.and(query_param(key, value));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, at: &str, status: u16, expected: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(vec![0x89, 0x50]))
        .expect(expected)
        .mount(server)
        .await;
}

fn category_page(title: &str, text: &str) -> String {
    format!(
        "<html><body><h1>{title}</h1><table>\n  <tr><td>{title}</td></tr>\n  <tr><td>{text}</td></tr>\n</table></body></html>"
    )
}

/// Detail pages for ids 1 and 2; id 3 is unknown to the catalog.
async fn mount_catalog(server: &MockServer, wording: &str, upstream_fetches: u64) {
    let detail_one = format!(
        r#"<html><body><table><tbody><tr><td><a href="{uri}/spacecraft/1">NSSDC</a></td></tr></tbody></table>
        <div class="arrow"><a href="/satellites/?c=4">Brightest</a></div>
        <div class="arrow"><a href="/satellites/?c=11">Space stations</a></div></body></html>"#,
        uri = server.uri()
    );
    let detail_two = r#"<html><body>
        <div class="arrow"><a href="/satellites/?c=4">Brightest</a></div></body></html>"#
        .to_string();

    mount_html(server, "/satellite/", Some(("s", "1")), detail_one, 1).await;
    mount_html(server, "/satellite/", Some(("s", "2")), detail_two, 1).await;

    mount_html(
        server,
        "/satellites/",
        Some(("c", "4")),
        category_page("Brightest", &format!("{wording} bright objects.")),
        upstream_fetches,
    )
    .await;
    mount_html(
        server,
        "/satellites/",
        Some(("c", "11")),
        category_page("Space stations", &format!("{wording} stations.")),
        upstream_fetches,
    )
    .await;

    let description = format!(
        r#"<html><body><div class="urone"><p>{wording} station.</p><p> </p><p>Crewed.</p></div>
        <div class="urtwo"><img src="/gallery/one.jpg"></div></body></html>"#
    );
    mount_html(server, "/spacecraft/1", None, description, upstream_fetches).await;

    mount_image(server, "/gallery/one.jpg", 200, upstream_fetches).await;
    mount_image(server, "/thumbs/1.jpg", 200, upstream_fetches).await;
    // Never persisted, so asked for on every run.
    mount_image(server, "/thumbs/2.jpg", 404, 1).await;
}

#[tokio::test]
async fn ingest_persists_every_record_kind() {
    let server = MockServer::start().await;
    mount_catalog(&server, "Original", 1).await;

    let root = temp_root("full");
    let config = config_for(&server, &root, 1, 3);
    let report = run_ingest(&config, &SilentProgress, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.dispatch.dispatched, 3);
    assert_eq!(report.dispatch.completed, 3);
    assert!(!report.cancelled());
    assert_eq!(report.aggregate.satellites_received, 3);
    assert_eq!(report.aggregate.categories_written, 2);
    assert_eq!(report.aggregate.descriptions_written, 1);
    assert_eq!(report.aggregate.category_lists_written, 2);
    assert_eq!(report.aggregate.images_written, 2);
    assert_eq!(report.aggregate.write_failures, 0);

    let store = Store::open(&root).await.unwrap();
    assert_eq!(
        store.read_category(NoradId(4)).await.unwrap(),
        "\n  Original bright objects.\n"
    );
    assert_eq!(
        store.read_satellite_description(NoradId(1)).await.unwrap(),
        "Original station.\nCrewed."
    );
    assert_eq!(
        store.read_satellite_categories(NoradId(1)).await.unwrap(),
        vec![NoradId(4), NoradId(11)]
    );
    assert_eq!(
        store.read_satellite_categories(NoradId(2)).await.unwrap(),
        vec![NoradId(4)]
    );
    assert!(!store.satellite_description_exists(NoradId(2)).await);
    assert!(store.image_exists(NoradId(1), "one.jpg").await);
    assert!(store.image_exists(NoradId(1), "1.jpg").await);
    assert!(!store.image_dir(NoradId(2)).exists());
    assert!(!store.satellite_categories_path(NoradId(3)).exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn rerun_keeps_existing_artifacts() {
    let root = temp_root("rerun");

    {
        let first = MockServer::start().await;
        mount_catalog(&first, "Original", 1).await;
        run_ingest(&config_for(&first, &root, 1, 3), &SilentProgress, CancellationToken::new())
            .await
            .unwrap();
    }

    // Upstream content changed; nothing already stored may be fetched or rewritten.
    let second = MockServer::start().await;
    mount_catalog(&second, "Changed", 0).await;
    let report = run_ingest(
        &config_for(&second, &root, 1, 3),
        &SilentProgress,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.aggregate.categories_written, 0);
    assert_eq!(report.aggregate.descriptions_written, 0);
    assert_eq!(report.aggregate.images_written, 0);
    // Category membership is re-derived and rewritten.
    assert_eq!(report.aggregate.category_lists_written, 2);

    let store = Store::open(&root).await.unwrap();
    assert_eq!(
        store.read_category(NoradId(11)).await.unwrap(),
        "\n  Original stations.\n"
    );
    assert_eq!(
        store.read_satellite_description(NoradId(1)).await.unwrap(),
        "Original station.\nCrewed."
    );

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn cancelled_run_returns_cleanly() {
    let server = MockServer::start().await;
    let root = temp_root("cancel");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = run_ingest(&config_for(&server, &root, 0, 1_000), &SilentProgress, cancel)
        .await
        .unwrap();

    assert!(report.cancelled());
    assert_eq!(report.dispatch.dispatched, 0);
    assert_eq!(report.aggregate.satellites_received, 0);
    assert!(root.join("satellites").is_dir());

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn inverted_range_is_a_config_error() {
    let server = MockServer::start().await;
    let root = temp_root("inverted");

    let err = run_ingest(&config_for(&server, &root, 5, 1), &SilentProgress, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, OrbitScrapeError::Config { .. }));
    assert!(!root.exists());
}
