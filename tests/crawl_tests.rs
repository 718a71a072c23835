//! End-to-end crawl tests
//!
//! These tests run the real seed-download → segmenter → pool →
//! sub-download cycle against wiremock fixture servers, with all files
//! stored in a per-test temporary directory.
//!
//! The crawl itself is blocking by design (pool workers are OS threads),
//! so each test drives it through `spawn_blocking`.

use fcrawl::crawler::HtmlCrawler;
use fcrawl::fetch::Downloader;
use fcrawl::observer::{ChecksumObserver, Observer};
use fcrawl::output::CrawlReport;
use fcrawl::uri::Uri;
use std::net::TcpListener;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Adler-32 of `data`, computed through the crate's own observer.
fn adler_of(data: &[u8]) -> u32 {
    let mut checksum = 0u32;
    {
        let mut observer = ChecksumObserver::new(&mut checksum);
        observer.observe(data);
    }
    checksum
}

/// A loopback port with nothing listening on it.
fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let port = listener.local_addr().expect("probe addr").port();
    drop(listener);
    port
}

/// Mounts the seed page body at `/`.
async fn mount_seed(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Crawls the server's root page into a fresh temp dir and returns the
/// report together with the directory holding the stored files.
async fn crawl_seed(server: &MockServer, thread_limit: Option<usize>) -> (CrawlReport, TempDir) {
    let seed = Uri::parse(&server.uri());
    let dir = TempDir::new().expect("create temp dir");
    let dir_path = dir.path().to_path_buf();

    let report = tokio::task::spawn_blocking(move || {
        let mut crawler = HtmlCrawler::new(&seed, thread_limit, &dir_path);
        let downloader = Downloader::new(seed, dir_path.join("index.html"));
        assert!(downloader.run_with(&mut crawler), "seed download failed");
        crawler.finish()
    })
    .await
    .expect("crawl task");

    (report, dir)
}

#[tokio::test]
async fn test_crawls_relative_and_absolute_resources() {
    let server = MockServer::start().await;
    let base = server.uri();

    let seed_body = format!(
        "<html>\n<a href=\"/x\">first</a>\n<img src='{}/y.png'>\n</html>\n",
        base
    );
    mount_seed(&server, seed_body.clone()).await;

    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Wikipedia"))
        .mount(&server)
        .await;

    let png_body: &[u8] = b"not-really-a-png-but-long-enough";
    Mock::given(method("GET"))
        .and(path("/y.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_body))
        .mount(&server)
        .await;

    let (report, dir) = crawl_seed(&server, None).await;

    assert_eq!(report.entries.len(), 2);

    // Discovery order: the href on line 2, then the src on line 3.
    let first = &report.entries[0];
    assert_eq!(first.uri, "/x");
    let expected_name = dir.path().join("00000002_00000009").display().to_string();
    assert_eq!(first.record.filename, expected_name);
    assert!(first.record.success);
    assert_eq!(first.record.size, 9);
    assert_eq!(first.record.checksum, 0x11E6_0398);
    assert_eq!(
        std::fs::read(dir.path().join("00000002_00000009")).expect("stored /x"),
        b"Wikipedia"
    );

    let second = &report.entries[1];
    assert_eq!(second.uri, format!("{}/y.png", base));
    assert!(second.record.filename.ends_with("00000003_00000010"));
    assert!(second.record.success);
    assert_eq!(second.record.size, png_body.len() as u64);
    assert_eq!(second.record.checksum, adler_of(png_body));

    // The seed page itself was stored verbatim.
    assert_eq!(
        std::fs::read(dir.path().join("index.html")).expect("stored seed"),
        seed_body.as_bytes()
    );

    // Extremes and exact report text.
    assert_eq!(report.min_size().expect("min").uri, "/x");
    assert_eq!(report.max_size().expect("max").uri, second.uri);

    let mut rendered = Vec::new();
    report.write_to(&mut rendered).expect("render");
    let rendered = String::from_utf8(rendered).expect("utf-8");
    assert!(rendered.contains(&format!(
        "URI \"/x\" stored in {} size: 9, Adler32 checksum: 11e60398",
        expected_name
    )));
    assert!(rendered.contains("Minimal size: "));
    assert!(rendered.contains("Maximal size: "));
}

#[tokio::test]
async fn test_anchor_only_page_schedules_nothing() {
    let server = MockServer::start().await;
    mount_seed(
        &server,
        "<html><a href=\"#top\">jump</a></html>".to_string(),
    )
    .await;

    let (report, _dir) = crawl_seed(&server, None).await;

    assert!(report.entries.is_empty());
    let mut rendered = Vec::new();
    report.write_to(&mut rendered).expect("render");
    assert!(rendered.is_empty(), "empty crawl renders an empty report");
}

#[tokio::test]
async fn test_duplicate_uri_downloads_once() {
    let server = MockServer::start().await;
    mount_seed(
        &server,
        "<a href=\"/dup\">one</a><a href=\"/dup\">two</a>".to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/dup"))
        .respond_with(ResponseTemplate::new(200).set_body_string("once"))
        .expect(1)
        .mount(&server)
        .await;

    let (report, _dir) = crawl_seed(&server, None).await;

    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.uri, "/dup");
    // Named after the first occurrence.
    assert!(entry.record.filename.ends_with("00000001_00000009"));
    assert!(entry.record.success);
    assert_eq!(entry.record.size, 4);
}

#[tokio::test]
async fn test_commented_out_tags_are_not_fetched() {
    let server = MockServer::start().await;
    mount_seed(
        &server,
        "<html><!-- <a href=\"/trap\"> --></html>".to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/trap"))
        .respond_with(ResponseTemplate::new(200).set_body_string("trapped"))
        .expect(0)
        .mount(&server)
        .await;

    let (report, _dir) = crawl_seed(&server, None).await;
    assert!(report.entries.is_empty());
}

#[tokio::test]
async fn test_discovery_survives_large_bodies() {
    let server = MockServer::start().await;

    // The link sits past the downloader's read granularity, with the
    // quoted value straddling the 16 KiB boundary.
    let padding = "x".repeat(16370);
    let body = format!("{}<a href=\"/boundary\">tail</a>", padding);
    mount_seed(&server, body).await;

    Mock::given(method("GET"))
        .and(path("/boundary"))
        .respond_with(ResponseTemplate::new(200).set_body_string("B"))
        .mount(&server)
        .await;

    let (report, _dir) = crawl_seed(&server, None).await;

    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.uri, "/boundary");
    assert!(entry.record.success);
    assert_eq!(entry.record.size, 1);
}

#[tokio::test]
async fn test_thread_limit_two_with_ten_resources() {
    let server = MockServer::start().await;

    let links: String = (0..10)
        .map(|i| format!("<a href=\"/r{}\">l</a>\n", i))
        .collect();
    mount_seed(&server, format!("<html>\n{}</html>\n", links)).await;

    for i in 0..10 {
        Mock::given(method("GET"))
            .and(path(format!("/r{}", i)))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("resource-{}", i)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (report, dir) = crawl_seed(&server, Some(2)).await;

    assert_eq!(report.entries.len(), 10);
    for (i, entry) in report.entries.iter().enumerate() {
        assert_eq!(entry.uri, format!("/r{}", i));
        assert!(entry.record.success, "resource {} failed", i);
        let expected = format!("resource-{}", i);
        assert_eq!(entry.record.size, expected.len() as u64);
        assert_eq!(entry.record.checksum, adler_of(expected.as_bytes()));
        // Link i sits on line 2 + i, value quote at column 9.
        let name = format!("{:08}_{:08}", 2 + i, 9);
        assert!(
            entry.record.filename.ends_with(&name),
            "entry {} stored as {}",
            i,
            entry.record.filename
        );
        assert!(dir.path().join(&name).is_file());
    }
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let server = MockServer::start().await;
    mount_seed(&server, "<a href=\"/moved\">go</a>".to_string()).await;

    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/target"))
        .mount(&server)
        .await;

    let final_body = "final destination";
    Mock::given(method("GET"))
        .and(path("/target"))
        .respond_with(ResponseTemplate::new(200).set_body_string(final_body))
        .mount(&server)
        .await;

    let (report, _dir) = crawl_seed(&server, None).await;

    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert!(entry.record.success);
    assert_eq!(entry.record.size, final_body.len() as u64);
    assert_eq!(entry.record.checksum, adler_of(final_body.as_bytes()));
}

#[tokio::test]
async fn test_failed_resource_is_still_reported() {
    let server = MockServer::start().await;
    let dead_uri = format!("http://127.0.0.1:{}/z", refused_port());
    mount_seed(&server, format!("<a href=\"{}\">dead</a>", dead_uri)).await;

    let (report, _dir) = crawl_seed(&server, None).await;

    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.uri, dead_uri);
    assert!(!entry.record.success);
    assert_eq!(entry.record.size, 0);
    // No byte was ever observed; the checksum is Adler-32 of nothing.
    assert_eq!(entry.record.checksum, 1);
}

#[tokio::test]
async fn test_seed_download_failure_yields_empty_report() {
    let seed = Uri::parse(&format!("http://127.0.0.1:{}/", refused_port()));
    let dir = TempDir::new().expect("create temp dir");
    let dir_path = dir.path().to_path_buf();

    let report = tokio::task::spawn_blocking(move || {
        let mut crawler = HtmlCrawler::new(&seed, None, &dir_path);
        let downloader = Downloader::new(seed, dir_path.join("index.html"));
        assert!(!downloader.run_with(&mut crawler), "download must fail");
        crawler.finish()
    })
    .await
    .expect("crawl task");

    assert!(report.entries.is_empty());
}
