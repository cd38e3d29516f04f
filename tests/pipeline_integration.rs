//! Integration tests for the scan pipeline.
//!
//! Drives the full scan-extract-resolve-serialize flow through the public
//! API, with lopdf-built fixture PDFs and a wiremock Crossref stand-in.

use std::fs;
use std::sync::Mutex;

use bibscan_core::{
    CrossrefClient, Pipeline, ProgressEvent, RecordStatus, RequestPacer, RetryPolicy,
    serialize, write_library,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::{build_pdf, crossref_body};

fn test_pipeline(server_uri: &str) -> Pipeline {
    let resolver = CrossrefClient::with_base_url("test@example.com", server_uri)
        .expect("client")
        .with_retry_policy(RetryPolicy::immediate(1))
        .with_pacer(RequestPacer::disabled());
    Pipeline::new(resolver)
}

/// Runs the pipeline collecting progress events alongside the result.
async fn run_collecting(
    pipeline: &Pipeline,
    dir: &std::path::Path,
) -> (bibscan_core::RunResult, Vec<ProgressEvent>) {
    let events = Mutex::new(Vec::new());
    let result = pipeline
        .run(dir, |event| {
            events.lock().expect("event lock").push(event);
        })
        .await
        .expect("pipeline run");
    (result, events.into_inner().expect("event lock"))
}

#[tokio::test]
async fn test_mixed_directory_produces_one_terminal_record_per_file() {
    let server = MockServer::start().await;

    // alpha.pdf resolves fully; beta.pdf's DOI is unknown upstream.
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/.*alpha"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(crossref_body("Alpha Study", "Smith", "John", 2024, "Nature"), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/.*beta"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    build_pdf(&dir.path().join("a.pdf"), "See doi:10.1234/alpha for details", None);
    build_pdf(&dir.path().join("b.pdf"), "Preprint doi:10.1234/beta draft", None);
    build_pdf(&dir.path().join("c.pdf"), "No identifier anywhere here", None);

    let pipeline = test_pipeline(&server.uri());
    let (result, _) = run_collecting(&pipeline, dir.path()).await;

    assert_eq!(result.total(), 3);
    assert_eq!(result.success_count(), 1);

    // Files are processed in sorted order: a, b, c.
    let records = result.records();
    assert_eq!(records[0].status, RecordStatus::Success);
    assert_eq!(records[0].doi.as_deref(), Some("10.1234/alpha"));
    assert_eq!(records[0].title.as_deref(), Some("Alpha Study"));
    assert_eq!(records[0].authors.as_deref(), Some("Smith, John"));
    assert_eq!(records[0].year, Some(2024));
    assert_eq!(records[0].journal.as_deref(), Some("Nature"));

    assert_eq!(records[1].status, RecordStatus::MetadataNotFound);
    assert_eq!(records[1].doi.as_deref(), Some("10.1234/beta"));
    assert_eq!(records[1].title, None);

    assert_eq!(records[2].status, RecordStatus::DoiNotFound);
    assert_eq!(records[2].doi, None);
}

#[tokio::test]
async fn test_progress_events_are_monotonic_with_bookends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    build_pdf(&dir.path().join("a.pdf"), "doi:10.1234/one", None);
    build_pdf(&dir.path().join("b.pdf"), "doi:10.1234/two", None);

    let pipeline = test_pipeline(&server.uri());
    let (_, events) = run_collecting(&pipeline, dir.path()).await;

    // Initializing bookend, one event per file, saving bookend.
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].current, 0);
    assert_eq!(events[0].message, "Initializing scan...");
    assert_eq!(events[1].current, 1);
    assert_eq!(events[2].current, 2);
    assert_eq!(events[3].message, "Saving library...");
    assert!(events.iter().all(|e| e.total == 2));
    assert!(
        events.windows(2).all(|w| w[0].current <= w[1].current),
        "progress must never move backwards: {events:?}"
    );
}

#[tokio::test]
async fn test_per_file_failures_never_abort_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("a.pdf"), b"not a pdf at all").expect("write");
    build_pdf(&dir.path().join("b.pdf"), "doi:10.1234/unlucky", None);

    let pipeline = test_pipeline(&server.uri());
    let (result, _) = run_collecting(&pipeline, dir.path()).await;

    assert_eq!(result.total(), 2);
    assert_eq!(result.success_count(), 0);
    // Unparseable input reads as "no DOI", upstream failure as missing metadata.
    assert_eq!(result.records()[0].status, RecordStatus::DoiNotFound);
    assert_eq!(result.records()[1].status, RecordStatus::MetadataNotFound);
}

#[tokio::test]
async fn test_empty_directory_yields_empty_result_and_valid_library() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("tempdir");

    let pipeline = test_pipeline(&server.uri());
    let (result, events) = run_collecting(&pipeline, dir.path()).await;

    assert!(result.is_empty());
    assert_eq!(events.len(), 2, "only the bookends: {events:?}");

    let xml = serialize(result.records()).expect("serialize");
    assert!(xml.contains("<records>"), "{xml}");
    assert!(!xml.contains("<record>"), "{xml}");
}

#[tokio::test]
async fn test_missing_directory_is_a_run_level_error() {
    let server = MockServer::start().await;
    let pipeline = test_pipeline(&server.uri());

    let err = pipeline
        .run(std::path::Path::new("/nonexistent/never"), |_| {})
        .await
        .expect_err("missing directory must fail the run");
    assert!(err.to_string().contains("invalid input directory"), "{err}");
}

#[tokio::test]
async fn test_repeated_runs_over_unchanged_directory_are_identical() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/.*stable"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            crossref_body("Stable Paper", "Smith", "John", 2024, "Nature"),
            "application/json",
        ))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    build_pdf(&dir.path().join("a.pdf"), "doi:10.1234/stable", None);
    build_pdf(&dir.path().join("b.pdf"), "nothing to extract here", None);

    let pipeline = test_pipeline(&server.uri());
    let (first, _) = run_collecting(&pipeline, dir.path()).await;
    let (second, _) = run_collecting(&pipeline, dir.path()).await;

    // Same directory, same upstream answers: the serialized libraries must
    // match byte for byte.
    let first_xml = serialize(first.records()).expect("serialize first run");
    let second_xml = serialize(second.records()).expect("serialize second run");
    assert_eq!(first_xml, second_xml);
    assert_eq!(first_xml.matches("<record>").count(), 2);
}

#[tokio::test]
async fn test_scan_to_library_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                crossref_body("R&D of <Things>", "Dupont", "Amélie", 2023, "Science & Life"),
                "application/json",
            ),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    build_pdf(&dir.path().join("a.pdf"), "doi:10.5555/escaped", None);

    let pipeline = test_pipeline(&server.uri());
    let (result, _) = run_collecting(&pipeline, dir.path()).await;

    let out = dir.path().join("library.xml");
    write_library(result.records(), &out).expect("write library");

    let xml = fs::read_to_string(&out).expect("read library");
    // Escaped markup survives, one record element per scanned file.
    assert_eq!(xml.matches("<record>").count(), 1);
    assert!(xml.contains("R&amp;D of &lt;Things&gt;"), "{xml}");
    assert!(xml.contains("Science &amp; Life"), "{xml}");
    assert!(xml.contains("10.5555/escaped"), "{xml}");

    let summary = result.summary(&out);
    assert_eq!(summary, "Processed 1 files. 1 success. Saved to library.xml");
}
