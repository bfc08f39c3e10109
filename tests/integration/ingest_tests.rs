//! Integration tests for the ingestion pipeline
//!
//! These tests use wiremock to serve article pages and run the full
//! read, fetch, extract and persist cycle end-to-end.

use article_ingest::config::{
    load_config, Config, ExtractorConfig, OutputConfig, PipelineConfig, UserAgentConfig,
};
use article_ingest::pipeline::FailureStage;
use article_ingest::sink::{SinkError, StorageSink};
use article_ingest::storage::{open_storage, RunStatus, Storage};
use article_ingest::{IngestError, Pipeline, RunState};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Collected = Arc<Mutex<Vec<(String, String)>>>;

/// Creates a test configuration with small pool sizes and short timeouts
fn create_test_config(db_path: &str) -> Config {
    Config {
        pipeline: PipelineConfig {
            queue_capacity: 2,
            worker_count: 4,
            fetch_timeout_ms: 500,
            connect_timeout_ms: 200,
            skip_empty_content: false,
        },
        extractor: ExtractorConfig::default(),
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

/// Builds a sink that records every article it receives
fn collecting_sink() -> (Arc<dyn article_ingest::ArticleSink>, Collected) {
    let collected: Collected = Arc::new(Mutex::new(Vec::new()));
    let store = collected.clone();
    let sink = move |title: &str, content: &str| -> Result<(), SinkError> {
        store
            .lock()
            .unwrap()
            .push((title.to_string(), content.to_string()));
        Ok(())
    };
    (Arc::new(sink), collected)
}

fn article_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            r#"<html><head><title>t</title></head><body>
            <div class="detail__body-text">{}</div>
            <div class="comments"><p>not part of the article</p></div>
            </body></html>"#,
            body
        ))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(article_page(body))
        .mount(server)
        .await;
}

/// Serves its bytes, then fails the way a dropped upload would
struct TruncatedUpload(Cursor<Vec<u8>>);

impl Read for TruncatedUpload {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.0.read(buf)? {
            0 => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "upload truncated",
            )),
            n => Ok(n),
        }
    }
}

fn sorted(collected: &Collected) -> Vec<(String, String)> {
    let mut items = collected.lock().unwrap().clone();
    items.sort();
    items
}

#[tokio::test]
async fn test_full_run_mixed_outcomes() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/one", "Lead <p>First paragraph.</p><p>Second.</p>").await;
    mount_page(&server, "/two", "<p>Only paragraph</p>").await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let csv = format!(
        "id,title,url\n\
         1,One,{base}/one\n\
         2,,{base}/two\n\
         3,Broken,{base}/broken\n\
         4,Two,{base}/two\n\
         5,NoUrl,\n\
         6,Gone,{base}/gone\n",
        base = base
    );

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let report = pipeline.run(csv.as_bytes()).await.unwrap();

    assert_eq!(report.final_state, RunState::Done);
    assert_eq!(report.rows_read, 6);
    assert_eq!(report.rows_skipped, 2);
    assert_eq!(report.jobs_enqueued, 4);
    assert_eq!(report.jobs_completed, 4);
    assert_eq!(report.persisted, 2);
    assert_eq!(report.fetch_failures, 2);
    assert!(!report.cancelled);

    assert_eq!(
        sorted(&collected),
        vec![
            ("One".to_string(), "Lead First paragraph.Second.".to_string()),
            ("Two".to_string(), "Only paragraph".to_string()),
        ]
    );

    let mut failed: Vec<_> = report
        .failures_at(FailureStage::Fetch)
        .map(|f| f.title.as_str())
        .collect();
    failed.sort();
    assert_eq!(failed, vec!["Broken", "Gone"]);
}

#[tokio::test]
async fn test_requests_carry_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(article_page("<p>identified</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let csv = format!("title,url\nA,{}/article\n", server.uri());
    let report = pipeline.run(csv.as_bytes()).await.unwrap();

    assert_eq!(report.persisted, 1);
    assert_eq!(sorted(&collected)[0].1, "identified");
}

#[tokio::test]
async fn test_missing_column_makes_no_requests() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "<p>a</p>").await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let csv = format!("name,url\nA,{}/a\n", server.uri());
    let result = pipeline.run(csv.as_bytes()).await;

    match result {
        Err(IngestError::MalformedInput(msg)) => assert!(msg.contains("title")),
        other => panic!("expected MalformedInput, got {:?}", other.map(|r| r.final_state)),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(collected.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_slow_page_times_out_without_blocking_others() {
    let server = MockServer::start().await;
    mount_page(&server, "/fast", "<p>fast</p>").await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(article_page("<p>slow</p>").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let csv = format!(
        "title,url\nSlow,{base}/slow\nFast,{base}/fast\n",
        base = server.uri()
    );
    let report = pipeline.run(csv.as_bytes()).await.unwrap();

    assert_eq!(report.persisted, 1);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.failures[0].title, "Slow");
    assert_eq!(sorted(&collected)[0].0, "Fast");
}

#[tokio::test]
async fn test_skip_empty_content() {
    let server = MockServer::start().await;
    mount_page(&server, "/empty", "").await;
    mount_page(&server, "/full", "<p>text</p>").await;

    let tmp = TempDir::new().unwrap();
    let mut config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    config.pipeline.skip_empty_content = true;
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let csv = format!(
        "title,url\nEmpty,{base}/empty\nFull,{base}/full\n",
        base = server.uri()
    );
    let report = pipeline.run(csv.as_bytes()).await.unwrap();

    assert_eq!(report.persisted, 1);
    assert_eq!(report.extract_failures, 1);
    assert_eq!(collected.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_content_persisted_by_default() {
    let server = MockServer::start().await;
    mount_page(&server, "/empty", "").await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let csv = format!("title,url\nEmpty,{}/empty\n", server.uri());
    let report = pipeline.run(csv.as_bytes()).await.unwrap();

    assert_eq!(report.persisted, 1);
    assert_eq!(
        sorted(&collected),
        vec![("Empty".to_string(), String::new())]
    );
}

#[tokio::test]
async fn test_storage_sink_records_run() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "<p>alpha</p>").await;
    mount_page(&server, "/b", "<p>beta</p>").await;

    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("articles.db");
    let config = create_test_config(db_path.to_str().unwrap());

    let storage = Arc::new(Mutex::new(open_storage(&db_path).unwrap()));
    let run_id = storage
        .lock()
        .unwrap()
        .create_run("hash", "articles.csv")
        .unwrap();

    let sink = StorageSink::new(storage.clone(), run_id);
    let pipeline = Pipeline::from_config(&config, Arc::new(sink)).unwrap();

    let csv = format!(
        "title,url\nA,{base}/a\nB,{base}/b\nC,{base}/missing\n",
        base = server.uri()
    );
    let report = pipeline.run(csv.as_bytes()).await.unwrap();

    {
        let mut storage = storage.lock().unwrap();
        storage
            .finish_run(run_id, RunStatus::Completed, &report.totals())
            .unwrap();
    }

    // Reopen from disk to check what was actually written
    drop(pipeline);
    let reopened = open_storage(&db_path).unwrap();
    assert_eq!(reopened.count_articles_for_run(run_id).unwrap(), 2);

    let run = reopened.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.finished_at.is_some());
    assert_eq!(run.totals.persisted, 2);
    assert_eq!(run.totals.failed, 1);
    assert_eq!(run.totals.jobs_enqueued, 3);
}

#[tokio::test]
async fn test_rerun_persists_same_count() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "<p>a</p>").await;
    mount_page(&server, "/b", "<p>b</p>").await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let csv = format!(
        "title,url\nA,{base}/a\nB,{base}/b\nC,{base}/nothing-here\n",
        base = server.uri()
    );

    let first = pipeline.run(csv.as_bytes()).await.unwrap();
    let first_items = sorted(&collected);
    collected.lock().unwrap().clear();
    let second = pipeline.run(csv.as_bytes()).await.unwrap();

    assert_eq!(first.persisted, second.persisted);
    assert_eq!(first_items, sorted(&collected));
}

#[tokio::test]
async fn test_cancelled_run_drains_enqueued_jobs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(article_page("<p>slowish</p>").set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let mut config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    config.pipeline.worker_count = 1;
    config.pipeline.queue_capacity = 1;
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let mut csv = String::from("title,url\n");
    for n in 0..100 {
        csv.push_str(&format!("T{},{}/article/{}\n", n, server.uri(), n));
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        trigger.cancel();
    });

    let report = pipeline
        .run_until_cancelled(csv.as_bytes(), cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.final_state, RunState::Done);
    assert!(report.jobs_enqueued < 100);
    assert!(report.is_drained());
    assert_eq!(
        collected.lock().unwrap().len() as u64,
        report.jobs_enqueued
    );
}

#[tokio::test]
async fn test_pipeline_from_config_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<article class="story">Intro <p>Body</p></article>"#),
        )
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("ingest.toml");
    std::fs::write(
        &config_path,
        r#"
[pipeline]
worker-count = 2
queue-capacity = 4

[extractor]
container-selector = "article.story"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
database-path = "./unused.db"
"#,
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();
    assert_eq!(pipeline.settings().worker_count, 2);

    let csv = format!("title,url\nStory,{}/story\n", server.uri());
    let report = pipeline.run(csv.as_bytes()).await.unwrap();

    assert_eq!(report.persisted, 1);
    assert_eq!(sorted(&collected)[0].1, "Intro Body");
}

#[tokio::test]
async fn test_non_utf8_title_is_ingested() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "<p>a</p>").await;
    mount_page(&server, "/cafe", "<p>menu</p>").await;
    mount_page(&server, "/d", "<p>d</p>").await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let mut csv = format!("title,url\nA,{}/a\n", server.uri()).into_bytes();
    csv.extend_from_slice(b"Caf\xe9,");
    csv.extend_from_slice(format!("{base}/cafe\nD,{base}/d\n", base = server.uri()).as_bytes());

    let report = pipeline.run(csv.as_slice()).await.unwrap();

    assert_eq!(report.final_state, RunState::Done);
    assert_eq!(report.persisted, 3);
    let titles: Vec<String> = sorted(&collected).into_iter().map(|(t, _)| t).collect();
    assert_eq!(titles, vec!["A", "Caf\u{FFFD}", "D"]);
}

#[tokio::test]
async fn test_field_count_mismatch_aborts_run() {
    let server = MockServer::start().await;
    mount_page(&server, "/b", "<p>b</p>").await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let csv = format!("title,url\nA\nB,{}/b\n", server.uri());
    let err = pipeline.run(csv.as_bytes()).await.unwrap_err();

    assert!(matches!(err.root_cause(), IngestError::InputRead { .. }));
    assert_eq!(err.partial_report().unwrap().final_state, RunState::Aborted);
    assert!(collected.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_url_column_uses_last() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "<p>from last column</p>").await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path().join("a.db").to_str().unwrap());
    let (sink, collected) = collecting_sink();
    let pipeline = Pipeline::from_config(&config, sink).unwrap();

    let csv = format!("title,url,url\nA,,{}/a\n", server.uri());
    let report = pipeline.run(csv.as_bytes()).await.unwrap();

    assert_eq!(report.rows_skipped, 0);
    assert_eq!(report.persisted, 1);
    assert_eq!(sorted(&collected)[0].1, "from last column");
}

#[tokio::test]
async fn test_aborted_run_keeps_report_for_run_record() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "<p>alpha</p>").await;
    mount_page(&server, "/b", "<p>beta</p>").await;

    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("articles.db");
    let config = create_test_config(db_path.to_str().unwrap());

    let storage = Arc::new(Mutex::new(open_storage(&db_path).unwrap()));
    let run_id = storage
        .lock()
        .unwrap()
        .create_run("hash", "upload.csv")
        .unwrap();
    let sink = StorageSink::new(storage.clone(), run_id);
    let pipeline = Pipeline::from_config(&config, Arc::new(sink)).unwrap();

    let csv = format!(
        "title,url\nA,{base}/a\nB,{base}/b\nC,{base}/missing\n",
        base = server.uri()
    );
    let err = pipeline
        .run(TruncatedUpload(Cursor::new(csv.into_bytes())))
        .await
        .unwrap_err();

    let report = err.partial_report().expect("report survives the abort");
    assert!(report.is_drained());
    assert_eq!(report.persisted, 2);
    assert_eq!(report.fetch_failures, 1);

    storage
        .lock()
        .unwrap()
        .finish_run(run_id, RunStatus::Aborted, &report.totals())
        .unwrap();

    let run = open_storage(&db_path).unwrap().get_run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Aborted);
    assert_eq!(run.totals.persisted, 2);
    assert_eq!(run.totals.failed, 1);
}
