//! End-to-end test of `ScanSession` over HTTP against a mock backend.
//!
//! Uses a real clock with a short polling period.

use std::time::Duration;

use codexaudit_client::api::HttpJobsApi;
use codexaudit_client::config::ClientConfig;
use codexaudit_client::events::SessionEvent;
use codexaudit_client::session::{ScanSession, SubmitOutcome};
use codexaudit_core::scan::JobHandle;
use codexaudit_core::session::MonitorPhase;

const PERIOD: Duration = Duration::from_millis(50);

#[tokio::test]
async fn scan_runs_to_completion_over_http() {
    let mut server = mockito::Server::new_async().await;
    let start = server
        .mock("POST", "/start-job")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"job_id":"abc123"}"#)
        .expect(1)
        .create_async()
        .await;
    let status = server
        .mock("GET", "/job-status/abc123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"done","result":{"total_issues":4,"pdf_filename":"abc123.pdf"}}"#)
        .expect(1)
        .create_async()
        .await;

    let config = ClientConfig::from_api_url(&format!("{}/", server.url())).unwrap();
    let session = ScanSession::with_poll_interval(HttpJobsApi::new(config.api_url), PERIOD);
    let mut events = session.subscribe();

    let outcome = session.start_scan("github.com/x/y").await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Started(JobHandle::new("abc123")));

    let completed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event @ SessionEvent::JobCompleted { .. }) => break event,
                Ok(_) => continue,
                Err(e) => panic!("event stream closed: {e}"),
            }
        }
    })
    .await
    .expect("scan did not complete");

    match completed {
        SessionEvent::JobCompleted { result, report_url, .. } => {
            assert_eq!(result.total_issues, 4);
            assert_eq!(
                report_url,
                format!("{}/download-report/abc123.pdf", server.url())
            );
        }
        other => panic!("unexpected event {other:?}"),
    }

    // A few more periods must not trigger another fetch.
    tokio::time::sleep(PERIOD * 4).await;
    assert_eq!(session.phase(), MonitorPhase::Terminal);
    start.assert_async().await;
    status.assert_async().await;
}

#[tokio::test]
async fn status_endpoint_error_stops_polling() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/start-job")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"job_id":"abc123"}"#)
        .create_async()
        .await;
    let status = server
        .mock("GET", "/job-status/abc123")
        .with_status(500)
        .with_body("boom")
        .expect(1)
        .create_async()
        .await;

    let session = ScanSession::with_poll_interval(HttpJobsApi::new(server.url()), PERIOD);
    let mut events = session.subscribe();
    session.start_scan("github.com/x/y").await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(SessionEvent::PollingFailed { .. }) = events.recv().await {
                break;
            }
        }
    })
    .await
    .expect("polling did not fail");

    tokio::time::sleep(PERIOD * 4).await;
    assert_eq!(session.phase(), MonitorPhase::Terminal);
    assert_eq!(session.state().active_job, Some(JobHandle::new("abc123")));
    status.assert_async().await;
}
