use std::{collections::HashSet, sync::Arc, time::Duration};

use serde_json::Value;
use tracking_loadgen::{
    AppMetrics, EventJobRunner, EventKind, EventSender, IdentityGenerator, Tally, WorkerPool,
};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn tracking_api(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/track"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

async fn run_against(server: &MockServer, kind: EventKind, jobs: u64, workers: usize) -> Tally {
    let sender = EventSender::new(format!("{}/v1/track", server.uri()), "wk_integration").unwrap();
    let runner = Arc::new(
        EventJobRunner::new(sender, kind).with_generator(IdentityGenerator::new("it_", "example.test")),
    );

    WorkerPool::new(workers)
        .with_throttle(Duration::ZERO)
        .run(jobs, move |job| {
            let runner = runner.clone();
            async move { runner.run(job).await }
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn five_identifies_over_two_workers() {
    let server = tracking_api(200).await;

    let tally = run_against(&server, EventKind::Identify, 5, 2).await;
    assert_eq!(tally, Tally { successes: 5, failures: 0 });

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);

    let user_ids: HashSet<String> = requests
        .iter()
        .map(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            assert_eq!(body["type"], "identify");
            body["userId"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(user_ids.len(), 5);
    assert!(user_ids.iter().all(|id| id.starts_with("it_")));
}

#[tokio::test]
async fn track_profiles_use_configured_email_domain() {
    let server = tracking_api(200).await;

    let tally = run_against(&server, EventKind::Track, 3, 3).await;
    assert_eq!(tally.successes, 3);

    for request in server.received_requests().await.unwrap() {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let user_id = body["userId"].as_str().unwrap();
        assert_eq!(
            body["context"]["traits"]["email"],
            format!("{}@example.test", user_id)
        );
    }
}

#[tokio::test]
async fn rejected_requests_are_counted_as_failures() {
    let server = tracking_api(503).await;

    let tally = run_against(&server, EventKind::Identify, 12, 4).await;
    assert_eq!(tally, Tally { successes: 0, failures: 12 });
}

#[tokio::test]
async fn metrics_track_every_request() {
    let server = tracking_api(200).await;
    let metrics = Arc::new(AppMetrics::new().unwrap());

    let sender = EventSender::new(format!("{}/v1/track", server.uri()), "wk_integration").unwrap();
    let runner = Arc::new(EventJobRunner::new(sender, EventKind::Identify).with_metrics(metrics.clone()));

    let tally = WorkerPool::new(3)
        .with_throttle(Duration::ZERO)
        .with_metrics(metrics.clone())
        .run(9, move |job| {
            let runner = runner.clone();
            async move { runner.run(job).await }
        })
        .await
        .unwrap();

    assert_eq!(tally.successes, 9);
    assert_eq!(metrics.request_duration.get_sample_count(), 9);
    assert_eq!(metrics.events_total.with_label_values(&["success"]).get(), 9);
}
