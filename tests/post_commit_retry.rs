//! End-to-end scenario 4: a secondary that returns a simulated 5xx after
//! committing must not cause a duplicate or reordering once the master
//! retries the same delivery.

mod common;

use std::time::Duration;

use replog::message::Message;
use replog::net::ReplicateRequest;

#[tokio::test]
async fn retry_after_post_commit_failure_is_recognised_as_duplicate() {
    // error_rate = 1.0 deterministically forces the post-commit 5xx.
    let secondary = common::spawn_secondary(Duration::ZERO, 1.0).await;
    let client = reqwest::Client::new();

    let m = Message::new(1, "m1".to_string(), "t".to_string());
    let body = ReplicateRequest::from(&m);

    let first = client
        .post(format!("{}/replicate", secondary.url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(secondary.receiver.log().await.len(), 1, "the insert happens before the injected failure");

    let retry = client
        .post(format!("{}/replicate", secondary.url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(retry.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = retry.json().await.unwrap();
    assert_eq!(body["status"], "duplicate");

    assert_eq!(
        secondary.receiver.log().await.len(),
        1,
        "retry must not produce a duplicate commit"
    );
}
