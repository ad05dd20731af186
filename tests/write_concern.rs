//! End-to-end scenario 1 from the spec: three replicas, mixed write
//! concerns, a slow secondary, and the prefix property holding eventually.

mod common;

use std::time::Duration;

use serde_json::json;

#[tokio::test]
async fn mixed_write_concerns_return_at_the_right_time() {
    let fast_secondary = common::spawn_secondary(Duration::ZERO, 0.0).await;
    let slow_secondary = common::spawn_secondary(Duration::from_millis(600), 0.0).await;

    let master = common::spawn_master(vec![fast_secondary.url.clone(), slow_secondary.url.clone()])
        .await;

    let client = reqwest::Client::new();

    let append = |message: &'static str, w: usize| {
        let client = client.clone();
        let url = master.url.clone();
        async move {
            let start = tokio::time::Instant::now();
            let resp = client
                .post(format!("{url}/messages"))
                .json(&json!({ "message": message, "w": w }))
                .send()
                .await
                .unwrap();
            (resp.status(), start.elapsed())
        }
    };

    let (status1, elapsed1) = append("msg1", 1).await;
    assert_eq!(status1, reqwest::StatusCode::CREATED);
    assert!(elapsed1 < Duration::from_millis(500));

    let (status2, elapsed2) = append("msg2", 2).await;
    assert_eq!(status2, reqwest::StatusCode::CREATED);
    assert!(elapsed2 < Duration::from_millis(500), "w=2 only needs the fast secondary");

    let (status3, elapsed3) = append("msg3", 3).await;
    assert_eq!(status3, reqwest::StatusCode::CREATED);
    assert!(
        elapsed3 >= Duration::from_millis(500),
        "w=3 must wait for the slow secondary: took {elapsed3:?}"
    );

    let (status4, elapsed4) = append("msg4", 1).await;
    assert_eq!(status4, reqwest::StatusCode::CREATED);
    assert!(elapsed4 < Duration::from_millis(500));

    // Eventually every node's log converges to the same four messages in order.
    common::wait_until(
        || async {
            let log = slow_secondary.receiver.log().await;
            log.len() == 4
        },
        Duration::from_secs(5),
    )
    .await;

    let master_log = master.coordinator.get_log().await;
    let fast_log = fast_secondary.receiver.log().await;
    let slow_log = slow_secondary.receiver.log().await;

    let ids = |v: &[replog::message::MessageView]| v.iter().map(|m| m.id).collect::<Vec<_>>();
    assert_eq!(ids(&master_log), vec![1, 2, 3, 4]);
    assert_eq!(ids(&fast_log), vec![1, 2, 3, 4]);
    assert_eq!(ids(&slow_log), vec![1, 2, 3, 4]);
}
