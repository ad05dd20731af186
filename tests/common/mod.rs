use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use replog::config::{HeartbeatConfig, MasterConfig, RetryConfig, SecondaryConfig};
use replog::master::Coordinator;
use replog::secondary::Receiver;

/// Fast retry/heartbeat tuning so integration tests don't wait on
/// production-sized backoffs.
pub fn test_retry() -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
    }
}

pub fn test_heartbeat() -> HeartbeatConfig {
    HeartbeatConfig {
        interval: Duration::from_millis(50),
        timeout: Duration::from_millis(200),
        unhealthy_threshold: 3,
    }
}

pub struct RunningMaster {
    pub url: String,
    pub coordinator: Arc<Coordinator>,
}

pub async fn spawn_master(secondaries: Vec<String>) -> RunningMaster {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = MasterConfig {
        secondaries,
        bind_addr: addr,
        retry: test_retry(),
        heartbeat: test_heartbeat(),
        write_concern_timeout: Duration::from_secs(5),
        secondary_request_timeout: Duration::from_secs(2),
    };

    let coordinator = Coordinator::new(config);
    coordinator.register_configured_secondaries().await;

    let app = replog::master::server::router(coordinator.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    RunningMaster {
        url: format!("http://{addr}"),
        coordinator,
    }
}

pub struct RunningSecondary {
    pub url: String,
    pub receiver: Arc<Receiver>,
}

pub async fn spawn_secondary(replication_delay: Duration, error_rate: f64) -> RunningSecondary {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    let config = SecondaryConfig {
        master_url: None,
        server_id: format!("secondary-{addr}"),
        bind_addr: addr,
        replication_delay,
        error_rate,
    };

    let receiver = Arc::new(Receiver::new(config));
    let app = replog::secondary::server::router(receiver.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    RunningSecondary {
        url: format!("http://{addr}"),
        receiver,
    }
}

pub async fn wait_until<F, Fut>(mut predicate: F, timeout: Duration)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
