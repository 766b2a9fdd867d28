use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use svckit_registry::{ProbeError, ServiceDescriptor, ServicePool, spawn_health_monitor};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn service_at(id: i64, addr: SocketAddr) -> ServiceDescriptor {
    ServiceDescriptor::new(id, format!("svc-{id}"), addr.to_string())
        .with_version("v1")
        .with_routes(json!({"health": "/health"}))
}

async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[tokio::test]
async fn test_reachable_service_is_marked_online() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let pool = ServicePool::new();
    pool.add_service(service_at(1, listener.local_addr().unwrap()));

    let report = pool.health_check().await;

    assert_eq!(report.online_count(), 1);
    assert_eq!(pool.online_count(), 1);
    assert_eq!(pool.next_peer().unwrap().id(), 1);
}

#[tokio::test]
async fn test_closed_port_is_marked_offline() {
    let pool = ServicePool::new();
    pool.add_service(service_at(1, closed_port().await).with_online(true));

    let report = pool.health_check().await;

    assert_eq!(report.offline_ids(), vec![1]);
    assert!(matches!(
        report.outcomes[0].result,
        Err(ProbeError::Unreachable { .. })
    ));
    assert!(pool.next_peer().is_none());
}

#[tokio::test]
async fn test_one_failure_does_not_stop_other_probes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let pool = ServicePool::with_probe_timeout(Duration::from_secs(2));

    pool.add_service(
        ServiceDescriptor::new(1, "no-health", "127.0.0.1:1")
            .with_online(true)
            .with_routes(json!({"list": "/items"})),
    );
    pool.add_service(
        ServiceDescriptor::new(2, "bad-routes", "127.0.0.1:1")
            .with_online(true)
            .with_routes(json!("not json")),
    );
    pool.add_service(service_at(3, closed_port().await).with_online(true));
    pool.add_service(service_at(4, listener.local_addr().unwrap()));

    let report = pool.health_check().await;

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.offline_ids(), vec![1, 2, 3]);
    assert!(matches!(
        report.outcomes[0].result,
        Err(ProbeError::MissingHealthRoute)
    ));
    assert!(matches!(
        report.outcomes[1].result,
        Err(ProbeError::MalformedRoutes(_))
    ));
    for _ in 0..4 {
        assert_eq!(pool.next_peer().unwrap().id(), 4);
    }
}

#[tokio::test]
async fn test_empty_routes_are_offline_next_to_healthy_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let pool = ServicePool::new();
    pool.add_service(
        ServiceDescriptor::new(1, "no-routes", listener.local_addr().unwrap().to_string())
            .with_online(true)
            .with_routes(json!({})),
    );
    pool.add_service(service_at(2, listener.local_addr().unwrap()));

    let report = pool.health_check().await;

    assert_eq!(report.offline_ids(), vec![1]);
    assert!(matches!(
        report.outcomes[0].result,
        Err(ProbeError::MissingHealthRoute)
    ));
    assert!(report.outcomes[1].result.is_ok());
    assert_eq!(pool.next_peer().unwrap().id(), 2);
}

#[tokio::test]
async fn test_health_monitor_with_zero_interval_still_checks() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let pool = Arc::new(ServicePool::new());
    pool.add_service(service_at(1, listener.local_addr().unwrap()));

    let cancel = CancellationToken::new();
    let handle = spawn_health_monitor(Arc::clone(&pool), Duration::ZERO, cancel.clone());

    tokio::time::timeout(Duration::from_secs(5), async {
        while pool.online_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_health_monitor_runs_until_cancelled() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let pool = Arc::new(ServicePool::new());
    pool.add_service(service_at(1, listener.local_addr().unwrap()));

    let cancel = CancellationToken::new();
    let handle = spawn_health_monitor(
        Arc::clone(&pool),
        Duration::from_millis(20),
        cancel.clone(),
    );

    tokio::time::timeout(Duration::from_secs(5), async {
        while pool.online_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
