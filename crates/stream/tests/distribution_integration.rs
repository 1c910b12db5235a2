//! Integration tests for point cloud fan-out under concurrent use
//!
//! Simulates live connections subscribing, consuming and leaving while a
//! publisher keeps loading new clouds.

use missionctl_stream::{PointCloudService, StreamError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribers_receive_every_load() {
    let service = Arc::new(PointCloudService::new(64));
    let loads = 20usize;
    let consumers = 8;

    let mut subscriptions = Vec::new();
    for _ in 0..consumers {
        subscriptions.push(service.subscribe().await);
    }

    let handles: Vec<_> = subscriptions
        .into_iter()
        .map(|mut sub| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let mut counts = Vec::new();
                while counts.len() < loads {
                    match timeout(Duration::from_secs(5), sub.recv()).await {
                        Ok(Some(snapshot)) => counts.push(snapshot.point_count),
                        _ => break,
                    }
                }
                service.unsubscribe(sub.id()).await;
                counts
            })
        })
        .collect();

    for points in 1..=loads {
        service
            .load_point_cloud(vec![1.0; points * 3], None)
            .await
            .unwrap();
    }

    for handle in handles {
        let counts = handle.await.unwrap();
        let expected: Vec<usize> = (1..=loads).collect();
        assert_eq!(counts, expected);
    }

    assert_eq!(service.subscriber_count().await, 0);
    let metrics = service.metrics().await;
    assert_eq!(metrics.snapshots_loaded_total, loads as u64);
    assert_eq!(metrics.updates_delivered_total, (loads * consumers) as u64);
    assert_eq!(metrics.updates_dropped_total, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_churning_subscribers_do_not_block_publisher() {
    let service = Arc::new(PointCloudService::new(2));

    let churn = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for _ in 0..200 {
                let sub = service.subscribe().await;
                tokio::task::yield_now().await;
                service.unsubscribe(sub.id()).await;
            }
        })
    };

    // Nobody drains this one; its queue fills and later updates are dropped
    let _idle = service.subscribe().await;

    for _ in 0..50 {
        timeout(
            Duration::from_secs(1),
            service.load_point_cloud(vec![0.0; 9], None),
        )
        .await
        .expect("publisher must not block on subscribers")
        .unwrap();
    }

    churn.await.unwrap();

    assert_eq!(service.subscriber_count().await, 1);
    let metrics = service.metrics().await;
    assert_eq!(metrics.snapshots_loaded_total, 50);
    assert!(metrics.updates_dropped_total >= 48);
}

#[tokio::test]
async fn test_rejected_load_reports_validation_error() {
    let service = PointCloudService::default();
    let mut sub = service.subscribe().await;

    let err = service
        .load_point_cloud(vec![0.0; 6], Some(vec![0.0; 5]))
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::ColorMismatch { .. }));

    assert!(service.current_point_cloud().await.is_none());
    assert!(sub.try_recv().is_none());
}
