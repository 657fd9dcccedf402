use super::*;
use crate::testing::{closed_host, spawn_readyz, spawn_readyz_with_delay};
use std::time::Instant;

#[test]
fn test_classify_status_boundaries() {
    assert_eq!(classify_status(StatusCode::OK), ProbeOutcome::Ready);
    assert_eq!(classify_status(StatusCode::NO_CONTENT), ProbeOutcome::Ready);
    assert_eq!(
        classify_status(StatusCode::from_u16(299).unwrap()),
        ProbeOutcome::Ready
    );
    assert_eq!(
        classify_status(StatusCode::MULTIPLE_CHOICES),
        ProbeOutcome::NotReady
    );
    assert_eq!(classify_status(StatusCode::NOT_FOUND), ProbeOutcome::NotReady);
    assert_eq!(
        classify_status(StatusCode::INTERNAL_SERVER_ERROR),
        ProbeOutcome::NotReady
    );
    assert_eq!(
        classify_status(StatusCode::SERVICE_UNAVAILABLE),
        ProbeOutcome::NotReady
    );
}

#[test]
fn test_outcome_values() {
    assert_eq!(ProbeOutcome::Ready.value(), 1.0);
    assert_eq!(ProbeOutcome::NotReady.value(), 0.0);
}

#[tokio::test]
async fn test_probe_healthy_host_is_ready() {
    let host = spawn_readyz(StatusCode::OK).await;
    let prober = Prober::new(Duration::from_secs(2)).expect("build prober");

    assert_eq!(prober.probe(&host).await, ProbeOutcome::Ready);
}

#[tokio::test]
async fn test_probe_error_statuses_are_not_ready() {
    let prober = Prober::new(Duration::from_secs(2)).expect("build prober");

    for status in [StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
        let host = spawn_readyz(status).await;
        assert_eq!(
            prober.probe(&host).await,
            ProbeOutcome::NotReady,
            "status {} should be not ready",
            status
        );
    }
}

#[tokio::test]
async fn test_probe_refused_connection_is_not_ready() {
    let host = closed_host().await;
    let prober = Prober::new(Duration::from_secs(2)).expect("build prober");

    assert_eq!(prober.probe(&host).await, ProbeOutcome::NotReady);
}

#[tokio::test]
async fn test_probe_timeout_is_not_ready() {
    // ARRANGE: endpoint answers 200 but far too late
    let host = spawn_readyz_with_delay(StatusCode::OK, Duration::from_secs(5)).await;
    let prober = Prober::new(Duration::from_millis(200)).expect("build prober");

    // ACT
    let start = Instant::now();
    let outcome = prober.probe(&host).await;

    // ASSERT: bounded by the probe timeout, not the slow handler
    assert_eq!(outcome, ProbeOutcome::NotReady);
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_probe_all_keeps_one_observation_per_host_in_order() {
    // ARRANGE: healthy, unreachable, failing, healthy duplicate
    let healthy = spawn_readyz(StatusCode::OK).await;
    let failing = spawn_readyz(StatusCode::INTERNAL_SERVER_ERROR).await;
    let unreachable = closed_host().await;
    let hosts = vec![
        RoutableHost::new("ns", "a", &healthy),
        RoutableHost::new("ns", "b", &unreachable),
        RoutableHost::new("ns", "c", &failing),
        RoutableHost::new("ns", "a", &healthy),
    ];
    let prober = Prober::new(Duration::from_secs(2)).expect("build prober");

    for concurrency in [1, 4] {
        // ACT
        let observations = prober.probe_all(hosts.clone(), concurrency).await;

        // ASSERT
        let got: Vec<(RoutableHost, f64)> = observations
            .into_iter()
            .map(|o| {
                let value = o.value();
                (o.host, value)
            })
            .collect();
        assert_eq!(
            got,
            vec![
                (hosts[0].clone(), 1.0),
                (hosts[1].clone(), 0.0),
                (hosts[2].clone(), 0.0),
                (hosts[3].clone(), 1.0),
            ],
            "concurrency {}",
            concurrency
        );
    }
}

#[tokio::test]
async fn test_probe_all_runs_probes_concurrently() {
    // Four probes of 300ms each finish well under 4 x 300ms with concurrency 4
    let host = spawn_readyz_with_delay(StatusCode::OK, Duration::from_millis(300)).await;
    let hosts: Vec<RoutableHost> = (0..4)
        .map(|i| RoutableHost::new("ns", format!("svc{}", i), &host))
        .collect();
    let prober = Prober::new(Duration::from_secs(2)).expect("build prober");

    let start = Instant::now();
    let observations = prober.probe_all(hosts, 4).await;

    assert_eq!(observations.len(), 4);
    assert!(observations.iter().all(|o| o.outcome == ProbeOutcome::Ready));
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn test_probe_all_empty_input() {
    let prober = Prober::new(Duration::from_secs(1)).expect("build prober");

    assert!(prober.probe_all(Vec::new(), 8).await.is_empty());
}
