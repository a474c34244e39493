//! Readiness poller tests. Cadence tests run on tokio's paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::Instant;

use super::{HttpProbe, PollerConfig, ReadinessPoller, ReadinessProbe, ReadinessStatus};

const CONFIG: PollerConfig = PollerConfig {
    interval: Duration::from_secs(10),
    probe_timeout: Duration::from_secs(5),
};

/// Counts probes; answers from the `respond_from`-th probe on.
#[derive(Default)]
struct ScriptedProbe {
    calls: AtomicUsize,
    respond_from: Option<usize>,
    delay: Option<Duration>,
}

impl ScriptedProbe {
    fn never() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn on_probe(n: usize) -> Arc<Self> {
        Arc::new(Self {
            respond_from: Some(n),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReadinessProbe for ScriptedProbe {
    async fn probe(&self, _address: &str) -> bool {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.respond_from.is_some_and(|from| n >= from)
    }
}

#[tokio::test(start_paused = true)]
async fn unreachable_address_stays_pending() {
    let probe = ScriptedProbe::never();
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);
    let mut rx = poller.subscribe();

    assert!(poller.watch("a1", "http://10.0.0.5:9000").await);
    assert_eq!(poller.status("a1").await, Some(ReadinessStatus::Pending));

    for _ in 0..3 {
        let update = rx.recv().await.unwrap();
        assert_eq!(update.assignment_id, "a1");
        assert_eq!(update.status, ReadinessStatus::Pending);
    }
    assert!(probe.calls() >= 3);
    assert_eq!(poller.status("a1").await, Some(ReadinessStatus::Pending));
}

#[tokio::test(start_paused = true)]
async fn first_probe_is_immediate_and_cadence_is_interval() {
    let probe = ScriptedProbe::never();
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);
    let mut rx = poller.subscribe();
    let start = Instant::now();

    poller.watch("a1", "http://10.0.0.5:9000").await;

    rx.recv().await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
    rx.recv().await.unwrap();
    let second = start.elapsed();
    assert!(second >= Duration::from_secs(10) && second < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn becomes_available_on_nth_probe_and_stays() {
    let probe = ScriptedProbe::on_probe(3);
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);
    let mut rx = poller.subscribe();

    poller.watch("a1", "http://10.0.0.5:9000").await;

    let mut seen = Vec::new();
    loop {
        let update = rx.recv().await.unwrap();
        seen.push(update.status);
        if update.status == ReadinessStatus::Available {
            break;
        }
    }
    assert_eq!(
        seen,
        vec![
            ReadinessStatus::Pending,
            ReadinessStatus::Pending,
            ReadinessStatus::Available
        ]
    );
    assert_eq!(probe.calls(), 3);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(poller.status("a1").await, Some(ReadinessStatus::Available));
    assert_eq!(probe.calls(), 3, "no probing after availability");
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn unwatch_stops_probing_and_updates() {
    let probe = ScriptedProbe::never();
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);
    let mut rx = poller.subscribe();

    poller.watch("a1", "http://10.0.0.5:9000").await;
    rx.recv().await.unwrap();

    assert!(poller.unwatch("a1").await);
    let calls_at_removal = probe.calls();

    tokio::time::sleep(Duration::from_secs(100)).await;

    assert!(probe.calls() <= calls_at_removal + 1);
    assert_eq!(poller.status("a1").await, None);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert!(!poller.unwatch("a1").await);
}

#[tokio::test(start_paused = true)]
async fn slow_probe_counts_as_pending() {
    let probe = Arc::new(ScriptedProbe {
        respond_from: Some(1),
        delay: Some(Duration::from_secs(60)),
        ..ScriptedProbe::default()
    });
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);
    let mut rx = poller.subscribe();
    let start = Instant::now();

    poller.watch("a1", "http://10.0.0.5:9000").await;

    let update = rx.recv().await.unwrap();
    assert_eq!(update.status, ReadinessStatus::Pending);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn watches_progress_independently() {
    struct ByAddress;
    impl ReadinessProbe for ByAddress {
        async fn probe(&self, address: &str) -> bool {
            if address.contains("slow") {
                std::future::pending::<()>().await;
            }
            true
        }
    }

    let poller = ReadinessPoller::new(Arc::new(ByAddress), CONFIG);
    let mut rx = poller.subscribe();

    poller.watch("slow", "http://slow:9000").await;
    poller.watch("fast", "http://fast:9000").await;

    let first = rx.recv().await.unwrap();
    assert_eq!(first.assignment_id, "fast");
    assert_eq!(first.status, ReadinessStatus::Available);

    let second = rx.recv().await.unwrap();
    assert_eq!(second.assignment_id, "slow");
    assert_eq!(second.status, ReadinessStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn empty_address_is_not_watched() {
    let probe = ScriptedProbe::never();
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);

    assert!(!poller.watch("a1", "  ").await);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(poller.status("a1").await, None);
    assert_eq!(probe.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn rewatching_same_address_is_a_no_op() {
    let probe = ScriptedProbe::never();
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);

    assert!(poller.watch("a1", "http://h:1").await);
    assert!(!poller.watch("a1", "http://h:1").await);
    assert!(poller.watch("a1", "http://h:2").await);
    assert_eq!(poller.watched().await, vec!["a1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn rewatch_racing_unwatch_keeps_status_for_watched_id() {
    let probe = ScriptedProbe::on_probe(1);
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);

    for round in 0..20 {
        poller.watch("a1", "http://h:1").await;
        let address = format!("http://h:{}", round + 2);
        tokio::join!(poller.unwatch("a1"), poller.watch("a1", &address));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let watched = poller.watched().await.contains(&"a1".to_string());
        let status = poller.status("a1").await;
        assert_eq!(watched, status.is_some(), "round {round}: {status:?}");
        poller.unwatch("a1").await;
    }
}

#[tokio::test(start_paused = true)]
async fn sync_adds_and_removes_watches() {
    let probe = ScriptedProbe::never();
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);

    poller
        .sync([
            ("a1".to_string(), "http://h:1".to_string()),
            ("a2".to_string(), "http://h:2".to_string()),
            ("a3".to_string(), String::new()),
        ])
        .await;
    let mut watched = poller.watched().await;
    watched.sort();
    assert_eq!(watched, vec!["a1", "a2"]);

    poller
        .sync([("a2".to_string(), "http://h:2".to_string())])
        .await;
    assert_eq!(poller.watched().await, vec!["a2"]);
    assert_eq!(poller.status("a1").await, None);
    assert!(poller.snapshot().await.contains_key("a2"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_every_watch() {
    let probe = ScriptedProbe::never();
    let poller = ReadinessPoller::new(Arc::clone(&probe), CONFIG);
    poller.watch("a1", "http://h:1").await;
    poller.watch("a2", "http://h:2").await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    poller.shutdown().await;
    let calls = probe.calls();
    tokio::time::sleep(Duration::from_secs(100)).await;

    assert_eq!(probe.calls(), calls);
    assert!(poller.watched().await.is_empty());
}

// =============================================================================
// HTTP probe
// =============================================================================

#[tokio::test]
async fn http_probe_treats_error_status_as_reachable() {
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::any;

    let app = Router::new().fallback(any(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let probe = HttpProbe::new(Duration::from_secs(5)).unwrap();
    assert!(probe.probe(&format!("http://{addr}/")).await);
}

#[tokio::test]
async fn http_probe_refused_connection_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let probe = HttpProbe::new(Duration::from_secs(5)).unwrap();
    assert!(!probe.probe(&format!("http://{addr}/")).await);
}

#[tokio::test]
async fn http_probe_invalid_address_is_unreachable() {
    let probe = HttpProbe::new(Duration::from_secs(5)).unwrap();
    assert!(!probe.probe("not a url").await);
}
