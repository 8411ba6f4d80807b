mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::mpsc::unbounded_channel;
use tokio::time::{self, Instant};

use clientvisor::{
    ClientError, Config, ConnectionState, EventKind, ListenerFn, RetryPolicy, SupervisorBuilder,
};
use common::{Backend, fast_config};

#[tokio::test(start_paused = true)]
async fn creator_fails_three_times_then_connects() {
    let backend = Backend::up();
    backend.create_failures.store(3, Ordering::SeqCst);
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();

    let (tx, mut rx) = unbounded_channel();
    let initially = sup.is_available_with(ListenerFn::arc("watch", move |available: bool| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(available);
        }
    }));
    assert!(!initially);

    assert!(sup.wait_available(Duration::from_secs(5)).await);
    assert!(sup.is_available());
    assert_eq!(backend.creates.load(Ordering::SeqCst), 4);

    time::sleep(Duration::from_millis(50)).await;
    let mut seen = Vec::new();
    while let Ok(available) = rx.try_recv() {
        seen.push(available);
    }
    assert_eq!(seen, vec![false, true]);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn failing_call_with_failing_probe_demotes_and_keeps_the_original_error() {
    let backend = Backend::up();
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();
    assert!(sup.wait_available(Duration::from_secs(1)).await);
    let proxy = sup.client();

    backend.set_up(false);
    let err = proxy.call(|c| async move { c.query(true).await }).await.unwrap_err();
    assert!(matches!(err, ClientError::Backend { .. }), "got {err:?}");
    assert_eq!(sup.state(), ConnectionState::Connecting);

    let calls = backend.calls.load(Ordering::SeqCst);
    let started = Instant::now();
    let err = proxy.call(|c| async move { c.query(false).await }).await.unwrap_err();
    assert!(err.is_unavailable());
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(backend.calls.load(Ordering::SeqCst), calls);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn failing_call_with_healthy_probe_stays_connected() {
    let backend = Backend::up();
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();
    assert!(sup.wait_available(Duration::from_secs(1)).await);

    let err = sup
        .client()
        .call(|c| async move { c.query(true).await })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Backend { .. }));
    assert_eq!(sup.state(), ConnectionState::Connected);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn background_recheck_demotes_without_delaying_the_caller() {
    let backend = Backend::up();
    let cfg = Config {
        sync_recheck: false,
        ..fast_config()
    };
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(cfg)
        .build();
    assert!(sup.wait_available(Duration::from_secs(1)).await);

    backend.set_up(false);
    let err = sup
        .client()
        .call(|c| async move { c.query(true).await })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Backend { .. }));

    time::sleep(Duration::from_millis(5)).await;
    assert_eq!(sup.state(), ConnectionState::Connecting);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn wait_available_times_out_on_schedule() {
    let backend = Backend::up();
    backend.create_failures.store(usize::MAX, Ordering::SeqCst);
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();

    let started = Instant::now();
    assert!(!sup.wait_available(Duration::from_millis(50)).await);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(50), "returned early: {waited:?}");
    assert!(waited < Duration::from_millis(60), "returned late: {waited:?}");
    assert_eq!(sup.state(), ConnectionState::Creating);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn calls_fail_fast_until_connected() {
    let backend = Backend::down();
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();
    let proxy = sup.client();

    for _ in 0..5 {
        let err = proxy.call(|c| async move { c.query(false).await }).await.unwrap_err();
        assert!(err.is_unavailable());
        time::sleep(Duration::from_millis(7)).await;
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert_eq!(sup.state(), ConnectionState::Connecting);

    backend.set_up(true);
    assert!(sup.wait_available(Duration::from_secs(1)).await);
    assert!(proxy.call(|c| async move { c.query(false).await }).await.is_ok());
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn unavailable_error_carries_the_latest_cause() {
    let backend = Backend::down();
    backend.create_failures.store(usize::MAX, Ordering::SeqCst);
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();
    time::sleep(Duration::from_millis(25)).await;

    let err = sup
        .client()
        .call(|c| async move { c.query(false).await })
        .await
        .unwrap_err();
    match err {
        ClientError::Unavailable { name, cause } => {
            assert_eq!(&*name, "products");
            assert!(matches!(cause.as_ref(), ClientError::Backend { .. }));
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
    sup.close().await;

    let err = sup.client().call(|c| async move { c.query(false).await }).await.unwrap_err();
    assert!(matches!(err.root(), ClientError::Closed));
}

#[tokio::test(start_paused = true)]
async fn flapping_probe_never_double_closes() {
    let backend = Backend::up();
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();
    let proxy = sup.client();

    for _ in 0..3 {
        assert!(sup.wait_available(Duration::from_secs(1)).await);
        backend.set_up(false);
        let _ = proxy.call(|c| async move { c.query(true).await }).await;
        assert_eq!(sup.state(), ConnectionState::Connecting);
        backend.set_up(true);
    }
    assert!(sup.wait_available(Duration::from_secs(1)).await);
    assert_eq!(backend.creates.load(Ordering::SeqCst), 1);

    sup.close().await;
    sup.close().await;
    assert_eq!(backend.closes_of(1), 1);
    assert_eq!(backend.total_closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_reachability_recreates_and_retires_old_handles() {
    let backend = Backend::down();
    backend.split.store(true, Ordering::SeqCst);
    let cfg = Config {
        reachability: fast_config().reachability.with_max_attempts(3),
        ..fast_config()
    };
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(cfg)
        .build();
    let mut events = sup.subscribe();

    // First client pair (ids 1 and 2) never answers.
    time::sleep(Duration::from_millis(35)).await;
    assert!(backend.creates.load(Ordering::SeqCst) >= 2);
    assert_eq!(backend.closes_of(1), 1);
    assert_eq!(backend.closes_of(2), 1);

    backend.set_up(true);
    assert!(sup.wait_available(Duration::from_secs(1)).await);
    let id = sup
        .client()
        .call(|c| async move { c.query(false).await })
        .await
        .unwrap();
    assert!(id > 2);

    let mut recreated = false;
    while let Ok(ev) = events.try_recv() {
        recreated |= ev.kind == EventKind::Recreating;
    }
    assert!(recreated);

    sup.close().await;
    for id in 1..=backend.creates.load(Ordering::SeqCst) * 2 {
        assert!(backend.closes_of(id) <= 1, "client {id} closed twice");
    }
}

#[tokio::test(start_paused = true)]
async fn fatal_creation_errors_rearm_instead_of_getting_stuck() {
    let backend = Backend::up();
    backend.fatal_failures.store(2, Ordering::SeqCst);
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();
    let mut events = sup.subscribe();

    assert!(sup.wait_available(Duration::from_secs(5)).await);
    assert_eq!(backend.creates.load(Ordering::SeqCst), 3);

    let mut rearms = 0;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::RetryRearmed {
            rearms += 1;
        }
    }
    assert_eq!(rearms, 2);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn bounded_creation_rearms_after_exhaustion() {
    let backend = Backend::up();
    backend.create_failures.store(5, Ordering::SeqCst);
    let cfg = Config {
        creation: RetryPolicy::creation()
            .with_backoff(clientvisor::BackoffPolicy::fixed(Duration::from_millis(10)))
            .with_max_attempts(2),
        ..fast_config()
    };
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(cfg)
        .build();

    assert!(sup.wait_available(Duration::from_secs(5)).await);
    assert_eq!(backend.creates.load(Ordering::SeqCst), 6);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn proxy_routes_to_the_current_client() {
    let backend = Backend::down();
    let cfg = Config {
        reachability: fast_config().reachability.with_max_attempts(2),
        ..fast_config()
    };
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(cfg)
        .build();
    // Obtained before any client exists.
    let proxy = sup.client();

    time::sleep(Duration::from_millis(25)).await;
    backend.set_up(true);
    assert!(sup.wait_available(Duration::from_secs(1)).await);

    let id = proxy.call(|c| async move { c.query(false).await }).await.unwrap();
    assert_eq!(id, backend.creates.load(Ordering::SeqCst));
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn panicking_creator_is_retried() {
    let backend = Backend::up();
    backend.create_panics.store(1, Ordering::SeqCst);
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();
    let mut events = sup.subscribe();

    assert!(sup.wait_available(Duration::from_secs(5)).await);
    assert_eq!(backend.creates.load(Ordering::SeqCst), 2);

    let mut rearmed = false;
    while let Ok(ev) = events.try_recv() {
        rearmed |= ev.kind == EventKind::RetryRearmed
            && ev.reason.as_deref().is_some_and(|r| r.contains("creator exploded"));
    }
    assert!(rearmed);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn panicking_reachability_check_is_retried() {
    let backend = Backend::up();
    backend.probe_panics.store(1, Ordering::SeqCst);
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();

    assert!(sup.wait_available(Duration::from_secs(5)).await);
    assert_eq!(backend.creates.load(Ordering::SeqCst), 1);
    assert!(backend.probes.load(Ordering::SeqCst) >= 2);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn panicking_recheck_demotes_and_recovers() {
    let backend = Backend::up();
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();
    assert!(sup.wait_available(Duration::from_secs(1)).await);

    backend.probe_panics.store(1, Ordering::SeqCst);
    let err = sup
        .client()
        .call(|c| async move { c.query(true).await })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Backend { .. }));
    assert_eq!(sup.state(), ConnectionState::Connecting);
    assert!(matches!(sup.cause().unwrap().as_ref(), ClientError::Fatal { .. }));

    assert!(sup.wait_available(Duration::from_secs(1)).await);
    sup.close().await;
}

#[tokio::test(start_paused = true)]
async fn dropping_the_supervisor_closes_its_client() {
    let backend = Backend::up();
    let sup = SupervisorBuilder::new("products", backend.creator())
        .with_config(fast_config())
        .build();
    assert!(sup.wait_available(Duration::from_secs(1)).await);
    let (tx, mut rx) = unbounded_channel();
    sup.is_available_with(ListenerFn::arc("watch", move |available: bool| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(available);
        }
    }));

    drop(sup);
    time::sleep(Duration::from_millis(1)).await;
    assert_eq!(backend.closes_of(1), 1);
    assert_eq!(backend.total_closes(), 1);

    let mut seen = Vec::new();
    while let Some(available) = rx.recv().await {
        seen.push(available);
    }
    assert_eq!(seen, vec![true, false]);
}
