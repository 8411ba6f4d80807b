#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use clientvisor::{
    BackoffPolicy, Client, ClientError, Config, CreateFn, Creator, Handles, ProbeStatus, RetryPolicy,
};

/// Scriptable backend shared by every client it creates.
#[derive(Default)]
pub struct Backend {
    pub probe_ok: AtomicBool,
    /// Creation attempts left that fail with a retryable error.
    pub create_failures: AtomicUsize,
    /// Creation attempts left that fail with a fatal (aborting) error; checked first.
    pub fatal_failures: AtomicUsize,
    /// Creation attempts left that panic inside the creator; checked before the failures.
    pub create_panics: AtomicUsize,
    /// Probes left that panic inside `ping`.
    pub probe_panics: AtomicUsize,
    /// Hands out split api/probe clients instead of one shared client.
    pub split: AtomicBool,
    pub creates: AtomicUsize,
    pub calls: AtomicUsize,
    pub probes: AtomicUsize,
    closes: Mutex<Vec<usize>>,
    next_id: AtomicUsize,
}

impl Backend {
    pub fn up() -> Arc<Self> {
        let b = Self::default();
        b.probe_ok.store(true, Ordering::SeqCst);
        Arc::new(b)
    }

    pub fn down() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_up(&self, up: bool) {
        self.probe_ok.store(up, Ordering::SeqCst);
    }

    pub fn creator(self: &Arc<Self>) -> Arc<dyn Creator<Mock>> {
        let backend = Arc::clone(self);
        CreateFn::arc("mock", move |_ctx: CancellationToken| {
            let backend = Arc::clone(&backend);
            async move { backend.create() }
        })
    }

    fn create(self: &Arc<Self>) -> Result<Handles<Mock>, ClientError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.create_panics) {
            panic!("creator exploded");
        }
        if take_one(&self.fatal_failures) {
            return Err(ClientError::fatal("invalid configuration"));
        }
        if take_one(&self.create_failures) {
            return Err(ClientError::backend("connection refused"));
        }
        let api = Arc::new(self.client());
        if self.split.load(Ordering::SeqCst) {
            Ok(Handles::split(api, Arc::new(self.client())))
        } else {
            Ok(Handles::single(api))
        }
    }

    fn client(self: &Arc<Self>) -> Mock {
        Mock {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            backend: Arc::clone(self),
        }
    }

    /// How many times the client with `id` was closed.
    pub fn closes_of(&self, id: usize) -> usize {
        self.closes.lock().iter().filter(|&&c| c == id).count()
    }

    pub fn total_closes(&self) -> usize {
        self.closes.lock().len()
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Client handed out by [`Backend`].
pub struct Mock {
    pub id: usize,
    backend: Arc<Backend>,
}

impl Mock {
    /// A domain operation: one backend round-trip.
    pub async fn query(&self, fail: bool) -> Result<usize, ClientError> {
        self.backend.calls.fetch_add(1, Ordering::SeqCst);
        if fail {
            Err(ClientError::backend("transport reset"))
        } else {
            Ok(self.id)
        }
    }
}

#[async_trait]
impl Client for Mock {
    async fn ping(&self) -> Result<Option<ProbeStatus>, ClientError> {
        self.backend.probes.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.backend.probe_panics) {
            panic!("probe exploded");
        }
        if self.backend.probe_ok.load(Ordering::SeqCst) {
            Ok(Some(ProbeStatus::Ok))
        } else {
            Err(ClientError::backend("connection refused"))
        }
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.backend.closes.lock().push(self.id);
        Ok(())
    }
}

/// Defaults with fast, fixed backoff for both sequences.
pub fn fast_config() -> Config {
    let fixed = BackoffPolicy::fixed(Duration::from_millis(10));
    Config {
        creation: RetryPolicy::creation().with_backoff(fixed),
        reachability: RetryPolicy::reachability().with_backoff(fixed),
        ..Config::default()
    }
}
