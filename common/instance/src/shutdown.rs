//! Process-wide, single-fire shutdown barrier.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const METRIC_SHUTDOWN_TRIGGERED: &str = "sentinel_shutdown_triggered_total";

/// Source that asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Operator request over the admin HTTP endpoint.
    AdminRequest,
    /// The service runner stopped without being asked to.
    ServiceExited,
}

impl ShutdownTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownTrigger::Interrupt => "interrupt",
            ShutdownTrigger::Terminate => "terminate",
            ShutdownTrigger::AdminRequest => "admin_request",
            ShutdownTrigger::ServiceExited => "service_exited",
        }
    }
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Saturating completion token: pending until the first [`trigger`](ShutdownCoordinator::trigger),
/// fulfilled forever after. Clones share state, so the signal task, HTTP handlers and the
/// main task all hold the same coordinator. Not resettable.
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    token: CancellationToken,
    trigger: OnceLock<ShutdownTrigger>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fulfil the token. Safe to call concurrently from any number of sources; only the
    /// first call has an effect and returns true.
    pub fn trigger(&self, trigger: ShutdownTrigger) -> bool {
        if self.inner.trigger.set(trigger).is_err() {
            debug!(%trigger, "shutdown already triggered, ignoring");
            return false;
        }

        metrics::counter!(METRIC_SHUTDOWN_TRIGGERED, "trigger" => trigger.as_str()).increment(1);
        info!(%trigger, "shutdown triggered");
        self.inner.token.cancel();
        true
    }

    /// Park until fulfilled. Returns immediately if that already happened.
    pub async fn wait(&self) {
        self.inner.token.cancelled().await
    }

    /// Owned variant of [`wait`](ShutdownCoordinator::wait) for APIs that need a
    /// `'static` future, e.g. `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let token = self.inner.token.clone();
        async move {
            token.cancelled().await;
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.trigger.get().is_some()
    }

    /// The winning trigger, once fulfilled.
    pub fn trigger_reason(&self) -> Option<ShutdownTrigger> {
        self.inner.trigger.get().copied()
    }
}
