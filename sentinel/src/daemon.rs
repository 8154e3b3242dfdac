//! Startup and shutdown sequencing around the instance guard.
//!
//! 1. claim the guard file, or bail out if a live instance holds it
//! 2. route SIGINT/SIGTERM to the shutdown coordinator
//! 3. start the HTTP server in the background
//! 4. park on the coordinator
//! 5. let the server drain, release the guard file, report how to exit

use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;

use instance::{
    signals, Acquired, GuardError, InstanceGuard, LivenessProbe, ShutdownCoordinator,
    ShutdownTrigger, SignalProbe,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::metrics::setup_metrics_recorder;
use crate::{exit_codes, router, server};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error("failed to register signal handlers")]
    Signals(#[source] io::Error),
    #[error("failed to bind {addr}")]
    Bind { addr: SocketAddr, source: io::Error },
}

/// How the process should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Clean,
    AlreadyRunning(u32),
    StartupFailure,
    /// The HTTP server stopped without being asked to.
    ServiceFailure,
}

impl ExitStatus {
    pub fn code(&self) -> u8 {
        match self {
            ExitStatus::Clean => exit_codes::SUCCESS,
            ExitStatus::AlreadyRunning(_) => exit_codes::ALREADY_RUNNING,
            ExitStatus::StartupFailure | ExitStatus::ServiceFailure => exit_codes::FAILURE,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Owns the guard and the coordinator for the lifetime of the process.
pub struct Daemon<P> {
    guard: InstanceGuard<P>,
    shutdown: ShutdownCoordinator,
}

impl Daemon<SignalProbe> {
    pub fn from_config(config: &Config) -> Self {
        let guard = InstanceGuard::new(config.pid_file.clone(), SignalProbe)
            .with_policy(config.unverifiable_policy());
        Self::new(guard)
    }
}

impl<P: LivenessProbe> Daemon<P> {
    pub fn new(guard: InstanceGuard<P>) -> Self {
        Self {
            guard,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    pub fn guard(&self) -> &InstanceGuard<P> {
        &self.guard
    }

    /// Handle to request shutdown from outside the daemon.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    pub async fn run(self, config: Config) -> ExitStatus {
        let status = match self.guard.acquire() {
            Ok(Acquired::Claimed) => match self.serve_until_shutdown(&config).await {
                Ok(ShutdownTrigger::ServiceExited) => ExitStatus::ServiceFailure,
                Ok(_) => ExitStatus::Clean,
                Err(e) => {
                    report(e);
                    ExitStatus::StartupFailure
                }
            },
            Ok(Acquired::AlreadyRunning(pid)) => {
                eprintln!("A process is already running with pid {pid}: exiting");
                return ExitStatus::AlreadyRunning(pid);
            }
            Err(e) => {
                report(e.into());
                return ExitStatus::StartupFailure;
            }
        };

        self.guard.release();
        info!(code = status.code(), "exiting");
        status
    }

    async fn serve_until_shutdown(&self, config: &Config) -> Result<ShutdownTrigger, StartupError> {
        let _signals = signals::listen(self.shutdown.clone()).map_err(StartupError::Signals)?;

        let listener = TcpListener::bind(config.address)
            .await
            .map_err(|source| StartupError::Bind {
                addr: config.address,
                source,
            })?;

        let recorder_handle = if *config.export_prometheus {
            match setup_metrics_recorder() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "failed to install metrics recorder, /metrics disabled");
                    None
                }
            }
        } else {
            None
        };
        let app = router::router(self.shutdown.clone(), &config.static_dir, recorder_handle);

        let coordinator = self.shutdown.clone();
        let mut runner = tokio::spawn(async move {
            if let Err(e) = server::serve(app, listener, coordinator.shutdown_signal()).await {
                error!(error = %e, "http server failed");
            }
            coordinator.trigger(ShutdownTrigger::ServiceExited);
        });
        info!("HTTP server started");

        self.shutdown.wait().await;
        let trigger = self
            .shutdown
            .trigger_reason()
            .unwrap_or(ShutdownTrigger::ServiceExited);
        info!(%trigger, "shutting down");

        match tokio::time::timeout(config.shutdown_timeout(), &mut runner).await {
            Ok(Ok(())) => debug!("http server stopped"),
            Ok(Err(e)) => warn!(error = %e, "http server task failed"),
            Err(_) => {
                warn!(
                    timeout_secs = config.shutdown_timeout_secs,
                    "http server did not stop in time, aborting"
                );
                runner.abort();
            }
        }

        Ok(trigger)
    }
}

fn report(e: StartupError) {
    let e = anyhow::Error::from(e);
    error!("startup failed: {:#}", e);
    eprintln!("startup failed: {:#}", e);
}
