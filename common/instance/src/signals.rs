//! Termination signals as shutdown triggers.

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::info;

use crate::shutdown::{ShutdownCoordinator, ShutdownTrigger};

/// Route SIGINT and SIGTERM to `coordinator`.
///
/// Handlers are installed before this returns, so a registration failure surfaces as a
/// startup error. Must be called from within a tokio runtime. The spawned task exits
/// after the first signal, or as soon as the coordinator is fulfilled by another source.
pub fn listen(coordinator: ShutdownCoordinator) -> io::Result<JoinHandle<()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        let trigger = tokio::select! {
            _ = interrupt.recv() => {
                info!("received SIGINT");
                ShutdownTrigger::Interrupt
            }
            _ = term.recv() => {
                info!("received SIGTERM");
                ShutdownTrigger::Terminate
            }
            _ = coordinator.wait() => return,
        };
        coordinator.trigger(trigger);
    }))
}
