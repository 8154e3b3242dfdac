//! Single-instance process guard backed by a PID file, and the shutdown barrier a
//! guarded service parks its main task on until a signal or an operator asks it to stop.

mod error;
pub mod guard;
pub mod liveness;
pub mod shutdown;
pub mod signals;

pub use error::GuardError;
pub use guard::{Acquired, InstanceGuard, UnverifiablePolicy};
pub use liveness::{Liveness, LivenessProbe, SignalProbe, Unverifiable};
pub use shutdown::{ShutdownCoordinator, ShutdownTrigger};
