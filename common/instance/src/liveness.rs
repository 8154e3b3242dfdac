//! Existence probe for arbitrary process identifiers.

use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Outcome of a single liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    NotRunning,
    /// The probe could not decide. Never means "safe to proceed" on its own.
    Unknown(Unverifiable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unverifiable {
    /// The identifier cannot name a process on this host.
    Unaddressable,
    /// The process exists but runs under privileges we cannot signal.
    Denied,
    Other(Errno),
}

impl fmt::Display for Unverifiable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unverifiable::Unaddressable => write!(f, "identifier is not addressable on this host"),
            Unverifiable::Denied => write!(f, "process exists but is not accessible"),
            Unverifiable::Other(errno) => write!(f, "probe failed: {errno}"),
        }
    }
}

/// Answers "is there a live process with this identifier right now".
///
/// The answer is stale as soon as it is returned: identifiers get reused. Callers
/// probe immediately before acting on the result and never cache it.
pub trait LivenessProbe: Send + Sync {
    fn probe(&self, pid: u32) -> Liveness;
}

/// Probes with the null signal, the `kill -0` existence check.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalProbe;

impl SignalProbe {
    /// 0 and negative values address process groups for `kill(2)`, never a single process.
    fn resolve(pid: u32) -> Option<Pid> {
        i32::try_from(pid)
            .ok()
            .filter(|raw| *raw > 0)
            .map(Pid::from_raw)
    }
}

impl LivenessProbe for SignalProbe {
    fn probe(&self, pid: u32) -> Liveness {
        let Some(target) = Self::resolve(pid) else {
            return Liveness::Unknown(Unverifiable::Unaddressable);
        };

        match kill(target, None) {
            Ok(()) => Liveness::Alive,
            Err(Errno::ESRCH) => Liveness::NotRunning,
            Err(Errno::EPERM) => Liveness::Unknown(Unverifiable::Denied),
            Err(errno) => Liveness::Unknown(Unverifiable::Other(errno)),
        }
    }
}
