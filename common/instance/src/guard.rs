//! PID-file instance guard.
//!
//! The guard file holds at most one line: the decimal identifier of the process
//! that owns it, followed by a newline. An empty file is the steady state between
//! runs on hosts that keep the file around.
//!
//! Claiming is read, probe, truncate, write, sync. It is not atomic with respect to
//! another process racing for the same file; the liveness probe right before the
//! write keeps that window small.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use crate::error::GuardError;
use crate::liveness::{Liveness, LivenessProbe, Unverifiable};

/// What to do when the recorded process can be neither confirmed alive nor dead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnverifiablePolicy {
    /// Treat the record as stale and claim the guard.
    #[default]
    Proceed,
    /// Fail startup with [`GuardError::Unverifiable`] and leave the file alone.
    /// Identifiers that cannot name a process are stale under either policy.
    Refuse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    /// The guard file now names this process, cleanup is owed on exit.
    Claimed,
    /// A live process holds the guard. The file was not modified.
    AlreadyRunning(u32),
}

/// Owns the guard file path and whether this process has claimed it.
pub struct InstanceGuard<P> {
    path: PathBuf,
    probe: P,
    policy: UnverifiablePolicy,
    pid: u32,
    claimed: AtomicBool,
}

impl<P: LivenessProbe> InstanceGuard<P> {
    pub fn new(path: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            path: path.into(),
            probe,
            policy: UnverifiablePolicy::default(),
            pid: std::process::id(),
            claimed: AtomicBool::new(false),
        }
    }

    pub fn with_policy(mut self, policy: UnverifiablePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Identifier written on claim. Defaults to the current process.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// True between a successful claim and the matching [`release`](InstanceGuard::release).
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Claim the guard file for this process, unless a live process already holds it.
    pub fn acquire(&self) -> Result<Acquired, GuardError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| GuardError::Open {
                path: self.path.clone(),
                source,
            })?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|source| GuardError::Read {
                path: self.path.clone(),
                source,
            })?;

        if let Some(previous) = parse_record(&self.path, &content)? {
            if previous == self.pid {
                // Our identifier was reused from a crashed predecessor.
                debug!(pid = previous, path = %self.path.display(), "guard file already names this process");
            } else {
                match self.probe.probe(previous) {
                    Liveness::Alive => {
                        warn!(
                            pid = previous,
                            path = %self.path.display(),
                            "a process is already running with this guard file"
                        );
                        return Ok(Acquired::AlreadyRunning(previous));
                    }
                    Liveness::NotRunning => {
                        warn!(
                            pid = previous,
                            path = %self.path.display(),
                            "guard file names a process that is down, maybe a crash occurred"
                        );
                    }
                    Liveness::Unknown(Unverifiable::Unaddressable) => {
                        warn!(
                            pid = previous,
                            path = %self.path.display(),
                            "guard file names an identifier no process can hold, treating record as stale"
                        );
                    }
                    Liveness::Unknown(reason) => {
                        if self.policy == UnverifiablePolicy::Refuse {
                            return Err(GuardError::Unverifiable {
                                pid: previous,
                                reason,
                            });
                        }
                        warn!(
                            pid = previous,
                            path = %self.path.display(),
                            %reason,
                            "cannot verify process named by guard file, treating record as stale"
                        );
                    }
                }
            }
        }

        if !content.is_empty() {
            file.set_len(0).map_err(|source| GuardError::Truncate {
                path: self.path.clone(),
                source,
            })?;
        }

        let write_err = |source: io::Error| GuardError::Write {
            path: self.path.clone(),
            source,
        };
        file.seek(SeekFrom::Start(0)).map_err(write_err)?;
        writeln!(file, "{}", self.pid).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;

        self.claimed.store(true, Ordering::SeqCst);
        info!(pid = self.pid, path = %self.path.display(), "claimed guard file");

        Ok(Acquired::Claimed)
    }

    /// Delete the guard file if, and only if, this guard claimed it.
    ///
    /// Runs its side effect at most once. Returns true when the file was removed.
    /// Failing to remove is logged and otherwise ignored: the next startup will
    /// find a record for a process that is not running and recover.
    pub fn release(&self) -> bool {
        if !self.claimed.swap(false, Ordering::SeqCst) {
            debug!(path = %self.path.display(), "guard file not owned, leaving it in place");
            return false;
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "guard file has been removed");
                true
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to remove guard file");
                false
            }
        }
    }
}

/// `None` for an empty record, the identifier otherwise.
fn parse_record(path: &Path, content: &str) -> Result<Option<u32>, GuardError> {
    let record = content.trim();
    if record.is_empty() {
        return Ok(None);
    }
    if !record.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(path, record));
    }

    match record.parse::<i64>() {
        Ok(pid) if pid > 0 => u32::try_from(pid).map(Some).map_err(|_| malformed(path, record)),
        _ => Err(malformed(path, record)),
    }
}

fn malformed(path: &Path, record: &str) -> GuardError {
    GuardError::Malformed {
        path: path.to_path_buf(),
        content: record.to_owned(),
    }
}
