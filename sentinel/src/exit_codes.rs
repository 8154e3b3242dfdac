//! Process exit codes. Calling scripts rely on telling "already running" apart
//! from every other startup failure.

/// Clean shutdown.
pub const SUCCESS: u8 = 0;

/// Startup failure (configuration, guard file, bind) or the service died on its own.
pub const FAILURE: u8 = 1;

/// The guard file is held by a live process.
pub const ALREADY_RUNNING: u8 = 2;
