use std::net::SocketAddr;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;
use instance::UnverifiablePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FromStr for FlexBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(FlexBool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(FlexBool(false)),
            _ => Err(format!("Invalid boolean value: {}", s)),
        }
    }
}

impl From<FlexBool> for bool {
    fn from(flex: FlexBool) -> Self {
        flex.0
    }
}

impl Deref for FlexBool {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    /// File recording the identifier of the running instance.
    #[envconfig(from = "PID_FILE", default = "daemon.pid")]
    pub pid_file: PathBuf,

    #[envconfig(default = "0.0.0.0:8080")]
    pub address: SocketAddr,

    #[envconfig(default = "./static")]
    pub static_dir: PathBuf,

    #[envconfig(default = "false")]
    pub export_prometheus: FlexBool,

    /// How long the HTTP server gets to drain once shutdown is triggered.
    #[envconfig(default = "5")]
    pub shutdown_timeout_secs: u64,

    /// Refuse to start when the recorded process exists but cannot be probed.
    #[envconfig(default = "false")]
    pub guard_refuse_unverifiable: FlexBool,

    #[envconfig(from = "DEBUG", default = "false")]
    pub debug: FlexBool,
}

impl Config {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn unverifiable_policy(&self) -> UnverifiablePolicy {
        if *self.guard_refuse_unverifiable {
            UnverifiablePolicy::Refuse
        } else {
            UnverifiablePolicy::Proceed
        }
    }
}
