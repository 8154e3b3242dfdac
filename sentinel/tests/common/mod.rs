#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use instance::{ShutdownCoordinator, ShutdownTrigger};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use sentinel::{router, server};

/// In-process server on an ephemeral port, stopped when dropped.
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub shutdown: ShutdownCoordinator,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    pub async fn for_static_dir(static_dir: &Path) -> ServerHandle {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownCoordinator::new();

        let app = router::router(shutdown.clone(), static_dir, None);
        let task = tokio::spawn(server::serve(app, listener, shutdown.shutdown_signal()));

        ServerHandle {
            addr,
            shutdown,
            task,
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .expect("failed to send request")
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .expect("failed to send request")
    }

    /// Wait for the server task to return after shutdown.
    pub async fn stopped(&mut self) -> io::Result<()> {
        tokio::time::timeout(Duration::from_secs(5), &mut self.task)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.trigger(ShutdownTrigger::Terminate);
    }
}

/// A port that was free a moment ago.
pub fn free_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Working directory for one run of the binary: guard file plus static root.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn pid_file(&self) -> PathBuf {
        self.dir.path().join("daemon.pid")
    }

    pub fn pid_record(&self) -> Option<String> {
        std::fs::read_to_string(self.pid_file()).ok()
    }

    pub fn command(&self, addr: SocketAddr) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_sentinel"));
        cmd.env("PID_FILE", self.pid_file())
            .env("ADDRESS", addr.to_string())
            .env("STATIC_DIR", self.dir.path())
            .env("EXPORT_PROMETHEUS", "false")
            .env("GUARD_REFUSE_UNVERIFIABLE", "false")
            .env("DEBUG", "false")
            .env("RUST_LOG", "warn")
            .kill_on_drop(true);
        cmd
    }

    /// Start the binary in the background and wait until it serves requests.
    pub async fn spawn(&self) -> Instance {
        let addr = free_port();
        let child = self
            .command(addr)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to start sentinel");

        let mut instance = Instance { child, addr };
        instance.wait_ready().await;
        instance
    }
}

pub struct Instance {
    pub child: Child,
    pub addr: SocketAddr,
}

impl Instance {
    pub fn pid(&self) -> u32 {
        self.child.id().expect("sentinel already exited")
    }

    async fn wait_ready(&mut self) {
        let url = format!("http://{}/healthcheck", self.addr);
        for _ in 0..200 {
            if let Some(status) = self.child.try_wait().unwrap() {
                panic!("sentinel exited before becoming ready: {status}");
            }
            if let Ok(res) = reqwest::get(&url).await {
                if res.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("sentinel did not become ready on {}", self.addr);
    }

    pub fn signal(&self, signal: Signal) {
        let pid = i32::try_from(self.pid()).unwrap();
        kill(Pid::from_raw(pid), signal).expect("failed to signal sentinel");
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .expect("failed to send request")
    }

    /// Exit code once the process stops.
    pub async fn exit_code(mut self) -> Option<i32> {
        tokio::time::timeout(Duration::from_secs(10), self.child.wait())
            .await
            .expect("sentinel did not exit")
            .expect("failed to wait for sentinel")
            .code()
    }
}
