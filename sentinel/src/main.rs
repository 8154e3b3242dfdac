use std::process::ExitCode;

use anyhow::Context;
use envconfig::Envconfig;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use sentinel::config::Config;
use sentinel::daemon::Daemon;
use sentinel::exit_codes;

fn init_tracing(debug: bool) {
    // stdout with a level configured by the RUST_LOG envvar, info by default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_layer = {
        let base_layer = fmt::layer().with_target(true).with_level(true);

        if debug {
            base_layer.with_ansi(true).with_filter(filter).boxed()
        } else {
            base_layer.json().with_filter(filter).boxed()
        }
    };

    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::init_from_env().context("invalid configuration") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::from(exit_codes::FAILURE);
        }
    };

    init_tracing(*config.debug);
    tracing::info!(pid = std::process::id(), "starting");

    Daemon::from_config(&config).run(config).await.into()
}
