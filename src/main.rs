use std::process;

use esirkepov_rs::{run, Config};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "esirkepov_rs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::new().unwrap_or_else(|err| {
        error!("Problem parsing configuration: {:?}", err);
        process::exit(1);
    });

    if let Err(e) = run(cfg) {
        error!("Application error: {:?}", e);
        process::exit(1);
    }
}
