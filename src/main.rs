use presale_sniper::infrastructure::{app::SniperApp, config::Config, logging, shutdown::ShutdownSignal};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("failed to initialize logging: {}", e);
        process::exit(1);
    }
    info!("configuration loaded and validated");
    info!("starting presale sniper");

    let shutdown = ShutdownSignal::new();
    spawn_signal_listener(shutdown.clone());

    let app = match SniperApp::new(config, shutdown).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "initialization failed");
            process::exit(1);
        }
    };

    let exit_code = app.run().await;
    info!(exit_code, "presale sniper stopped");
    process::exit(exit_code);
}

fn spawn_signal_listener(shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            shutdown.trigger();
        }
    });
}
