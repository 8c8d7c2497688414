// # dynd - dyn Daemon
//
// Thin integration layer over dyn-core. All sync logic lives in the library;
// the daemon is responsible for:
// 1. Resolving configuration (config file + `DYN_*` environment variables)
// 2. Initializing logging and the runtime
// 3. Building the DNS public IP source and the Cloudflare provider
// 4. Running the sync engine until SIGTERM/SIGINT
//
// ## Configuration
//
// See `config.rs` for the file format and search path. Every key can be
// overridden from the environment:
//
// - `DYN_PROVIDER_APITOKEN`: Scoped API token
// - `DYN_PROVIDER_APIKEY` / `DYN_PROVIDER_EMAIL`: Global API key and account email
// - `DYN_PROVIDER_DRYRUN`: Log updates instead of sending them
// - `DYN_DNS_ZONE`: Zone to manage (required)
// - `DYN_DNS_RECORD`: Subdomain label, `@` for the zone apex (default `@`)
// - `DYN_TICK`: Poll interval, e.g. `5m` (required)
// - `DYN_PUBLICIP_HOST` / `DYN_PUBLICIP_RESOLVER` / `DYN_PUBLICIP_TIMEOUT`
// - `DYN_ENGINE_ONRESOLUTIONFAILURE`: `skip` or `exit`
// - `DYN_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DYN_PROVIDER_APITOKEN=...
// export DYN_DNS_ZONE=example.com
// export DYN_DNS_RECORD=home
// export DYN_TICK=5m
//
// dynd
// ```

mod config;

use anyhow::Result;
use config::Settings;
use dyn_core::{DynConfig, SyncEngine, SyncEvent};
use dyn_ip_dns::DnsPublicIpSource;
use dyn_provider_cloudflare::CloudflareProvider;
use std::env;
use std::future::Future;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (including public IP failure under the exit policy)
#[derive(Debug, Clone, Copy)]
enum DynExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DynExitCode> for ExitCode {
    fn from(code: DynExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let settings = match Settings::load(|key| env::var(key).ok()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DynExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DynExitCode::ConfigError.into();
    }

    info!("Starting dynd daemon");
    match &settings.source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No config file found, using environment only"),
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DynExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(settings.dyn_config)).into()
}

/// Build the engine and run it until a shutdown signal
async fn run_daemon(config: DynConfig) -> DynExitCode {
    let public_ip = match DnsPublicIpSource::new(config.public_ip.clone()) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to create public IP source: {}", e);
            return DynExitCode::ConfigError;
        }
    };

    let provider = match CloudflareProvider::from_config(&config.provider) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create DNS provider: {}", e);
            return DynExitCode::ConfigError;
        }
    };

    info!(
        "Public IP: {} via {}",
        config.public_ip.host, config.public_ip.resolver
    );

    let (engine, events) = match SyncEngine::new(Box::new(public_ip), Box::new(provider), config)
    {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to create sync engine: {}", e);
            return DynExitCode::ConfigError;
        }
    };

    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("{}", e);
            return DynExitCode::RuntimeError;
        }
    };

    tokio::spawn(log_events(events));

    match engine.run_until(shutdown).await {
        Ok(()) => {
            info!("Shutting down daemon");
            DynExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Daemon error: {}", e);
            DynExitCode::RuntimeError
        }
    }
}

/// Trace engine events; the engine already logs the important ones
async fn log_events(mut events: mpsc::Receiver<SyncEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Engine event: {:?}", event);
    }
}

/// Install SIGTERM and SIGINT handlers
///
/// Handlers are registered before the engine starts, so a signal arriving
/// during the first tick is not lost.
///
/// # Returns
///
/// A future that resolves when either signal is received.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        let signal = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", signal);
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: CTRL-C"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}
