use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use fleetkeeper_agent::features::docker::DockerRuntime;
use fleetkeeper_agent::shared::config::{default_log_filter, load_settings, settings_path_from_env};
use fleetkeeper_agent::Supervisor;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let settings_path = settings_path_from_env();
    let loaded = load_settings(&settings_path).await;

    let fallback_filter = match &loaded {
        Ok(settings) => default_log_filter(settings),
        Err(_) => "fleetkeeper_agent=info,fleetkeeper_core=info,info".to_string(),
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = match loaded {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "Failed to load settings");
            return Err(err.into());
        }
    };

    info!(
        path = %settings_path.display(),
        containers = settings.registered_containers.len(),
        interval_secs = settings.regular_task.interval,
        "Starting fleetkeeper agent"
    );

    let docker = Arc::new(DockerRuntime::connect()?);
    let (supervisor, mut events) = Supervisor::start(settings, docker.clone(), docker);

    let store = supervisor.store().clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(
                key = %event.key,
                status = %event.status,
                fleet = %store.summary().headline(),
                "Status changed"
            );
        }
    });

    wait_for_shutdown(&supervisor, &settings_path).await;
    supervisor.shutdown().await;
    info!("Fleetkeeper agent stopped");

    Ok(())
}

#[cfg(unix)]
async fn reload(supervisor: &Supervisor, path: &Path) {
    match load_settings(path).await {
        Ok(settings) => supervisor.apply_settings(settings),
        Err(err) => warn!(error = %err, "Settings reload rejected, keeping previous settings"),
    }
}

#[cfg(unix)]
async fn wait_for_shutdown(supervisor: &Supervisor, path: &Path) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut terminate, mut hangup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(terminate), Ok(hangup)) => (terminate, hangup),
        (Err(err), _) | (_, Err(err)) => {
            warn!(error = %err, "Failed to install signal handlers, waiting for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = terminate.recv() => break,
            _ = hangup.recv() => {
                info!(path = %path.display(), "Reloading settings");
                reload(supervisor, path).await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_supervisor: &Supervisor, _path: &Path) {
    let _ = tokio::signal::ctrl_c().await;
}
