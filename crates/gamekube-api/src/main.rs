//! gamekube - provision game servers on Kubernetes from templates

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gamekube_api::{router, serve, AppState, ApplyStrategy, Config, LogFormat};
use gamekube_common::kube_utils;
use gamekube_common::telemetry::{init_telemetry, TelemetryConfig};
use gamekube_provisioner::{
    ApiApplier, CliApplier, ClusterApplier, DirTemplateRepository, ManifestStore, Provisioner,
    TemplateRenderer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // kube's rustls client needs a process-wide crypto provider
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("failed to install rustls crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let config = Config::parse();

    let telemetry = init_telemetry(TelemetryConfig {
        json_logs: config.log_format == LogFormat::Json,
        ..TelemetryConfig::default()
    })?;

    let applier = build_applier(&config).await?;

    let renderer = TemplateRenderer::new(Arc::new(DirTemplateRepository::new(&config.templates_dir)));
    let games = renderer
        .preflight()
        .await
        .context("checking game templates")?;
    if games.is_empty() {
        warn!(dir = %config.templates_dir.display(), "no game templates found");
    }
    info!(
        games = ?games.iter().map(|g| g.as_str()).collect::<Vec<_>>(),
        templates_dir = %config.templates_dir.display(),
        manifests_dir = %config.manifests_dir.display(),
        strategy = ?config.apply_strategy,
        "starting gamekube"
    );

    let mut provisioner = Provisioner::new(renderer, ManifestStore::new(&config.manifests_dir), applier);
    if let Some(timeout) = config.request_timeout() {
        provisioner = provisioner.with_timeout(timeout);
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let app = router(AppState {
        provisioner: Arc::new(provisioner),
        shutdown: shutdown.clone(),
    });
    serve(config.listen, app, shutdown)
        .await
        .context("http server failed")?;

    info!("gamekube stopped");
    telemetry.shutdown();
    Ok(())
}

async fn build_applier(config: &Config) -> anyhow::Result<Arc<dyn ClusterApplier>> {
    match config.apply_strategy {
        ApplyStrategy::Api => {
            let client = kube_utils::create_client(config.kubeconfig.as_deref())
                .await
                .context("creating kubernetes client")?;
            Ok(Arc::new(ApiApplier::from_client(
                client,
                config.namespace.clone(),
                config.field_manager.clone(),
            )))
        }
        ApplyStrategy::Cli => Ok(Arc::new(CliApplier::new(
            &config.kubectl,
            config.kubectl_args.iter().cloned(),
        ))),
    }
}

async fn shutdown_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, draining requests");
    shutdown.cancel();
}
