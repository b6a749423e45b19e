//! Process configuration from flags and environment

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use gamekube_common::{DEFAULT_FIELD_MANAGER, DEFAULT_NAMESPACE};

/// How manifests reach the cluster
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ApplyStrategy {
    /// Server-side apply through the Kubernetes API
    #[default]
    Api,
    /// Run an external client (kubectl-compatible) against the manifest file
    Cli,
}

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable lines
    Text,
}

/// gamekube - provision game servers on Kubernetes from templates
#[derive(Parser, Debug, Clone)]
#[command(name = "gamekube", version, about, long_about = None)]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "GAMEKUBE_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Kubeconfig for the API strategy (in-cluster or ~/.kube/config when unset)
    #[arg(long, env = "GAMEKUBE_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Directory holding `<game>.yml` templates
    #[arg(long, env = "GAMEKUBE_TEMPLATES_DIR", default_value = "./templates")]
    pub templates_dir: PathBuf,

    /// Directory rendered manifests are written to
    #[arg(long, env = "GAMEKUBE_MANIFESTS_DIR", default_value = "./manifests")]
    pub manifests_dir: PathBuf,

    /// How manifests are applied
    #[arg(long, env = "GAMEKUBE_APPLY_STRATEGY", value_enum, default_value_t = ApplyStrategy::Api)]
    pub apply_strategy: ApplyStrategy,

    /// Client binary for the CLI strategy
    #[arg(long, env = "GAMEKUBE_KUBECTL", default_value = "kubectl")]
    pub kubectl: PathBuf,

    /// Arguments placed before the manifest path for the CLI strategy
    #[arg(
        long = "kubectl-arg",
        env = "GAMEKUBE_KUBECTL_ARGS",
        value_delimiter = ',',
        default_values_t = ["apply".to_string(), "-f".to_string()]
    )]
    pub kubectl_args: Vec<String>,

    /// Field manager for server-side apply
    #[arg(long, env = "GAMEKUBE_FIELD_MANAGER", default_value = DEFAULT_FIELD_MANAGER)]
    pub field_manager: String,

    /// Namespace for manifests that do not name one
    #[arg(long, env = "GAMEKUBE_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Upper bound on one provisioning request, in seconds (0 disables it)
    #[arg(long, env = "GAMEKUBE_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Log output format
    #[arg(long, env = "GAMEKUBE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Config {
    /// Request timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}
