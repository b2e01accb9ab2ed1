use clap::Args;

use crate::types::params::MetricsParams;

/// Metrics exposition configuration.
#[derive(Debug, Clone, Args)]
pub struct InstrumentationCliArgs {
    /// Start the metrics server
    #[arg(env = "DISPERSER_ENABLE_METRICS", long, default_value_t = false)]
    pub enable_metrics: bool,

    /// Port the metrics HTTP server listens on
    #[arg(env = "DISPERSER_METRICS_HTTP_PORT", long, default_value_t = 9100)]
    pub metrics_http_port: u16,
}

impl From<&InstrumentationCliArgs> for MetricsParams {
    fn from(args: &InstrumentationCliArgs) -> Self {
        Self { enable_metrics: args.enable_metrics, metrics_port: args.metrics_http_port }
    }
}
