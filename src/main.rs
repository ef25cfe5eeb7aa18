use std::process::ExitCode;

use keypoint_bench::{
    BenchmarkConfig, BenchmarkHarness, ImageSequence, NativeBackend, ResultsArtifact,
};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    // `log` records from the library are forwarded to this subscriber
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BenchmarkConfig::default();
    let mut artifact = match ResultsArtifact::create(&config.results_path) {
        Ok(artifact) => artifact,
        Err(err) => {
            tracing::error!("cannot create {}: {err}", config.results_path.display());
            return ExitCode::FAILURE;
        }
    };

    let source = ImageSequence::new(config.sequence.clone());
    let harness = BenchmarkHarness::new(config, source, NativeBackend);

    match harness.run(&mut artifact) {
        Ok(summary) => {
            tracing::info!(
                "results written to {} ({summary})",
                harness.config().results_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("sweep aborted: {err}");
            ExitCode::FAILURE
        }
    }
}
