use std::{fmt, io::Write};

use log::{debug, info, warn};

use crate::{
    config::BenchmarkConfig,
    error::{BenchError, Result},
    features::{DescriptorKind, DetectorKind, FeatureBackend},
    pipeline::FramePipeline,
    results::{ResultsArtifact, SweepResult},
    source::ImageSource,
};

/// Outcome counts of a full sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub evaluated: usize,
    /// Blocked by the compatibility table
    pub skipped: usize,
    /// Aborted by a load or capability failure
    pub failed: usize,
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} evaluated, {} skipped, {} failed",
            self.evaluated, self.skipped, self.failed
        )
    }
}

/// Sweeps every allowed (detector, descriptor) pair over the image sequence
pub struct BenchmarkHarness<S, B> {
    config: BenchmarkConfig,
    source: S,
    backend: B,
}

impl<S: ImageSource, B: FeatureBackend> BenchmarkHarness<S, B> {
    pub fn new(config: BenchmarkConfig, source: S, backend: B) -> Self {
        Self {
            config,
            source,
            backend,
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Detectors in the outer loop, descriptors in the inner one, both in configured order.
    ///
    /// A failing cell is logged and skipped. Only a failure to write the artifact
    /// ends the sweep early.
    pub fn run<W: Write>(&self, artifact: &mut ResultsArtifact<W>) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();

        for &detector in &self.config.detectors {
            for &descriptor in &self.config.descriptors {
                if !self.config.block_list.is_allowed(detector, descriptor) {
                    debug!("skipping blocked pair {detector} / {descriptor}");
                    summary.skipped += 1;
                    continue;
                }

                match self.run_cell(detector, descriptor) {
                    Ok(result) => {
                        artifact.append(&result)?;
                        summary.evaluated += 1;
                    }
                    Err(err) => {
                        warn!("{detector} / {descriptor} aborted: {err}");
                        summary.failed += 1;
                    }
                }
            }
        }

        info!("sweep finished: {summary}");
        Ok(summary)
    }

    /// Replays the whole sequence for one pair through a fresh pipeline
    pub fn run_cell(
        &self,
        detector: DetectorKind,
        descriptor: DescriptorKind,
    ) -> Result<SweepResult> {
        if !self.config.block_list.is_allowed(detector, descriptor) {
            return Err(BenchError::IncompatiblePair {
                detector,
                descriptor,
            });
        }
        info!("evaluating {detector} / {descriptor}");

        let mut pipeline = FramePipeline::new(
            detector,
            descriptor,
            self.config.window_capacity,
            &self.config.pipeline,
            &self.source,
            &self.backend,
        );
        for index in self.config.sequence.indices() {
            pipeline.process(index)?;
        }

        let result = pipeline.finish();
        info!(
            "{detector} / {descriptor}: {} matches over {} frame pairs",
            result.match_counts.iter().sum::<usize>(),
            result.match_counts.len()
        );
        Ok(result)
    }
}
