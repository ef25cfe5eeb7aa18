use std::time::Instant;

use log::{debug, warn};

use crate::{
    config::PipelineOptions,
    error::{BenchError, CapabilityError, Result, Stage},
    features::{DescriptorKind, DetectorKind, FeatureBackend},
    frame::FrameRecord,
    region::retain_best,
    results::SweepResult,
    source::ImageSource,
    visualize,
    window::FixedWindow,
};

/// Runs the frames of one sweep cell through load, detect, filter, describe and match,
/// keeping the most recent frames in a [`FixedWindow`].
pub struct FramePipeline<'a, S, B> {
    detector: DetectorKind,
    descriptor: DescriptorKind,
    options: &'a PipelineOptions,
    source: &'a S,
    backend: &'a B,
    window: FixedWindow<FrameRecord>,
    result: SweepResult,
}

impl<'a, S: ImageSource, B: FeatureBackend> FramePipeline<'a, S, B> {
    pub fn new(
        detector: DetectorKind,
        descriptor: DescriptorKind,
        window_capacity: usize,
        options: &'a PipelineOptions,
        source: &'a S,
        backend: &'a B,
    ) -> Self {
        Self {
            detector,
            descriptor,
            options,
            source,
            backend,
            window: FixedWindow::new(window_capacity),
            result: SweepResult::new(detector, descriptor),
        }
    }

    pub fn window(&self) -> &FixedWindow<FrameRecord> {
        &self.window
    }

    /// Measurements collected so far
    pub fn result(&self) -> &SweepResult {
        &self.result
    }

    pub fn finish(self) -> SweepResult {
        self.result
    }

    pub fn process(&mut self, index: usize) -> Result<()> {
        let (detector, descriptor) = (self.detector, self.descriptor);
        let failed = |stage| {
            move |source: CapabilityError| BenchError::Capability {
                stage,
                detector,
                descriptor,
                source,
            }
        };

        let image = self.source.load(index)?;
        debug!("#1 : LOAD IMAGE {index} INTO BUFFER done");

        let started = Instant::now();
        let mut keypoints = self
            .backend
            .detect(detector, &image)
            .map_err(failed(Stage::Detect))?;
        let elapsed = elapsed_ms(started);
        self.result.detector_times_ms.push(elapsed);
        debug!(
            "#2 : DETECT KEYPOINTS done, {detector} found {} keypoints in {elapsed:.3} ms",
            keypoints.len()
        );

        if let Some(region) = &self.options.region_of_interest {
            keypoints = region.filter(&keypoints);
            debug!("{} keypoints inside the region of interest", keypoints.len());
        }
        if let Some(limit) = self.options.keypoint_limit {
            retain_best(&mut keypoints, limit, detector.reports_response());
            debug!(" NOTE: keypoints have been limited to {limit}!");
        }

        let started = Instant::now();
        let descriptors = self
            .backend
            .describe(descriptor, &mut keypoints, &image)
            .map_err(failed(Stage::Describe))?;
        let elapsed = elapsed_ms(started);
        self.result.descriptor_times_ms.push(elapsed);
        debug!("#3 : EXTRACT DESCRIPTORS done, {descriptor} in {elapsed:.3} ms");

        self.window
            .push(FrameRecord::new(index, image, keypoints, descriptors));

        let Some((previous, current)) = self.window.last_pair_mut() else {
            return Ok(());
        };

        current.matches = self
            .backend
            .match_descriptors(
                (&previous.keypoints, &previous.descriptors),
                (&current.keypoints, &current.descriptors),
                descriptor.category(),
                &self.options.matcher,
            )
            .map_err(failed(Stage::Match))?;
        self.result.match_counts.push(current.matches.len());
        debug!(
            "#4 : MATCH KEYPOINT DESCRIPTORS done, {} matches",
            current.matches.len()
        );

        if let Some(dir) = &self.options.visualize_dir {
            let path = visualize::output_path(dir, detector, descriptor, index);
            let written = std::fs::create_dir_all(dir)
                .map_err(image::ImageError::IoError)
                .and_then(|()| visualize::render_matches(previous, current))
                .and_then(|canvas| canvas.save(&path));
            if let Err(err) = written {
                warn!("could not write {}: {err}", path.display());
            }
        }

        Ok(())
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use image::GrayImage;

    use super::*;
    use crate::{
        algorithms::test_images::squares,
        features::{Keypoint, NativeBackend},
        region::RegionOfInterest,
        testing::{FrameSource, StubBackend},
    };

    fn unrestricted() -> PipelineOptions {
        PipelineOptions {
            region_of_interest: None,
            ..PipelineOptions::default()
        }
    }

    fn run(
        options: &PipelineOptions,
        source: &FrameSource,
        backend: &StubBackend,
        frames: usize,
    ) -> Result<SweepResult> {
        let mut pipeline = FramePipeline::new(
            DetectorKind::Fast,
            DescriptorKind::Brief,
            2,
            options,
            source,
            backend,
        );
        for index in 0..frames {
            pipeline.process(index)?;
        }
        Ok(pipeline.finish())
    }

    #[test]
    fn ten_frames_give_nine_match_counts() {
        let source = FrameSource::new(10);
        let result = run(&unrestricted(), &source, &StubBackend::default(), 10).unwrap();

        assert_eq!(result.match_counts.len(), 9);
        assert_eq!(result.detector_times_ms.len(), 10);
        assert_eq!(result.descriptor_times_ms.len(), 10);
        assert!(result.match_counts.iter().all(|&c| c > 0));
    }

    #[test]
    fn empty_frames_still_record_a_match_count() {
        let source = FrameSource::new(10);
        let options = PipelineOptions {
            region_of_interest: Some(RegionOfInterest::new(500, 500, 10, 10)),
            ..PipelineOptions::default()
        };
        let result = run(&options, &source, &StubBackend::default(), 10).unwrap();

        assert_eq!(result.match_counts, vec![0; 9]);
        assert_eq!(result.descriptor_times_ms.len(), 10);
    }

    #[test]
    fn window_holds_the_two_newest_frames() {
        let source = FrameSource::new(4);
        let options = unrestricted();
        let backend = StubBackend::default();
        let mut pipeline = FramePipeline::new(
            DetectorKind::Fast,
            DescriptorKind::Brief,
            2,
            &options,
            &source,
            &backend,
        );

        pipeline.process(0).unwrap();
        assert!(pipeline.window().last().unwrap().matches.is_empty());
        for index in 1..4 {
            pipeline.process(index).unwrap();
        }

        let window = pipeline.window();
        let indices: Vec<usize> = window.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![2, 3]);

        let (previous, current) = (window.second_last().unwrap(), window.last().unwrap());
        assert_eq!(current.descriptors.len(), current.keypoints.len());
        assert!(current.matches.iter().all(|m| {
            m.previous < previous.keypoints.len() && m.current < current.keypoints.len()
        }));
    }

    #[test]
    fn region_and_cap_restrict_keypoints() {
        let source = FrameSource::new(2);
        let backend = StubBackend::default();
        let options = PipelineOptions {
            region_of_interest: Some(RegionOfInterest::new(0, 0, 20, 100)),
            keypoint_limit: Some(2),
            ..PipelineOptions::default()
        };
        let mut pipeline = FramePipeline::new(
            DetectorKind::Fast,
            DescriptorKind::Brief,
            2,
            &options,
            &source,
            &backend,
        );
        pipeline.process(0).unwrap();

        let frame = pipeline.window().last().unwrap();
        assert_eq!(frame.keypoints.len(), 2);
        assert!(frame.keypoints.iter().all(|kp| kp.x() < 20.0));
        // the stub reports increasing responses along x
        assert!(frame.keypoints[0].response >= frame.keypoints[1].response);
    }

    #[test]
    fn load_failure_aborts() {
        let source = FrameSource::new(10).failing_once_at(5);
        let err = run(&unrestricted(), &source, &StubBackend::default(), 10).unwrap_err();
        assert!(matches!(err, BenchError::ImageNotFound { index: 5, .. }));
    }

    #[test]
    fn capability_failures_carry_their_stage() {
        let source = FrameSource::new(3);
        let backend = StubBackend::failing_at(Stage::Match);
        let err = run(&unrestricted(), &source, &backend, 3).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Capability {
                stage: Stage::Match,
                detector: DetectorKind::Fast,
                descriptor: DescriptorKind::Brief,
                ..
            }
        ));
    }

    #[test]
    fn writes_match_images() {
        let dir = std::env::temp_dir().join(format!("keypoint-bench-vis-{}", std::process::id()));
        let source = FrameSource::new(2);
        let options = PipelineOptions {
            visualize_dir: Some(dir.clone()),
            ..unrestricted()
        };
        run(&options, &source, &StubBackend::default(), 2).unwrap();

        assert!(dir.join("FAST_BRIEF_1.png").is_file());
        assert!(!dir.join("FAST_BRIEF_0.png").exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn native_backend_on_shifting_scene() {
        struct Shifting;
        impl ImageSource for Shifting {
            fn load(&self, index: usize) -> Result<GrayImage> {
                Ok(squares(800, 400, (index as u32 * 2, 0)))
            }
        }

        let options = PipelineOptions::default();
        let mut pipeline = FramePipeline::new(
            DetectorKind::Fast,
            DescriptorKind::Brief,
            2,
            &options,
            &Shifting,
            &NativeBackend,
        );
        for index in 0..3 {
            pipeline.process(index).unwrap();
        }

        let region = RegionOfInterest::VEHICLE;
        let frame: &FrameRecord = pipeline.window().last().unwrap();
        assert!(frame
            .keypoints
            .iter()
            .all(|kp: &Keypoint| region.contains(kp.x(), kp.y())));
        assert_eq!(pipeline.result().match_counts.len(), 2);
    }
}
