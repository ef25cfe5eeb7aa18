//! Deterministic stand-ins for the image source and the feature backend.

use std::{cell::Cell, path::PathBuf};

use image::{GrayImage, Luma};

use crate::{
    error::{BenchError, CapabilityError, Result, Stage},
    features::{
        matcher, DescriptorCategory, DescriptorKind, Descriptors, DetectorKind, FeatureBackend,
        Keypoint, KeypointMatch, MatchConfig,
    },
    source::ImageSource,
};

/// `frames` small uniform images, frame `i` filled with intensity `i`
pub struct FrameSource {
    frames: usize,
    fail_once_at: Cell<Option<usize>>,
}

impl FrameSource {
    pub fn new(frames: usize) -> Self {
        Self {
            frames,
            fail_once_at: Cell::new(None),
        }
    }

    /// Reports `index` as missing the first time it is requested
    pub fn failing_once_at(self, index: usize) -> Self {
        self.fail_once_at.set(Some(index));
        self
    }
}

impl ImageSource for FrameSource {
    fn load(&self, index: usize) -> Result<GrayImage> {
        let missing = BenchError::ImageNotFound {
            index,
            path: PathBuf::from(format!("memory/{index}")),
        };
        if self.fail_once_at.get() == Some(index) {
            self.fail_once_at.set(None);
            return Err(missing);
        }
        if index >= self.frames {
            return Err(missing);
        }
        Ok(GrayImage::from_pixel(32, 24, Luma([index as u8])))
    }
}

/// Eight keypoints along a row, described by their x coordinate.
///
/// Responses grow with x. Matching goes through the real brute-force matcher.
/// Failures can be injected for a whole stage or for a single kind.
#[derive(Debug, Default)]
pub struct StubBackend {
    fail_at: Option<Stage>,
    failing_detector: Option<DetectorKind>,
    failing_descriptor: Option<DescriptorKind>,
    failing_category: Option<DescriptorCategory>,
}

impl StubBackend {
    /// Every call of `stage` fails
    pub fn failing_at(stage: Stage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    pub fn failing_detector(kind: DetectorKind) -> Self {
        Self {
            failing_detector: Some(kind),
            ..Self::default()
        }
    }

    pub fn failing_descriptor(kind: DescriptorKind) -> Self {
        Self {
            failing_descriptor: Some(kind),
            ..Self::default()
        }
    }

    /// Matching fails for descriptors of `category`
    pub fn failing_matches(category: DescriptorCategory) -> Self {
        Self {
            failing_category: Some(category),
            ..Self::default()
        }
    }

    fn check(&self, stage: Stage, keyed: bool) -> std::result::Result<(), CapabilityError> {
        if keyed || self.fail_at == Some(stage) {
            Err(CapabilityError::EmptyImage)
        } else {
            Ok(())
        }
    }
}

impl FeatureBackend for StubBackend {
    fn detect(
        &self,
        kind: DetectorKind,
        _image: &GrayImage,
    ) -> std::result::Result<Vec<Keypoint>, CapabilityError> {
        self.check(Stage::Detect, self.failing_detector == Some(kind))?;
        Ok((0..8)
            .map(|i| {
                let x = 4.0 + 6.0 * i as f32;
                Keypoint::new(x, 10.0, 7.0).with_response(x)
            })
            .collect())
    }

    fn describe(
        &self,
        kind: DescriptorKind,
        keypoints: &mut Vec<Keypoint>,
        _image: &GrayImage,
    ) -> std::result::Result<Descriptors, CapabilityError> {
        self.check(Stage::Describe, self.failing_descriptor == Some(kind))?;
        Ok(Descriptors::Binary(
            keypoints.iter().map(|kp| [kp.x() as u8; 64]).collect(),
        ))
    }

    fn match_descriptors(
        &self,
        previous: (&[Keypoint], &Descriptors),
        current: (&[Keypoint], &Descriptors),
        category: DescriptorCategory,
        config: &MatchConfig,
    ) -> std::result::Result<Vec<KeypointMatch>, CapabilityError> {
        self.check(Stage::Match, self.failing_category == Some(category))?;
        matcher::match_descriptors(previous, current, category, config)
    }
}
