//! Detector, extractor and matcher capabilities the frame pipeline calls out to.

use image::GrayImage;

use crate::error::CapabilityError;

pub mod descriptor;
pub mod detector;
pub mod keypoint;
pub mod matcher;

pub use descriptor::{BinaryDescriptor, DescriptorCategory, DescriptorKind, Descriptors};
pub use detector::DetectorKind;
pub use keypoint::Keypoint;
pub use matcher::{KeypointMatch, MatchConfig, MatcherFamily, Selector};

/// The feature library seen by the pipeline.
///
/// Everything behind this trait is opaque to the benchmark: it only observes
/// the keypoints, descriptors and matches coming back, and how long each call took.
pub trait FeatureBackend {
    fn detect(&self, kind: DetectorKind, image: &GrayImage)
        -> Result<Vec<Keypoint>, CapabilityError>;

    /// Computes descriptors for `keypoints`, removing the keypoints
    /// that cannot be described so both sequences stay index-aligned.
    fn describe(
        &self,
        kind: DescriptorKind,
        keypoints: &mut Vec<Keypoint>,
        image: &GrayImage,
    ) -> Result<Descriptors, CapabilityError>;

    fn match_descriptors(
        &self,
        previous: (&[Keypoint], &Descriptors),
        current: (&[Keypoint], &Descriptors),
        category: DescriptorCategory,
        config: &MatchConfig,
    ) -> Result<Vec<KeypointMatch>, CapabilityError>;
}

/// Backend running the algorithms of [`crate::algorithms`]
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl FeatureBackend for NativeBackend {
    fn detect(
        &self,
        kind: DetectorKind,
        image: &GrayImage,
    ) -> Result<Vec<Keypoint>, CapabilityError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CapabilityError::EmptyImage);
        }
        (kind.capability())(image)
    }

    fn describe(
        &self,
        kind: DescriptorKind,
        keypoints: &mut Vec<Keypoint>,
        image: &GrayImage,
    ) -> Result<Descriptors, CapabilityError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CapabilityError::EmptyImage);
        }
        let descriptors = (kind.capability())(keypoints, image)?;
        debug_assert_eq!(descriptors.len(), keypoints.len());
        Ok(descriptors)
    }

    fn match_descriptors(
        &self,
        previous: (&[Keypoint], &Descriptors),
        current: (&[Keypoint], &Descriptors),
        category: DescriptorCategory,
        config: &MatchConfig,
    ) -> Result<Vec<KeypointMatch>, CapabilityError> {
        matcher::match_descriptors(previous, current, category, config)
    }
}
