use image::GrayImage;

use crate::features::{Descriptors, Keypoint, KeypointMatch};

/// State of one described image as it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// Position in the image sequence
    pub index: usize,
    image: GrayImage,
    pub keypoints: Vec<Keypoint>,
    /// Index-aligned with `keypoints`
    pub descriptors: Descriptors,
    /// Matches against the previous frame, `(previous, current)` keypoint indices
    pub matches: Vec<KeypointMatch>,
}

impl FrameRecord {
    pub fn new(
        index: usize,
        image: GrayImage,
        keypoints: Vec<Keypoint>,
        descriptors: Descriptors,
    ) -> Self {
        debug_assert_eq!(keypoints.len(), descriptors.len());
        Self {
            index,
            image,
            keypoints,
            descriptors,
            matches: Vec::new(),
        }
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }
}
