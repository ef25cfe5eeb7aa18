//! Compiled-in benchmark configuration.
//!
//! Nothing is read from the command line or the environment, every run of the
//! binary uses [`BenchmarkConfig::default`]. Tests and library users build their own.

use std::path::PathBuf;

use crate::{
    compatibility::BlockList,
    features::{DescriptorKind, DetectorKind, MatchConfig},
    region::RegionOfInterest,
};

/// Keypoint limit used when capping is switched on
pub const DEFAULT_KEYPOINT_LIMIT: usize = 50;

/// Naming convention and index range of the numbered image files.
///
/// Frame `i` lives at `base_path/prefix` followed by `i` zero padded to
/// `fill_width` digits and `extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceConfig {
    pub base_path: PathBuf,
    pub prefix: String,
    pub fill_width: usize,
    pub extension: String,
    pub start: usize,
    /// Inclusive
    pub end: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("../images/"),
            prefix: "KITTI/2011_09_26/image_00/data/000000".to_owned(),
            fill_width: 4,
            extension: ".png".to_owned(),
            start: 0,
            end: 9,
        }
    }
}

impl SequenceConfig {
    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }

    pub fn path_of(&self, index: usize) -> PathBuf {
        self.base_path.join(format!(
            "{}{:0>width$}{}",
            self.prefix,
            index,
            self.extension,
            width = self.fill_width
        ))
    }
}

/// Per-frame behaviour of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Keypoints outside the region are dropped right after detection
    pub region_of_interest: Option<RegionOfInterest>,
    /// Keep at most this many keypoints, `None` disables the cap
    pub keypoint_limit: Option<usize>,
    pub matcher: MatchConfig,
    /// Write a side by side match image per frame pair into this directory
    pub visualize_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            region_of_interest: Some(RegionOfInterest::VEHICLE),
            keypoint_limit: None,
            matcher: MatchConfig::default(),
            visualize_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub sequence: SequenceConfig,
    pub window_capacity: usize,
    pub pipeline: PipelineOptions,
    /// Swept in this order, outer loop
    pub detectors: Vec<DetectorKind>,
    /// Swept in this order, inner loop
    pub descriptors: Vec<DescriptorKind>,
    pub block_list: BlockList,
    pub results_path: PathBuf,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        use DescriptorKind as Desc;
        use DetectorKind as Det;

        Self {
            sequence: SequenceConfig::default(),
            window_capacity: 2,
            pipeline: PipelineOptions::default(),
            // SHI-TOMASI and FREAK are available but not part of the sweep
            detectors: vec![Det::Harris, Det::Fast, Det::Brisk, Det::Orb, Det::Akaze, Det::Sift],
            descriptors: vec![Desc::Brisk, Desc::Brief, Desc::Orb, Desc::Akaze, Desc::Sift],
            block_list: BlockList::observed(),
            results_path: PathBuf::from("Results.dat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_paths_are_zero_padded() {
        let sequence = SequenceConfig::default();
        assert_eq!(
            sequence.path_of(7),
            PathBuf::from("../images/KITTI/2011_09_26/image_00/data/0000000007.png")
        );
        assert_eq!(sequence.indices().count(), 10);
    }

    #[test]
    fn default_sweep() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.window_capacity, 2);
        assert_eq!(config.detectors.len(), 6);
        assert!(!config.descriptors.contains(&DescriptorKind::Freak));
        assert_eq!(
            config.pipeline.region_of_interest,
            Some(RegionOfInterest::new(535, 180, 180, 150))
        );
    }
}
