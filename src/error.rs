use std::path::PathBuf;

use thiserror::Error;

use crate::features::{DescriptorKind, DetectorKind};

/// Failures raised by a detector, extractor or matcher
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("image is empty")]
    EmptyImage,

    #[error("{descriptor} descriptors require keypoints carrying {required}")]
    IncompatibleKeypoints {
        descriptor: DescriptorKind,
        required: &'static str,
    },

    #[error("cannot match {found} descriptors as {expected}")]
    CategoryMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Stage of the frame pipeline an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detect,
    Describe,
    Match,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Detect => "detect",
            Stage::Describe => "describe",
            Stage::Match => "match",
        })
    }
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("image {index} not found at {}", path.display())]
    ImageNotFound { index: usize, path: PathBuf },

    #[error("failed to load image {index} from {}", path.display())]
    ImageLoad {
        index: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{detector} / {descriptor} is a blocked combination")]
    IncompatiblePair {
        detector: DetectorKind,
        descriptor: DescriptorKind,
    },

    #[error("{stage} stage failed for {detector} / {descriptor}: {source}")]
    Capability {
        stage: Stage,
        detector: DetectorKind,
        descriptor: DescriptorKind,
        #[source]
        source: CapabilityError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
