use std::fmt;

use image::GrayImage;
use nalgebra::DVector;

use super::Keypoint;
use crate::{
    algorithms::{akaze, brief, brisk, freak, orb, sift},
    error::CapabilityError,
};

/// Const Generic assignement of binary descriptor size.
/// Shorter descriptors are zero padded, which leaves Hamming distances unchanged.
pub const BINARY_DESCRIPTOR_SIZE: usize = 512 / u8::BITS as usize;

pub type BinaryDescriptor = [u8; BINARY_DESCRIPTOR_SIZE];

pub type DescribeFn =
    fn(&mut Vec<Keypoint>, &GrayImage) -> Result<Descriptors, CapabilityError>;

/// Descriptor extractors available to the benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    Brisk,
    Brief,
    Orb,
    Freak,
    Akaze,
    Sift,
}

/// How descriptors are compared by the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorCategory {
    /// Hamming distance between bit strings
    Binary,
    /// Euclidean distance between float vectors
    Float,
}

impl DescriptorCategory {
    pub fn name(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Float => "float",
        }
    }
}

impl DescriptorKind {
    pub const ALL: [DescriptorKind; 6] = [
        Self::Brisk,
        Self::Brief,
        Self::Orb,
        Self::Freak,
        Self::Akaze,
        Self::Sift,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Brisk => "BRISK",
            Self::Brief => "BRIEF",
            Self::Orb => "ORB",
            Self::Freak => "FREAK",
            Self::Akaze => "AKAZE",
            Self::Sift => "SIFT",
        }
    }

    pub fn category(self) -> DescriptorCategory {
        match self {
            Self::Sift => DescriptorCategory::Float,
            _ => DescriptorCategory::Binary,
        }
    }

    /// Extraction function backing this kind
    pub fn capability(self) -> DescribeFn {
        match self {
            Self::Brisk => brisk::describe,
            Self::Brief => brief::describe,
            Self::Orb => orb::describe,
            Self::Freak => freak::describe,
            Self::Akaze => akaze::describe,
            Self::Sift => sift::describe,
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptors of one frame, index-aligned with its keypoints
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptors {
    Binary(Vec<BinaryDescriptor>),
    /// Byte quantized gradient histograms
    Histogram(Vec<Vec<u8>>),
}

impl Descriptors {
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(d) => d.len(),
            Self::Histogram(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn category(&self) -> DescriptorCategory {
        match self {
            Self::Binary(_) => DescriptorCategory::Binary,
            Self::Histogram(_) => DescriptorCategory::Float,
        }
    }

    /// Element-wise conversion of the raw bytes to `f32`
    pub fn to_float(&self) -> Vec<DVector<f32>> {
        fn convert(bytes: &[u8]) -> DVector<f32> {
            DVector::from_iterator(bytes.len(), bytes.iter().map(|&b| b as f32))
        }

        match self {
            Self::Binary(d) => d.iter().map(|bytes| convert(bytes)).collect(),
            Self::Histogram(d) => d.iter().map(|bytes| convert(bytes)).collect(),
        }
    }
}

/// Packs a sequence of test outcomes into a zero padded binary descriptor
pub(crate) fn pack_bits(bits: impl IntoIterator<Item = bool>) -> BinaryDescriptor {
    let mut descriptor = [0; BINARY_DESCRIPTOR_SIZE];
    for (i, bit) in bits
        .into_iter()
        .take(BINARY_DESCRIPTOR_SIZE * u8::BITS as usize)
        .enumerate()
    {
        if bit {
            descriptor[i / 8] |= 1 << (7 - i % 8);
        }
    }
    descriptor
}
