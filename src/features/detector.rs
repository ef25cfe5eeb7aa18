use std::fmt;

use image::GrayImage;

use super::Keypoint;
use crate::{
    algorithms::{akaze, brisk, corners, orb, sift},
    error::CapabilityError,
};

pub type DetectFn = fn(&GrayImage) -> Result<Vec<Keypoint>, CapabilityError>;

/// Keypoint detectors available to the benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    ShiTomasi,
    Harris,
    Fast,
    Brisk,
    Orb,
    Akaze,
    Sift,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 7] = [
        Self::ShiTomasi,
        Self::Harris,
        Self::Fast,
        Self::Brisk,
        Self::Orb,
        Self::Akaze,
        Self::Sift,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ShiTomasi => "SHITOMASI",
            Self::Harris => "HARRIS",
            Self::Fast => "FAST",
            Self::Brisk => "BRISK",
            Self::Orb => "ORB",
            Self::Akaze => "AKAZE",
            Self::Sift => "SIFT",
        }
    }

    /// Shi-Tomasi hands back corners already sorted by quality
    /// but leaves the response field empty.
    pub fn reports_response(self) -> bool {
        !matches!(self, Self::ShiTomasi)
    }

    /// Detection function backing this kind
    pub fn capability(self) -> DetectFn {
        match self {
            Self::ShiTomasi => corners::detect_shi_tomasi,
            Self::Harris => corners::detect_harris,
            Self::Fast => corners::detect_fast,
            Self::Brisk => brisk::detect,
            Self::Orb => orb::detect,
            Self::Akaze => akaze::detect,
            Self::Sift => sift::detect,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_distinct() {
        let mut names: Vec<_> = DetectorKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DetectorKind::ALL.len());
        assert_eq!(DetectorKind::ShiTomasi.to_string(), "SHITOMASI");
    }

    #[test]
    fn only_shi_tomasi_lacks_response() {
        let silent: Vec<_> = DetectorKind::ALL
            .into_iter()
            .filter(|k| !k.reports_response())
            .collect();
        assert_eq!(silent, vec![DetectorKind::ShiTomasi]);
    }
}
