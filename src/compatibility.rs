//! Detector / descriptor pairs excluded from the sweep.
//!
//! The table is empirical. Each entry records whether it was a crash seen while
//! running the pair, or a pair whose descriptor needs keypoint payload the detector
//! never produces.

use std::collections::HashSet;

use crate::features::{DescriptorKind, DetectorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The run aborted inside the feature library
    ObservedCrash,
    /// The descriptor cannot work on the detector's keypoints
    SemanticMismatch,
}

/// Block-list consulted before every sweep cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockList {
    blocked: HashSet<(DetectorKind, DescriptorKind)>,
}

const OBSERVED: [(DetectorKind, DescriptorKind, BlockReason); 12] = {
    use BlockReason::*;
    use DescriptorKind as Desc;
    use DetectorKind as Det;
    [
        // AKAZE descriptors sample the detector's own nonlinear scale space
        (Det::Harris, Desc::Akaze, SemanticMismatch),
        (Det::Fast, Desc::Akaze, SemanticMismatch),
        (Det::Brisk, Desc::Akaze, SemanticMismatch),
        (Det::Orb, Desc::Akaze, SemanticMismatch),
        (Det::Sift, Desc::Akaze, SemanticMismatch),
        // float SIFT descriptors handed to the Hamming matcher
        (Det::Harris, Desc::Sift, ObservedCrash),
        (Det::Fast, Desc::Sift, ObservedCrash),
        (Det::Brisk, Desc::Sift, ObservedCrash),
        (Det::Orb, Desc::Sift, ObservedCrash),
        (Det::Akaze, Desc::Sift, ObservedCrash),
        (Det::Sift, Desc::Sift, ObservedCrash),
        // SIFT octaves fall outside the ORB pyramid
        (Det::Sift, Desc::Orb, ObservedCrash),
    ]
};

impl BlockList {
    /// Pairs that failed in the benchmark runs
    pub fn observed() -> Self {
        Self::from_pairs(OBSERVED.iter().map(|&(det, desc, _)| (det, desc)))
    }

    /// [`BlockList::observed`] plus (FAST, ORB), blocked in one of the recorded runs
    pub fn observed_with_fast_orb() -> Self {
        let mut list = Self::observed();
        list.blocked.insert((DetectorKind::Fast, DescriptorKind::Orb));
        list
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (DetectorKind, DescriptorKind)>) -> Self {
        Self {
            blocked: pairs.into_iter().collect(),
        }
    }

    /// Nothing blocked
    pub fn empty() -> Self {
        Self::from_pairs([])
    }

    pub fn is_allowed(&self, detector: DetectorKind, descriptor: DescriptorKind) -> bool {
        !self.blocked.contains(&(detector, descriptor))
    }

    /// Why a pair of the observed table is blocked
    pub fn reason(detector: DetectorKind, descriptor: DescriptorKind) -> Option<BlockReason> {
        OBSERVED
            .iter()
            .find(|&&(det, desc, _)| (det, desc) == (detector, descriptor))
            .map(|&(_, _, reason)| reason)
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

impl Default for BlockList {
    fn default() -> Self {
        Self::observed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DescriptorKind as Desc;
    use DetectorKind as Det;

    #[test]
    fn observed_pairs() {
        let list = BlockList::observed();
        assert!(!list.is_allowed(Det::Harris, Desc::Sift));
        assert!(list.is_allowed(Det::Brisk, Desc::Brief));
        assert!(list.is_allowed(Det::Akaze, Desc::Akaze));
        assert!(list.is_allowed(Det::Fast, Desc::Orb));
        assert_eq!(list.len(), 12);
    }

    #[test]
    fn fast_orb_variant() {
        let list = BlockList::observed_with_fast_orb();
        assert!(!list.is_allowed(Det::Fast, Desc::Orb));
        assert_eq!(list.len(), 13);
    }

    #[test]
    fn reasons_are_recorded() {
        assert_eq!(
            BlockList::reason(Det::Orb, Desc::Akaze),
            Some(BlockReason::SemanticMismatch)
        );
        assert_eq!(
            BlockList::reason(Det::Sift, Desc::Orb),
            Some(BlockReason::ObservedCrash)
        );
        assert_eq!(BlockList::reason(Det::Fast, Desc::Brief), None);
    }

    #[test]
    fn custom_table() {
        let list = BlockList::from_pairs([(Det::Fast, Desc::Freak)]);
        assert!(!list.is_allowed(Det::Fast, Desc::Freak));
        assert!(list.is_allowed(Det::Harris, Desc::Sift));
        assert!(BlockList::empty().is_empty());
    }
}
