use bitarray::BitArray;
use nalgebra::DVector;
use space::{Knn, KnnFromBatch, LinearKnn, Metric};

use super::{BinaryDescriptor, DescriptorCategory, Descriptors, Keypoint};
use crate::error::CapabilityError;

/// Correspondence between a keypoint of the previous frame (`previous`)
/// and one of the current frame (`current`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeypointMatch {
    pub previous: usize,
    pub current: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherFamily {
    BruteForce,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selector {
    /// Keep the single best candidate of every query
    NearestNeighbor,
    /// k = 2 followed by Lowe's ratio test
    KnnRatio(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    pub family: MatcherFamily,
    pub selector: Selector,
}

impl Default for MatchConfig {
    fn default() -> Self {
        const LOWE_RATIO: f32 = 0.8;

        Self {
            family: MatcherFamily::BruteForce,
            selector: Selector::KnnRatio(LOWE_RATIO),
        }
    }
}

/// Matches the previous frame's descriptors (queries) onto the current frame's (train set).
pub fn match_descriptors(
    previous: (&[Keypoint], &Descriptors),
    current: (&[Keypoint], &Descriptors),
    category: DescriptorCategory,
    config: &MatchConfig,
) -> Result<Vec<KeypointMatch>, CapabilityError> {
    debug_assert_eq!(previous.0.len(), previous.1.len());
    debug_assert_eq!(current.0.len(), current.1.len());

    match (config.family, category) {
        (MatcherFamily::BruteForce, DescriptorCategory::Binary) => {
            let (Descriptors::Binary(queries), Descriptors::Binary(train)) = (previous.1, current.1)
            else {
                return Err(CapabilityError::CategoryMismatch {
                    expected: category.name(),
                    found: DescriptorCategory::Float.name(),
                });
            };

            Ok(brute_force::<Hamming, _>(
                queries,
                train,
                config.selector,
                |d| d as f32,
            ))
        }
        (MatcherFamily::BruteForce, DescriptorCategory::Float) => {
            let queries = previous.1.to_float();
            let train = current.1.to_float();

            Ok(brute_force::<Euclidean, _>(
                &queries,
                &train,
                config.selector,
                f32::from_bits,
            ))
        }
    }
}

fn brute_force<'d, M, P>(
    queries: &'d [P],
    train: &'d [P],
    selector: Selector,
    to_distance: impl Fn(u32) -> f32,
) -> Vec<KeypointMatch>
where
    M: Metric<&'d P, Unit = u32> + Default,
{
    if train.is_empty() {
        return Vec::new();
    }

    // Prepare descriptor data to perform kNN matching
    let data = train.iter().map(|d| (d, ())).collect::<Vec<_>>();
    let search: LinearKnn<M, _> = KnnFromBatch::from_batch(data.iter());

    queries
        .iter()
        .enumerate()
        .filter_map(|(i, query)| match selector {
            Selector::NearestNeighbor => {
                let nearest = search.knn(&query, 1);
                nearest.first().map(|n| KeypointMatch {
                    previous: i,
                    current: n.0.index,
                    distance: to_distance(n.0.distance),
                })
            }
            Selector::KnnRatio(ratio) => {
                // find k = 2 nearest neighbors and then perform Lowe's test to filter out
                // answers potentially chosen by noise
                let nearest = search.knn(&query, 2);
                if nearest.len() < 2 {
                    return None;
                }

                let best = to_distance(nearest[0].0.distance);
                let second = to_distance(nearest[1].0.distance);
                (best < ratio * second).then(|| KeypointMatch {
                    previous: i,
                    current: nearest[0].0.index,
                    distance: best,
                })
            }
        })
        .collect()
}

// Implementations for `space`

#[derive(Default)]
struct Hamming;

impl<'d> Metric<&'d BinaryDescriptor> for Hamming {
    type Unit = u32;
    fn distance(&self, a: &&BinaryDescriptor, b: &&BinaryDescriptor) -> Self::Unit {
        BitArray::new(**a).distance(&BitArray::new(**b))
    }
}

/// L2 distance, encoded through `f32::to_bits` which orders non-negative floats correctly
#[derive(Default)]
struct Euclidean;

impl<'d> Metric<&'d DVector<f32>> for Euclidean {
    type Unit = u32;
    fn distance(&self, a: &&DVector<f32>, b: &&DVector<f32>) -> Self::Unit {
        (*a - *b).norm().to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::descriptor::pack_bits;

    fn keypoints(n: usize) -> Vec<Keypoint> {
        (0..n).map(|i| Keypoint::new(i as f32, 0.0, 7.0)).collect()
    }

    fn binary(bits: &[&[bool]]) -> Descriptors {
        Descriptors::Binary(bits.iter().map(|b| pack_bits(b.iter().copied())).collect())
    }

    #[test]
    fn ratio_test_rejects_ambiguous_queries() {
        // query 0 has an exact twin, query 1 sits halfway between two candidates
        let previous = binary(&[&[true; 16], &[true, true]]);
        let current = binary(&[&[true; 16], &[false; 16], &[true, false, true]]);
        let (kp_prev, kp_cur) = (keypoints(2), keypoints(3));

        let matches = match_descriptors(
            (&kp_prev, &previous),
            (&kp_cur, &current),
            DescriptorCategory::Binary,
            &MatchConfig::default(),
        )
        .unwrap();

        assert_eq!(
            matches,
            vec![KeypointMatch {
                previous: 0,
                current: 0,
                distance: 0.0
            }]
        );
    }

    #[test]
    fn nearest_neighbor_keeps_every_query() {
        let previous = binary(&[&[true; 16], &[true, true]]);
        let current = binary(&[&[true; 16], &[false; 16], &[true, false, true]]);
        let (kp_prev, kp_cur) = (keypoints(2), keypoints(3));
        let config = MatchConfig {
            family: MatcherFamily::BruteForce,
            selector: Selector::NearestNeighbor,
        };

        let matches = match_descriptors(
            (&kp_prev, &previous),
            (&kp_cur, &current),
            DescriptorCategory::Binary,
            &config,
        )
        .unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].previous, 1);
        assert_eq!(matches[1].distance, 2.0);
    }

    #[test]
    fn single_candidate_yields_no_ratio_match() {
        let previous = binary(&[&[true; 8]]);
        let current = binary(&[&[true; 8]]);
        let kp = keypoints(1);

        let matches = match_descriptors(
            (&kp, &previous),
            (&kp, &current),
            DescriptorCategory::Binary,
            &MatchConfig::default(),
        )
        .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn float_category_converts_both_sets() {
        let previous = Descriptors::Histogram(vec![vec![10, 0, 0], vec![0, 0, 200]]);
        let current = Descriptors::Histogram(vec![vec![0, 0, 0], vec![11, 0, 0], vec![0, 90, 0]]);
        let (kp_prev, kp_cur) = (keypoints(2), keypoints(3));

        let matches = match_descriptors(
            (&kp_prev, &previous),
            (&kp_cur, &current),
            DescriptorCategory::Float,
            &MatchConfig::default(),
        )
        .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].previous, matches[0].current), (0, 1));
        approx::assert_relative_eq!(matches[0].distance, 1.0);
    }

    #[test]
    fn histograms_cannot_be_matched_as_binary() {
        let histograms = Descriptors::Histogram(vec![vec![1; 4], vec![2; 4]]);
        let kp = keypoints(2);

        let err = match_descriptors(
            (&kp, &histograms),
            (&kp, &histograms),
            DescriptorCategory::Binary,
            &MatchConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CapabilityError::CategoryMismatch { .. }));
    }
}
