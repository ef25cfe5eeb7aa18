use image::{GenericImageView, GrayImage};
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use super::retain_within_border;
use crate::{
    error::CapabilityError,
    features::{descriptor::pack_bits, BinaryDescriptor, Descriptors, Keypoint},
};

/// Number of intensity tests, giving a 32 byte descriptor
const TESTS: usize = 256;
/// Test locations are confined to a `31 x 31` patch around the keypoint
pub(crate) const HALF_PATCH: i16 = 15;

/// BRIEF (Binary Robust Independent Elementary Features) for every describable keypoint.
pub fn describe(
    keypoints: &mut Vec<Keypoint>,
    image: &GrayImage,
) -> Result<Descriptors, CapabilityError> {
    let smoothed = smooth(image);

    retain_within_border(keypoints, image.width(), image.height(), |_| {
        (HALF_PATCH + 1) as f32
    });

    Ok(Descriptors::Binary(
        keypoints
            .iter()
            .map(|kp| compute_descriptor(kp.x(), kp.y(), None, &smoothed))
            .collect(),
    ))
}

/// Applies a gaussian blur to the image for computing BRIEF descriptors,
/// that way the image is not overly sensitive to high frequency noise.
pub(crate) fn smooth(image: &GrayImage) -> GrayImage {
    // using a kernel value of 2 indicated by reference:
    // https://medium.com/data-breach/introduction-to-brief-binary-robust-independent-elementary-features-436f4a31a0e6
    const GAUSSIAN_KERNEL_SIGMA: f32 = 2.0;

    imageproc::filter::gaussian_blur_f32(image, GAUSSIAN_KERNEL_SIGMA)
}

/// Compute BRIEF on a smoothed grayscale image at the target keypoint.
/// With an `angle` the test pattern is steered along the keypoint orientation.
pub(crate) fn compute_descriptor(
    x: f32,
    y: f32,
    angle: Option<f32>,
    image: &GrayImage,
) -> BinaryDescriptor {
    let (sin, cos) = angle.unwrap_or(0.0).sin_cos();
    let locate = |px: i16, py: i16| {
        let (px, py) = (px as f32, py as f32);
        (
            (x + cos * px - sin * py).round() as i32,
            (y + sin * px + cos * py).round() as i32,
        )
    };

    pack_bits(BRIEF_SAMPLES.iter().map(|&[p1x, p1y, p2x, p2y]| {
        let first = intensity(image, locate(p1x, p1y));
        let second = intensity(image, locate(p2x, p2y));
        first > second
    }))
}

/// When the bounds are not satisfied we use 0 as the intensity of the pixel in question.
fn intensity(image: &GrayImage, (x, y): (i32, i32)) -> u8 {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        // UNSAFETY JUSTIFICATION
        //  the coordinate pair has its bounds checked right above
        unsafe { image.unsafe_get_pixel(x as u32, y as u32).0[0] }
    } else {
        0
    }
}

/// Precomputed point pairs for the BRIEF intensity tests.
/// The values remain consistent accross frames, because we want to achieve a similar
/// level of entropy to best match our previous encounters with points.
static BRIEF_SAMPLES: Lazy<[[i16; 4]; TESTS]> = Lazy::new(|| {
    // use reproducible random numbers so that every run shares the pattern
    let mut rng = StdRng::seed_from_u64(42);

    // isotropic gaussian with sigma^2 = S^2 / 25 for a patch of side S
    let normal_dist: Normal<f64> = Normal::new(0.0, (2 * HALF_PATCH + 1) as f64 / 5.0)
        .expect("standard deviation is positive");

    let mut draw = || (normal_dist.sample(&mut rng).round() as i16).clamp(-HALF_PATCH, HALF_PATCH);

    let mut samples = [[0; 4]; TESTS];
    for sample in samples.iter_mut() {
        *sample = [draw(), draw(), draw(), draw()];
    }

    samples
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_images::squares;

    #[test]
    fn border_keypoints_are_dropped() {
        let image = squares(120, 80, (0, 0));
        let mut keypoints = vec![
            Keypoint::new(5.0, 40.0, 7.0),
            Keypoint::new(60.0, 40.0, 7.0),
            Keypoint::new(60.0, 79.0, 7.0),
        ];

        let descriptors = describe(&mut keypoints, &image).unwrap();
        assert_eq!(keypoints, vec![Keypoint::new(60.0, 40.0, 7.0)]);
        assert_eq!(descriptors.len(), 1);
    }

    #[test]
    fn pattern_is_reproducible_and_bounded() {
        assert!(BRIEF_SAMPLES
            .iter()
            .flatten()
            .all(|v| v.abs() <= HALF_PATCH));
        // only the first 256 bits may be set
        let image = squares(120, 80, (0, 0));
        let d = compute_descriptor(52.0, 52.0, None, &smooth(&image));
        assert!(d[TESTS / 8..].iter().all(|&b| b == 0));
        assert_eq!(d, compute_descriptor(52.0, 52.0, None, &smooth(&image)));
    }

    #[test]
    fn shifted_content_keeps_descriptor() {
        let a = smooth(&squares(160, 120, (0, 0)));
        let b = smooth(&squares(160, 120, (3, 2)));
        // same scene point: (52, 52) in `a` moves to (55, 54) in `b`
        assert_eq!(
            compute_descriptor(52.0, 52.0, None, &a),
            compute_descriptor(55.0, 54.0, None, &b)
        );
    }
}
