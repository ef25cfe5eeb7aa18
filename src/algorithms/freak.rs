//! FREAK: retina inspired sampling pattern, coarse to fine pair comparisons.

use std::f32::consts::{PI, TAU};

use image::GrayImage;
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use super::{retain_within_border, sample, to_matrix};
use crate::{
    error::CapabilityError,
    features::{descriptor::pack_bits, Descriptors, Keypoint},
};

const POINTS_PER_RING: usize = 6;
const PATTERN_SCALE: f32 = 22.0;
const BIG_RADIUS: f32 = 2.0 / 3.0;
const SMALL_RADIUS: f32 = 2.0 / 24.0;
const UNIT_SPACE: f32 = (BIG_RADIUS - SMALL_RADIUS) / 21.0;
const RING_RADII: [f32; 7] = [
    BIG_RADIUS,
    BIG_RADIUS - 6.0 * UNIT_SPACE,
    BIG_RADIUS - 11.0 * UNIT_SPACE,
    BIG_RADIUS - 15.0 * UNIT_SPACE,
    BIG_RADIUS - 18.0 * UNIT_SPACE,
    BIG_RADIUS - 20.0 * UNIT_SPACE,
    SMALL_RADIUS,
];
/// Keypoint diameter the pattern is laid out for
const BASE_SIZE: f32 = 12.0;
const DESCRIPTOR_BITS: usize = 512;

pub fn describe(
    keypoints: &mut Vec<Keypoint>,
    image: &GrayImage,
) -> Result<Descriptors, CapabilityError> {
    let smoothed = to_matrix(&imageproc::filter::gaussian_blur_f32(image, 1.0), 1.0);
    retain_within_border(keypoints, image.width(), image.height(), |kp| {
        BIG_RADIUS * PATTERN_SCALE * pattern_scale(kp) + 1.0
    });

    let descriptors = keypoints
        .iter_mut()
        .map(|kp| {
            let scale = pattern_scale(kp) * PATTERN_SCALE;
            let (x, y) = (kp.x(), kp.y());
            let intensities_at = |angle: f32| {
                let (sin, cos) = angle.sin_cos();
                PATTERN
                    .points
                    .iter()
                    .map(|&(px, py)| {
                        sample(
                            &smoothed,
                            x + scale * (cos * px - sin * py),
                            y + scale * (sin * px + cos * py),
                        )
                    })
                    .collect::<Vec<f32>>()
            };

            let upright = intensities_at(0.0);
            let (mut gx, mut gy) = (0.0, 0.0);
            for &(i, j) in &PATTERN.orientation_pairs {
                let (pi, pj) = (PATTERN.points[i], PATTERN.points[j]);
                let (dx, dy) = (pi.0 - pj.0, pi.1 - pj.1);
                let norm = (dx * dx + dy * dy).sqrt();
                let delta = upright[i] - upright[j];
                gx += delta * dx / norm;
                gy += delta * dy / norm;
            }
            let angle = gy.atan2(gx);
            kp.angle = Some(angle);

            let rotated = intensities_at(angle);
            pack_bits(
                PATTERN
                    .pairs
                    .iter()
                    .map(|&(i, j)| rotated[i] > rotated[j]),
            )
        })
        .collect();

    Ok(Descriptors::Binary(descriptors))
}

fn pattern_scale(kp: &Keypoint) -> f32 {
    (kp.size / BASE_SIZE).max(0.5)
}

struct Pattern {
    points: Vec<(f32, f32)>,
    pairs: Vec<(usize, usize)>,
    orientation_pairs: Vec<(usize, usize)>,
}

static PATTERN: Lazy<Pattern> = Lazy::new(|| {
    let mut points: Vec<(f32, f32)> = RING_RADII
        .iter()
        .enumerate()
        .flat_map(|(ring, &radius)| {
            let offset = if ring % 2 == 0 { 0.0 } else { PI / POINTS_PER_RING as f32 };
            (0..POINTS_PER_RING).map(move |k| {
                let theta = offset + TAU * k as f32 / POINTS_PER_RING as f32;
                (radius * theta.cos(), radius * theta.sin())
            })
        })
        .collect();
    points.push((0.0, 0.0));

    // pairs are fixed by a reproducible shuffle so every run shares them
    let mut pairs: Vec<(usize, usize)> = (0..points.len())
        .flat_map(|i| (0..i).map(move |j| (i, j)))
        .collect();
    pairs.shuffle(&mut StdRng::seed_from_u64(42));
    pairs.truncate(DESCRIPTOR_BITS);

    // diametrically opposed points within every ring
    let orientation_pairs = (0..RING_RADII.len())
        .flat_map(|ring| {
            let base = ring * POINTS_PER_RING;
            (0..POINTS_PER_RING / 2).map(move |k| (base + k, base + k + POINTS_PER_RING / 2))
        })
        .collect();

    Pattern {
        points,
        pairs,
        orientation_pairs,
    }
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{corners::detect_fast, test_images::squares};

    #[test]
    fn pattern_layout() {
        assert_eq!(PATTERN.points.len(), 43);
        assert_eq!(PATTERN.pairs.len(), DESCRIPTOR_BITS);
        assert_eq!(PATTERN.orientation_pairs.len(), 21);
    }

    #[test]
    fn describes_fast_keypoints() {
        let image = squares(200, 160, (0, 0));
        let mut keypoints = detect_fast(&image).unwrap();
        let detected = keypoints.len();

        let descriptors = describe(&mut keypoints, &image).unwrap();
        assert!(keypoints.len() <= detected);
        assert_eq!(descriptors.len(), keypoints.len());
    }
}
