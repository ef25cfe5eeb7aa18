//! BRISK: scale-space FAST keypoints with a concentric ring sampling pattern.

use std::f32::consts::TAU;

use image::GrayImage;
use once_cell::sync::Lazy;

use super::{fast_corners, pyramid, retain_within_border, sample, to_matrix};
use crate::{
    error::CapabilityError,
    features::{descriptor::pack_bits, Descriptors, Keypoint},
};

const OCTAVES: usize = 4;
const FAST_THRESHOLD: u8 = 30;
/// Keypoint diameter at octave 0
const BASE_SIZE: f32 = 12.0;
const SMOOTHING_SIGMA: f32 = 1.2;

/// `(radius, point count)` of every ring, innermost first
const RINGS: [(f32, usize); 5] = [(0.0, 1), (2.9, 10), (4.9, 14), (7.4, 15), (10.8, 20)];
const SHORT_PAIR_MAX: f32 = 9.75;
const LONG_PAIR_MIN: f32 = 13.67;

pub fn detect(image: &GrayImage) -> Result<Vec<Keypoint>, CapabilityError> {
    let mut keypoints = Vec::new();

    for (octave, (scale, level)) in pyramid(image, OCTAVES, 2.0, 16).into_iter().enumerate() {
        keypoints.extend(
            fast_corners(&level, FAST_THRESHOLD)
                .into_iter()
                .map(|(x, y, score)| {
                    Keypoint::new(x as f32 * scale, y as f32 * scale, BASE_SIZE * scale)
                        .with_response(score)
                        .with_octave(octave)
                }),
        );
    }

    Ok(keypoints)
}

pub fn describe(
    keypoints: &mut Vec<Keypoint>,
    image: &GrayImage,
) -> Result<Descriptors, CapabilityError> {
    let smoothed = to_matrix(
        &imageproc::filter::gaussian_blur_f32(image, SMOOTHING_SIGMA),
        1.0,
    );
    let outer_radius = RINGS[RINGS.len() - 1].0;
    retain_within_border(keypoints, image.width(), image.height(), |kp| {
        outer_radius * pattern_scale(kp) + 1.0
    });

    let descriptors = keypoints
        .iter_mut()
        .map(|kp| {
            let scale = pattern_scale(kp);
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

            // local gradient over the long distance pairs gives the orientation
            let upright = intensities_at(0.0);
            let (mut gx, mut gy) = (0.0, 0.0);
            for &(i, j) in &PATTERN.long_pairs {
                let (pi, pj) = (PATTERN.points[i], PATTERN.points[j]);
                let (dx, dy) = (pj.0 - pi.0, pj.1 - pi.1);
                let weight = (upright[j] - upright[i]) / (dx * dx + dy * dy);
                gx += weight * dx;
                gy += weight * dy;
            }
            let angle = gy.atan2(gx);
            kp.angle = Some(angle);

            let rotated = intensities_at(angle);
            pack_bits(
                PATTERN
                    .short_pairs
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
    short_pairs: Vec<(usize, usize)>,
    long_pairs: Vec<(usize, usize)>,
}

static PATTERN: Lazy<Pattern> = Lazy::new(|| {
    let points: Vec<(f32, f32)> = RINGS
        .iter()
        .enumerate()
        .flat_map(|(ring, &(radius, count))| {
            // alternate rings are rotated by half a step
            let offset = if ring % 2 == 0 { 0.0 } else { TAU / (2 * count) as f32 };
            (0..count).map(move |k| {
                let theta = offset + TAU * k as f32 / count as f32;
                (radius * theta.cos(), radius * theta.sin())
            })
        })
        .collect();

    let mut short_pairs = Vec::new();
    let mut long_pairs = Vec::new();
    for i in 0..points.len() {
        for j in 0..i {
            let (dx, dy) = (points[i].0 - points[j].0, points[i].1 - points[j].1);
            let distance = (dx * dx + dy * dy).sqrt();
            if distance < SHORT_PAIR_MAX {
                short_pairs.push((i, j));
            } else if distance > LONG_PAIR_MIN {
                long_pairs.push((i, j));
            }
        }
    }

    Pattern {
        points,
        short_pairs,
        long_pairs,
    }
});
