//! ORB: oriented FAST keypoints with steered BRIEF descriptors.

use image::GrayImage;
use nalgebra::DMatrix;

use super::{brief, fast_corners, pyramid, retain_within_border, sobel, to_matrix};
use crate::{
    error::CapabilityError,
    features::{Descriptors, Keypoint},
};

const LEVELS: usize = 8;
const SCALE_FACTOR: f32 = 1.2;
const MAX_FEATURES: usize = 500;
const FAST_THRESHOLD: u8 = 20;
const PATCH_SIZE: f32 = 31.0;
/// Patch radius for the intensity centroid
const CENTROID_RADIUS: i32 = 15;
const HARRIS_K: f32 = 0.04;
const HARRIS_BLOCK_RADIUS: usize = 3;

pub fn detect(image: &GrayImage) -> Result<Vec<Keypoint>, CapabilityError> {
    let mut keypoints = Vec::new();

    for (level, (scale, level_image)) in pyramid(image, LEVELS, SCALE_FACTOR, PATCH_SIZE as u32)
        .into_iter()
        .enumerate()
    {
        let (gx, gy) = sobel(&level_image);
        let intensities = to_matrix(&level_image, 1.0);
        let border = CENTROID_RADIUS as u32 + 1;
        let (w, h) = level_image.dimensions();

        for (x, y, _) in fast_corners(&level_image, FAST_THRESHOLD) {
            if x < border || y < border || x + border >= w || y + border >= h {
                continue;
            }
            let (x, y) = (x as usize, y as usize);

            keypoints.push(
                Keypoint::new(x as f32 * scale, y as f32 * scale, PATCH_SIZE * scale)
                    .with_response(harris_score(&gx, &gy, x, y))
                    .with_angle(intensity_centroid_angle(&intensities, x, y))
                    .with_octave(level),
            );
        }
    }

    // retain the strongest, ties keep detection order
    keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));
    keypoints.truncate(MAX_FEATURES);

    Ok(keypoints)
}

/// Steered BRIEF sampled on the pyramid level the keypoint was detected on.
pub fn describe(
    keypoints: &mut Vec<Keypoint>,
    image: &GrayImage,
) -> Result<Descriptors, CapabilityError> {
    let levels: Vec<(f32, GrayImage)> = pyramid(image, LEVELS, SCALE_FACTOR, PATCH_SIZE as u32)
        .into_iter()
        .map(|(scale, level)| (scale, brief::smooth(&level)))
        .collect();

    // rotated test pairs reach out to the patch diagonal
    let reach = brief::HALF_PATCH as f32 * std::f32::consts::SQRT_2 + 1.0;
    retain_within_border(keypoints, image.width(), image.height(), |kp| {
        reach * level_scale(kp, levels.len())
    });

    Ok(Descriptors::Binary(
        keypoints
            .iter()
            .map(|kp| {
                let level = kp.octave.unwrap_or(0).min(levels.len() - 1);
                let (scale, smoothed) = &levels[level];
                brief::compute_descriptor(kp.x() / scale, kp.y() / scale, kp.angle, smoothed)
            })
            .collect(),
    ))
}

fn level_scale(kp: &Keypoint, levels: usize) -> f32 {
    SCALE_FACTOR.powi(kp.octave.unwrap_or(0).min(levels - 1) as i32)
}

/// Harris corner measure accumulated over a `7 x 7` block
fn harris_score(gx: &DMatrix<f32>, gy: &DMatrix<f32>, x: usize, y: usize) -> f32 {
    let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
    let r = HARRIS_BLOCK_RADIUS;
    for yy in y - r..=y + r {
        for xx in x - r..=x + r {
            let (ix, iy) = (gx[(yy, xx)], gy[(yy, xx)]);
            a += ix * ix;
            b += iy * iy;
            c += ix * iy;
        }
    }
    a * b - c * c - HARRIS_K * (a + b) * (a + b)
}

/// Orientation from the intensity centroid of a circular patch
fn intensity_centroid_angle(intensities: &DMatrix<f32>, x: usize, y: usize) -> f32 {
    let (mut m01, mut m10) = (0.0, 0.0);
    for dy in -CENTROID_RADIUS..=CENTROID_RADIUS {
        for dx in -CENTROID_RADIUS..=CENTROID_RADIUS {
            if dx * dx + dy * dy > CENTROID_RADIUS * CENTROID_RADIUS {
                continue;
            }
            let value = intensities[((y as i32 + dy) as usize, (x as i32 + dx) as usize)];
            m10 += dx as f32 * value;
            m01 += dy as f32 * value;
        }
    }
    m01.atan2(m10)
}
