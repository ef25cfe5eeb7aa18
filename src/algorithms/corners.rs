//! Gradient based corner detectors (Shi-Tomasi, Harris) and plain FAST.

use image::GrayImage;
use nalgebra::DMatrix;

use super::{box_sum, fast_corners, local_maxima, sobel};
use crate::{error::CapabilityError, features::Keypoint};

/// Windowed structure tensor entries `(sum Ix^2, sum Iy^2, sum IxIy)`
fn structure_tensor(
    image: &GrayImage,
    block_radius: usize,
) -> (DMatrix<f32>, DMatrix<f32>, DMatrix<f32>) {
    let (gx, gy) = sobel(image);
    (
        box_sum(&gx.component_mul(&gx), block_radius),
        box_sum(&gy.component_mul(&gy), block_radius),
        box_sum(&gx.component_mul(&gy), block_radius),
    )
}

/// Good-features-to-track corners: minimum eigenvalue of the structure tensor.
///
/// Corners come back sorted by descending quality, with an empty response field.
pub fn detect_shi_tomasi(image: &GrayImage) -> Result<Vec<Keypoint>, CapabilityError> {
    const BLOCK_SIZE: usize = 4;
    const QUALITY_LEVEL: f32 = 0.01;
    const MIN_DISTANCE: f32 = BLOCK_SIZE as f32;

    let (ixx, iyy, ixy) = structure_tensor(image, BLOCK_SIZE / 2);
    let min_eigen = DMatrix::from_fn(ixx.nrows(), ixx.ncols(), |r, c| {
        let (a, b, d) = (ixx[(r, c)], ixy[(r, c)], iyy[(r, c)]);
        let half_trace = (a + d) / 2.0;
        half_trace - (((a - d) / 2.0).powi(2) + b * b).sqrt()
    });

    let threshold = min_eigen.max() * QUALITY_LEVEL;
    let mut candidates = local_maxima(&min_eigen, 1, threshold.max(f32::EPSILON));
    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

    let max_corners = (image.width() * image.height()) as usize / (BLOCK_SIZE * BLOCK_SIZE);
    let mut accepted: Vec<Keypoint> = Vec::new();
    for (x, y, _) in candidates {
        if accepted.len() >= max_corners {
            break;
        }
        let (x, y) = (x as f32, y as f32);
        let crowded = accepted
            .iter()
            .any(|kp| (kp.x() - x).powi(2) + (kp.y() - y).powi(2) < MIN_DISTANCE * MIN_DISTANCE);
        if !crowded {
            accepted.push(Keypoint::new(x, y, BLOCK_SIZE as f32));
        }
    }

    Ok(accepted)
}

/// Harris corners, with the response normalized into `0..=255`
pub fn detect_harris(image: &GrayImage) -> Result<Vec<Keypoint>, CapabilityError> {
    const BLOCK_SIZE: usize = 2;
    const APERTURE_SIZE: f32 = 3.0;
    const K: f32 = 0.04;
    const MIN_RESPONSE: f32 = 100.0;

    let (ixx, iyy, ixy) = structure_tensor(image, BLOCK_SIZE / 2);
    let response = DMatrix::from_fn(ixx.nrows(), ixx.ncols(), |r, c| {
        let (a, b, d) = (ixx[(r, c)], ixy[(r, c)], iyy[(r, c)]);
        a * d - b * b - K * (a + d).powi(2)
    });

    let (min, max) = (response.min(), response.max());
    if max <= min {
        return Ok(Vec::new());
    }
    let normalized = response.map(|v| (v - min) / (max - min) * 255.0);

    // suppress within the keypoint footprint, so kept corners never overlap
    let radius = APERTURE_SIZE as usize;
    Ok(local_maxima(&normalized, radius, MIN_RESPONSE)
        .into_iter()
        .map(|(x, y, value)| {
            Keypoint::new(x as f32, y as f32, 2.0 * APERTURE_SIZE).with_response(value)
        })
        .collect())
}

/// Uses FAST (Features from Accelerated Segment Test)
/// as a keypoint detector for features like corners in a grayscale image
pub fn detect_fast(image: &GrayImage) -> Result<Vec<Keypoint>, CapabilityError> {
    const FAST_CORNERS_THESHOLD: u8 = 30;
    const KEYPOINT_DIAMETER: f32 = 7.0;

    Ok(fast_corners(image, FAST_CORNERS_THESHOLD)
        .into_iter()
        .map(|(x, y, score)| {
            Keypoint::new(x as f32, y as f32, KEYPOINT_DIAMETER).with_response(score)
        })
        .collect())
}
