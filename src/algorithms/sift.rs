//! SIFT: difference of Gaussian extrema and gradient orientation histograms.
//!
//! Descriptors are 128 bin histograms quantized to bytes. They are floating point
//! descriptors as far as matching is concerned.

use std::f32::consts::TAU;

use image::{imageops, GrayImage};
use nalgebra::DMatrix;

use super::{sobel, to_matrix};
use crate::{
    error::CapabilityError,
    features::{Descriptors, Keypoint},
};

const INTERVALS: usize = 3;
const SIGMA: f32 = 1.6;
const CONTRAST_THRESHOLD: f32 = 0.04;
const EDGE_RATIO: f32 = 10.0;
const MIN_OCTAVE_SIDE: u32 = 16;
const MAX_OCTAVES: u32 = 8;
/// Pixels kept clear of the octave border during extremum search
const SEARCH_BORDER: usize = 5;

const ORIENTATION_BINS: usize = 36;
const ORIENTATION_PEAK_RATIO: f32 = 0.8;

/// Spatial cells per side of the descriptor window
const WIDTH: usize = 4;
const DESCRIPTOR_BINS: usize = 8;
/// Cell side in multiples of the keypoint sigma
const CELL_SCALE: f32 = 3.0;
const MAGNITUDE_CLAMP: f32 = 0.2;
pub const DESCRIPTOR_LENGTH: usize = WIDTH * WIDTH * DESCRIPTOR_BINS;

struct Octave {
    scale: f32,
    gaussians: Vec<DMatrix<f32>>,
    dogs: Vec<DMatrix<f32>>,
}

fn octaves(image: &GrayImage) -> Vec<Octave> {
    let mut octaves = Vec::new();

    for octave in 0..MAX_OCTAVES {
        let (width, height) = (image.width() >> octave, image.height() >> octave);
        if width < MIN_OCTAVE_SIDE || height < MIN_OCTAVE_SIDE {
            break;
        }
        let base = if octave == 0 {
            image.clone()
        } else {
            imageops::resize(image, width, height, imageops::FilterType::Triangle)
        };

        let gaussians: Vec<DMatrix<f32>> = (0..INTERVALS + 3)
            .map(|i| {
                let blurred = imageproc::filter::gaussian_blur_f32(&base, interval_sigma(i));
                to_matrix(&blurred, 1.0 / 255.0)
            })
            .collect();
        let dogs = gaussians.windows(2).map(|pair| &pair[1] - &pair[0]).collect();

        octaves.push(Octave {
            scale: (1 << octave) as f32,
            gaussians,
            dogs,
        });
    }

    octaves
}

/// Smoothing of interval `i` relative to its octave
fn interval_sigma(i: usize) -> f32 {
    SIGMA * 2f32.powf(i as f32 / INTERVALS as f32)
}

fn is_extremum(dogs: &[DMatrix<f32>], i: usize, r: usize, c: usize) -> bool {
    let value = dogs[i][(r, c)];
    let neighbours = (i - 1..=i + 1).flat_map(|layer| {
        (r - 1..=r + 1).flat_map(move |rr| (c - 1..=c + 1).map(move |cc| (layer, rr, cc)))
    });

    let mut greatest = true;
    let mut least = true;
    for (layer, rr, cc) in neighbours {
        if (layer, rr, cc) == (i, r, c) {
            continue;
        }
        let other = dogs[layer][(rr, cc)];
        greatest &= value >= other;
        least &= value <= other;
    }
    greatest || least
}

/// Rejects responses along edges by the principal curvature ratio
fn is_edge(dog: &DMatrix<f32>, r: usize, c: usize) -> bool {
    let v = dog[(r, c)];
    let dxx = dog[(r, c + 1)] + dog[(r, c - 1)] - 2.0 * v;
    let dyy = dog[(r + 1, c)] + dog[(r - 1, c)] - 2.0 * v;
    let dxy = (dog[(r + 1, c + 1)] - dog[(r + 1, c - 1)] - dog[(r - 1, c + 1)]
        + dog[(r - 1, c - 1)])
        / 4.0;

    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    det <= 0.0 || trace * trace * EDGE_RATIO >= (EDGE_RATIO + 1.0).powi(2) * det
}

/// Peaks of the gradient orientation histogram around `(r, c)`
fn orientations(gaussian: &DMatrix<f32>, r: usize, c: usize, sigma: f32) -> Vec<f32> {
    let (rows, cols) = gaussian.shape();
    let weight_sigma = 1.5 * sigma;
    let radius = (3.0 * weight_sigma).round() as i32;
    let mut histogram = [0.0f32; ORIENTATION_BINS];

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let (y, x) = (r as i32 + dy, c as i32 + dx);
            if y < 1 || x < 1 || y + 1 >= rows as i32 || x + 1 >= cols as i32 {
                continue;
            }
            let (y, x) = (y as usize, x as usize);
            let gx = gaussian[(y, x + 1)] - gaussian[(y, x - 1)];
            let gy = gaussian[(y + 1, x)] - gaussian[(y - 1, x)];
            let weight =
                (-((dx * dx + dy * dy) as f32) / (2.0 * weight_sigma * weight_sigma)).exp();

            let bin = (gy.atan2(gx).rem_euclid(TAU) / TAU * ORIENTATION_BINS as f32) as usize;
            histogram[bin % ORIENTATION_BINS] += weight * (gx * gx + gy * gy).sqrt();
        }
    }

    let max = histogram.iter().copied().fold(0.0, f32::max);
    if max <= 0.0 {
        return vec![0.0];
    }

    (0..ORIENTATION_BINS)
        .filter(|&bin| {
            let left = histogram[(bin + ORIENTATION_BINS - 1) % ORIENTATION_BINS];
            let right = histogram[(bin + 1) % ORIENTATION_BINS];
            let value = histogram[bin];
            value >= ORIENTATION_PEAK_RATIO * max && value > left && value >= right
        })
        .map(|bin| (bin as f32 + 0.5) * TAU / ORIENTATION_BINS as f32)
        .collect()
}

pub fn detect(image: &GrayImage) -> Result<Vec<Keypoint>, CapabilityError> {
    let threshold = 0.5 * CONTRAST_THRESHOLD / INTERVALS as f32;
    let mut keypoints = Vec::new();

    for (index, octave) in octaves(image).iter().enumerate() {
        let (rows, cols) = octave.dogs[0].shape();
        if rows <= 2 * SEARCH_BORDER || cols <= 2 * SEARCH_BORDER {
            continue;
        }

        for i in 1..=INTERVALS {
            let dog = &octave.dogs[i];
            for r in SEARCH_BORDER..rows - SEARCH_BORDER {
                for c in SEARCH_BORDER..cols - SEARCH_BORDER {
                    let value = dog[(r, c)];
                    if value.abs() <= threshold
                        || !is_extremum(&octave.dogs, i, r, c)
                        || is_edge(dog, r, c)
                    {
                        continue;
                    }

                    let sigma = interval_sigma(i);
                    // one keypoint per dominant orientation
                    for angle in orientations(&octave.gaussians[i], r, c, sigma) {
                        keypoints.push(
                            Keypoint::new(
                                c as f32 * octave.scale,
                                r as f32 * octave.scale,
                                2.0 * sigma * octave.scale,
                            )
                            .with_response(value.abs())
                            .with_angle(angle)
                            .with_octave(index),
                        );
                    }
                }
            }
        }
    }

    Ok(keypoints)
}

pub fn describe(
    keypoints: &mut Vec<Keypoint>,
    image: &GrayImage,
) -> Result<Descriptors, CapabilityError> {
    let (gx, gy) = sobel(&imageproc::filter::gaussian_blur_f32(image, 1.0));
    let magnitude = gx.zip_map(&gy, |x, y| (x * x + y * y).sqrt());
    let orientation = gx.zip_map(&gy, |x, y| y.atan2(x));

    Ok(Descriptors::Histogram(
        keypoints
            .iter()
            .map(|kp| histogram(&magnitude, &orientation, kp))
            .collect(),
    ))
}

fn histogram(magnitude: &DMatrix<f32>, orientation: &DMatrix<f32>, kp: &Keypoint) -> Vec<u8> {
    let (rows, cols) = magnitude.shape();
    let angle = kp.angle.unwrap_or(0.0);
    let (sin, cos) = angle.sin_cos();
    let cell = CELL_SCALE * (kp.size / 2.0).max(0.5);
    let radius = cell * std::f32::consts::SQRT_2 * (WIDTH + 1) as f32 / 2.0;
    let step = (cell / 4.0).max(1.0);
    let half_width = WIDTH as f32 / 2.0;

    let mut bins = [[[0.0f32; DESCRIPTOR_BINS]; WIDTH]; WIDTH];
    let steps = (2.0 * radius / step).floor() as i32;
    for iy in 0..=steps {
        let dy = -radius + iy as f32 * step;
        for ix in 0..=steps {
            let dx = -radius + ix as f32 * step;
            let (x, y) = ((kp.x() + dx).round(), (kp.y() + dy).round());
            if x < 0.0 || y < 0.0 || x >= cols as f32 || y >= rows as f32 {
                continue;
            }

            // offset in the rotated keypoint frame, in cell units
            let u = (cos * dx + sin * dy) / cell;
            let v = (-sin * dx + cos * dy) / cell;
            let (row_bin, col_bin) = (v + half_width - 0.5, u + half_width - 0.5);
            if row_bin <= -1.0
                || col_bin <= -1.0
                || row_bin >= WIDTH as f32
                || col_bin >= WIDTH as f32
            {
                continue;
            }

            let (px, py) = (x as usize, y as usize);
            let weight = (-(u * u + v * v) / (2.0 * half_width * half_width)).exp();
            let relative = (orientation[(py, px)] - angle).rem_euclid(TAU);
            let orientation_bin = relative / TAU * DESCRIPTOR_BINS as f32;
            accumulate(
                &mut bins,
                row_bin,
                col_bin,
                orientation_bin,
                weight * magnitude[(py, px)],
            );
        }
    }

    let mut values: Vec<f32> = bins.iter().flatten().flatten().copied().collect();
    normalize(&mut values);
    values.iter_mut().for_each(|v| *v = v.min(MAGNITUDE_CLAMP));
    normalize(&mut values);
    values
        .into_iter()
        .map(|v| (v * 512.0).round().min(255.0) as u8)
        .collect()
}

/// Trilinear distribution of one gradient sample over the neighbouring bins
fn accumulate(
    bins: &mut [[[f32; DESCRIPTOR_BINS]; WIDTH]; WIDTH],
    row_bin: f32,
    col_bin: f32,
    orientation_bin: f32,
    value: f32,
) {
    let (r0, c0, o0) = (row_bin.floor(), col_bin.floor(), orientation_bin.floor());
    let (dr, dc, dor) = (row_bin - r0, col_bin - c0, orientation_bin - o0);

    for (ri, rw) in [(r0 as i32, 1.0 - dr), (r0 as i32 + 1, dr)] {
        if ri < 0 || ri >= WIDTH as i32 {
            continue;
        }
        for (ci, cw) in [(c0 as i32, 1.0 - dc), (c0 as i32 + 1, dc)] {
            if ci < 0 || ci >= WIDTH as i32 {
                continue;
            }
            for (oi, ow) in [(o0 as usize, 1.0 - dor), (o0 as usize + 1, dor)] {
                bins[ri as usize][ci as usize][oi % DESCRIPTOR_BINS] += value * rw * cw * ow;
            }
        }
    }
}

fn normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        values.iter_mut().for_each(|v| *v /= norm);
    }
}
