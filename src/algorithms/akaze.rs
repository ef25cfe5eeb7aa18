//! AKAZE style features on a Gaussian scale space.
//!
//! The detector keeps determinant-of-Hessian extrema and tags every keypoint with the
//! evolution layer it was found on. The M-LDB style descriptor samples that very layer,
//! so it refuses keypoints coming from any other detector.

use image::{imageops, GrayImage};
use nalgebra::DMatrix;

use super::{local_maxima, retain_within_border, sample, to_matrix};
use crate::{
    error::CapabilityError,
    features::{descriptor::pack_bits, DescriptorKind, Descriptors, Keypoint},
};

const OCTAVES: usize = 4;
const SUBLEVELS: usize = 4;
const BASE_SIGMA: f32 = 1.6;
const DETECTOR_THRESHOLD: f32 = 0.001;
/// Descriptor patch half width, in multiples of the layer sigma
const PATCH_RADIUS: f32 = 6.0;
const GRIDS: [usize; 3] = [2, 3, 4];
/// Samples per cell side when averaging a grid cell
const CELL_SAMPLES: usize = 4;

struct Layer {
    octave: usize,
    /// Factor from layer to image coordinates
    scale: f32,
    /// Smoothing in image coordinates
    sigma: f32,
    smoothed: DMatrix<f32>,
}

impl Layer {
    /// Sigma expressed in layer pixels
    fn relative_sigma(&self) -> f32 {
        self.sigma / self.scale
    }
}

fn scale_space(image: &GrayImage) -> Vec<Layer> {
    let mut layers = Vec::new();

    for octave in 0..OCTAVES {
        let scale = (1 << octave) as f32;
        let (width, height) = (image.width() >> octave, image.height() >> octave);
        if width < 32 || height < 32 {
            break;
        }
        let base = if octave == 0 {
            image.clone()
        } else {
            imageops::resize(image, width, height, imageops::FilterType::Triangle)
        };

        for sublevel in 0..SUBLEVELS {
            let sigma = BASE_SIGMA * 2f32.powf(octave as f32 + sublevel as f32 / SUBLEVELS as f32);
            let blurred = imageproc::filter::gaussian_blur_f32(&base, sigma / scale);
            layers.push(Layer {
                octave,
                scale,
                sigma,
                smoothed: to_matrix(&blurred, 1.0 / 255.0),
            });
        }
    }

    layers
}

/// Scale normalized determinant of the Hessian
fn hessian_response(layer: &Layer) -> DMatrix<f32> {
    let l = &layer.smoothed;
    let (rows, cols) = l.shape();
    let normalization = layer.relative_sigma().powi(4);

    DMatrix::from_fn(rows, cols, |r, c| {
        if r == 0 || c == 0 || r + 1 == rows || c + 1 == cols {
            return 0.0;
        }
        let lxx = l[(r, c + 1)] - 2.0 * l[(r, c)] + l[(r, c - 1)];
        let lyy = l[(r + 1, c)] - 2.0 * l[(r, c)] + l[(r - 1, c)];
        let lxy =
            (l[(r + 1, c + 1)] - l[(r + 1, c - 1)] - l[(r - 1, c + 1)] + l[(r - 1, c - 1)]) / 4.0;
        (lxx * lyy - lxy * lxy) * normalization
    })
}

/// Dominant direction of the weighted gradient sum around `(x, y)`, in layer coordinates
fn dominant_orientation(layer: &Layer, x: f32, y: f32) -> f32 {
    let sigma = layer.relative_sigma();
    let radius = (PATCH_RADIUS * sigma).round() as i32;
    let step = (sigma.round() as i32).max(1);
    let l = &layer.smoothed;

    let (mut gx, mut gy) = (0.0, 0.0);
    for dy in (-radius..=radius).step_by(step as usize) {
        for dx in (-radius..=radius).step_by(step as usize) {
            let d2 = (dx * dx + dy * dy) as f32;
            if d2 > (radius * radius) as f32 {
                continue;
            }
            let weight = (-d2 / (2.0 * (2.5 * sigma).powi(2))).exp();
            let (px, py) = (x + dx as f32, y + dy as f32);
            gx += weight * (sample(l, px + 1.0, py) - sample(l, px - 1.0, py));
            gy += weight * (sample(l, px, py + 1.0) - sample(l, px, py - 1.0));
        }
    }
    gy.atan2(gx)
}

pub fn detect(image: &GrayImage) -> Result<Vec<Keypoint>, CapabilityError> {
    let layers = scale_space(image);
    let responses: Vec<DMatrix<f32>> = layers.iter().map(hessian_response).collect();
    let mut keypoints = Vec::new();

    for (index, (layer, response)) in layers.iter().zip(&responses).enumerate() {
        let same_octave = |i: usize| layers.get(i).filter(|other| other.octave == layer.octave);
        let below = index.checked_sub(1).and_then(same_octave).map(|_| &responses[index - 1]);
        let above = same_octave(index + 1).map(|_| &responses[index + 1]);

        let margin = (layer.relative_sigma() * 2.0).ceil() as usize;
        let (rows, cols) = response.shape();

        for (c, r, value) in local_maxima(response, 1, DETECTOR_THRESHOLD) {
            if r < margin || c < margin || r + margin >= rows || c + margin >= cols {
                continue;
            }
            if below.map_or(false, |b| b[(r, c)] >= value)
                || above.map_or(false, |a| a[(r, c)] >= value)
            {
                continue;
            }

            let angle = dominant_orientation(layer, c as f32, r as f32);
            let (x, y) = (c as f32 * layer.scale, r as f32 * layer.scale);
            let mut keypoint = Keypoint::new(x, y, 3.0 * layer.sigma)
                .with_response(value)
                .with_angle(angle)
                .with_octave(layer.octave);
            keypoint.layer = Some(index);
            keypoints.push(keypoint);
        }
    }

    Ok(keypoints)
}

pub fn describe(
    keypoints: &mut Vec<Keypoint>,
    image: &GrayImage,
) -> Result<Descriptors, CapabilityError> {
    let layers = scale_space(image);
    let incompatible = CapabilityError::IncompatibleKeypoints {
        descriptor: DescriptorKind::Akaze,
        required: "an AKAZE scale-space layer",
    };
    if keypoints
        .iter()
        .any(|kp| kp.layer.map_or(true, |layer| layer >= layers.len()))
    {
        return Err(incompatible);
    }

    retain_within_border(keypoints, image.width(), image.height(), |kp| {
        let layer = &layers[kp.layer.unwrap_or_default()];
        (PATCH_RADIUS * layer.relative_sigma() * std::f32::consts::SQRT_2 + 1.0) * layer.scale
    });

    Ok(Descriptors::Binary(
        keypoints
            .iter()
            .map(|kp| {
                let layer = &layers[kp.layer.unwrap_or_default()];
                let (x, y) = (kp.x() / layer.scale, kp.y() / layer.scale);
                mldb(layer, x, y, kp.angle.unwrap_or(0.0))
            })
            .collect(),
    ))
}

/// Binary comparisons of mean intensity and mean derivatives between all cells of
/// `2x2`, `3x3` and `4x4` grids laid over the rotated patch
fn mldb(layer: &Layer, x: f32, y: f32, angle: f32) -> crate::features::BinaryDescriptor {
    let half = PATCH_RADIUS * layer.relative_sigma();
    let (sin, cos) = angle.sin_cos();
    let at = |u: f32, v: f32| {
        sample(
            &layer.smoothed,
            x + cos * u - sin * v,
            y + sin * u + cos * v,
        )
    };

    let mut bits = Vec::new();
    for n in GRIDS {
        let cell = 2.0 * half / n as f32;
        let mut cells = Vec::with_capacity(n * n);

        for i in 0..n {
            for j in 0..n {
                let mut values = [[0.0f32; CELL_SAMPLES]; CELL_SAMPLES];
                for (b, row) in values.iter_mut().enumerate() {
                    for (a, value) in row.iter_mut().enumerate() {
                        let u = -half + (j as f32 + (a as f32 + 0.5) / CELL_SAMPLES as f32) * cell;
                        let v = -half + (i as f32 + (b as f32 + 0.5) / CELL_SAMPLES as f32) * cell;
                        *value = at(u, v);
                    }
                }

                let h = CELL_SAMPLES / 2;
                let mean = |rows: std::ops::Range<usize>, cols: std::ops::Range<usize>| {
                    let count = (rows.len() * cols.len()) as f32;
                    rows.flat_map(|b| cols.clone().map(move |a| (b, a)))
                        .map(|(b, a)| values[b][a])
                        .sum::<f32>()
                        / count
                };
                let intensity = mean(0..CELL_SAMPLES, 0..CELL_SAMPLES);
                let dx = mean(0..CELL_SAMPLES, h..CELL_SAMPLES) - mean(0..CELL_SAMPLES, 0..h);
                let dy = mean(h..CELL_SAMPLES, 0..CELL_SAMPLES) - mean(0..h, 0..CELL_SAMPLES);
                cells.push([intensity, dx, dy]);
            }
        }

        for p in 0..cells.len() {
            for q in p + 1..cells.len() {
                for channel in 0..3 {
                    bits.push(cells[p][channel] > cells[q][channel]);
                }
            }
        }
    }

    pack_bits(bits)
}
