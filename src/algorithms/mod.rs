//! Collection of keypoint detectors and descriptor extractors
//! backing the [`crate::features::NativeBackend`].
//!
//! These are compact versions of the published algorithms. They are deterministic
//! and fast enough for benchmarking the pipeline around them, but make no claim
//! of matching the reference implementations bit for bit.

use image::{imageops, GrayImage};
use imageproc::{
    corners::corners_fast9,
    gradients::{horizontal_sobel, vertical_sobel},
};
use nalgebra::DMatrix;

use crate::features::Keypoint;

pub mod akaze;
pub mod brief;
pub mod brisk;
pub mod corners;
pub mod freak;
pub mod orb;
pub mod sift;

/// Grayscale image as a `height x width` matrix of intensities.
/// `scale` is applied to every sample, e.g. `1.0 / 255.0` for unit range.
pub(crate) fn to_matrix(image: &GrayImage, scale: f32) -> DMatrix<f32> {
    DMatrix::from_fn(image.height() as usize, image.width() as usize, |r, c| {
        image.get_pixel(c as u32, r as u32)[0] as f32 * scale
    })
}

/// Horizontal and vertical Sobel responses
pub(crate) fn sobel(image: &GrayImage) -> (DMatrix<f32>, DMatrix<f32>) {
    let gx = horizontal_sobel(image);
    let gy = vertical_sobel(image);
    let (w, h) = (image.width() as usize, image.height() as usize);
    (
        DMatrix::from_fn(h, w, |r, c| gx.get_pixel(c as u32, r as u32)[0] as f32),
        DMatrix::from_fn(h, w, |r, c| gy.get_pixel(c as u32, r as u32)[0] as f32),
    )
}

/// Sum over a `(2 * radius + 1)` square window, clipped at the borders
pub(crate) fn box_sum(m: &DMatrix<f32>, radius: usize) -> DMatrix<f32> {
    let (rows, cols) = m.shape();

    // separable: horizontal pass, then vertical pass
    let horizontal: DMatrix<f32> = DMatrix::from_fn(rows, cols, |r, c| {
        let lo = c.saturating_sub(radius);
        let hi = (c + radius).min(cols - 1);
        (lo..=hi).map(|cc| m[(r, cc)]).sum::<f32>()
    });
    DMatrix::from_fn(rows, cols, |r, c| {
        let lo = r.saturating_sub(radius);
        let hi = (r + radius).min(rows - 1);
        (lo..=hi).map(|rr| horizontal[(rr, c)]).sum::<f32>()
    })
}

/// Strict local maxima above `threshold`, returned as `(x, y, value)` in raster order.
/// Plateaus resolve to their first pixel in raster order.
pub(crate) fn local_maxima(
    response: &DMatrix<f32>,
    radius: usize,
    threshold: f32,
) -> Vec<(usize, usize, f32)> {
    let (rows, cols) = response.shape();
    let mut maxima = Vec::new();

    for r in radius..rows.saturating_sub(radius) {
        for c in radius..cols.saturating_sub(radius) {
            let value = response[(r, c)];
            if value <= threshold {
                continue;
            }

            let is_max = (r - radius..=r + radius).all(|rr| {
                (c - radius..=c + radius).all(|cc| {
                    let other = response[(rr, cc)];
                    match (rr, cc).cmp(&(r, c)) {
                        std::cmp::Ordering::Less => value > other,
                        std::cmp::Ordering::Equal => true,
                        std::cmp::Ordering::Greater => value >= other,
                    }
                })
            });

            if is_max {
                maxima.push((c, r, value));
            }
        }
    }

    maxima
}

/// Bilinear interpolation, clamped to the matrix borders
pub(crate) fn sample(m: &DMatrix<f32>, x: f32, y: f32) -> f32 {
    let (rows, cols) = m.shape();
    let x = x.clamp(0.0, (cols - 1) as f32);
    let y = y.clamp(0.0, (rows - 1) as f32);

    let (x0, y0) = (x.floor() as usize, y.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(cols - 1), (y0 + 1).min(rows - 1));
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let top = m[(y0, x0)] * (1.0 - fx) + m[(y0, x1)] * fx;
    let bottom = m[(y1, x0)] * (1.0 - fx) + m[(y1, x1)] * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Image pyramid as `(scale, image)` pairs, `scale` mapping level coordinates back to level 0.
/// Stops early once a level would drop below `min_side` pixels.
pub(crate) fn pyramid(
    image: &GrayImage,
    levels: usize,
    scale_factor: f32,
    min_side: u32,
) -> Vec<(f32, GrayImage)> {
    let mut pyramid = vec![(1.0, image.clone())];

    for level in 1..levels {
        let scale = scale_factor.powi(level as i32);
        let width = (image.width() as f32 / scale).round() as u32;
        let height = (image.height() as f32 / scale).round() as u32;
        if width < min_side || height < min_side {
            break;
        }
        pyramid.push((
            scale,
            imageops::resize(image, width, height, imageops::FilterType::Triangle),
        ));
    }

    pyramid
}

/// FAST-9 corners with score based non-maximum suppression over a 3x3 neighbourhood
pub(crate) fn fast_corners(image: &GrayImage, threshold: u8) -> Vec<(u32, u32, f32)> {
    let corners = corners_fast9(image, threshold);

    let mut scores = DMatrix::<f32>::zeros(image.height() as usize, image.width() as usize);
    for corner in &corners {
        scores[(corner.y as usize, corner.x as usize)] = corner.score;
    }

    let mut kept: Vec<_> = local_maxima(&scores, 1, 0.0)
        .into_iter()
        .map(|(x, y, score)| (x as u32, y as u32, score))
        .collect();

    // corners on the outermost ring have no complete neighbourhood
    let (w, h) = (image.width(), image.height());
    kept.retain(|&(x, y, _)| x > 0 && y > 0 && x + 1 < w && y + 1 < h);
    kept
}

/// Drops keypoints closer than `border(keypoint)` pixels to any image edge
pub(crate) fn retain_within_border(
    keypoints: &mut Vec<Keypoint>,
    width: u32,
    height: u32,
    border: impl Fn(&Keypoint) -> f32,
) {
    keypoints.retain(|kp| {
        let b = border(kp);
        kp.x() >= b && kp.y() >= b && kp.x() < width as f32 - b && kp.y() < height as f32 - b
    });
}

#[cfg(test)]
pub(crate) mod test_images {
    use image::{GrayImage, Luma};

    /// Dark background with bright axis-aligned squares, giving strong corners
    pub fn squares(width: u32, height: u32, offset: (u32, u32)) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let (x, y) = (x + 1000 - offset.0, y + 1000 - offset.1);
            let inside = (x % 40) >= 12 && (x % 40) < 28 && (y % 40) >= 12 && (y % 40) < 28;
            let tint = ((x / 40 * 37 + y / 40 * 91) % 60) as u8;
            Luma([if inside { 190 + tint } else { 20 + tint / 4 }])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_sum_clips_at_borders() {
        let m = DMatrix::<f32>::from_element(4, 5, 1.0);
        let sums = box_sum(&m, 1);
        assert_eq!(sums[(0, 0)], 4.0);
        assert_eq!(sums[(1, 1)], 9.0);
        assert_eq!(sums[(3, 4)], 4.0);
    }

    #[test]
    fn box_sum_weights_every_cell_once() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let sums = box_sum(&m, 1);
        assert_relative_eq!(sums[(1, 1)], 45.0);
        assert_relative_eq!(sums[(0, 0)], 12.0);
        assert_relative_eq!(sums[(2, 1)], 39.0);
    }

    #[test]
    fn plateau_keeps_first_pixel() {
        let mut m = DMatrix::<f32>::zeros(5, 5);
        m[(2, 2)] = 3.0;
        m[(2, 3)] = 3.0;
        let maxima = local_maxima(&m, 1, 0.0);
        assert_eq!(maxima, vec![(2, 2, 3.0)]);
    }

    #[test]
    fn bilinear_sampling() {
        let m = DMatrix::from_row_slice(2, 2, &[0.0, 10.0, 20.0, 30.0]);
        assert_relative_eq!(sample(&m, 0.5, 0.5), 15.0);
        assert_relative_eq!(sample(&m, -3.0, 0.0), 0.0);
        assert_relative_eq!(sample(&m, 1.0, 1.0), 30.0);
    }

    #[test]
    fn pyramid_stops_at_min_side() {
        let image = GrayImage::new(64, 48);
        let levels = pyramid(&image, 8, 2.0, 10);
        let sizes: Vec<_> = levels.iter().map(|(_, i)| i.dimensions()).collect();
        assert_eq!(sizes, vec![(64, 48), (32, 24), (16, 12)]);
        assert_relative_eq!(levels[2].0, 4.0);
    }

    #[test]
    fn fast_finds_square_corners() {
        let image = test_images::squares(160, 120, (0, 0));
        let corners = fast_corners(&image, 30);
        assert!(!corners.is_empty());
        // every square has its top-left corner at (12, 12) modulo 40
        assert!(corners
            .iter()
            .any(|&(x, y, _)| (x % 40).abs_diff(12) <= 2 && (y % 40).abs_diff(12) <= 2));
    }
}
