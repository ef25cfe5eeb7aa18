use std::path::{Path, PathBuf};

use image::{GenericImage, ImageResult, Pixel, RgbImage};
use imageproc::drawing;
use once_cell::sync::Lazy;

use crate::{
    features::{DescriptorKind, DetectorKind},
    frame::FrameRecord,
};

/// Previous frame on the left, current frame on the right, keypoints circled
/// and every match joined by a line.
pub fn render_matches(previous: &FrameRecord, current: &FrameRecord) -> ImageResult<RgbImage> {
    let (left, right) = (previous.image(), current.image());
    let offset = left.width();
    let mut canvas = RgbImage::new(offset + right.width(), left.height().max(right.height()));

    canvas.copy_from(&image::DynamicImage::ImageLuma8(left.clone()).to_rgb8(), 0, 0)?;
    canvas.copy_from(&image::DynamicImage::ImageLuma8(right.clone()).to_rgb8(), offset, 0)?;

    let shift = offset as f32;
    for kp in &previous.keypoints {
        drawing::draw_hollow_circle_mut(&mut canvas, (kp.x() as _, kp.y() as _), 3, *GREEN);
    }
    for kp in &current.keypoints {
        let center = ((kp.x() + shift) as _, kp.y() as _);
        drawing::draw_hollow_circle_mut(&mut canvas, center, 3, *GREEN);
    }

    for m in &current.matches {
        let (from, to) = (&previous.keypoints[m.previous], &current.keypoints[m.current]);
        drawing::draw_line_segment_mut(
            &mut canvas,
            (from.x(), from.y()),
            (to.x() + shift, to.y()),
            *BLUE,
        );
    }

    Ok(canvas)
}

/// `<dir>/<DET>_<DESC>_<index>.png`
pub fn output_path(
    dir: &Path,
    detector: DetectorKind,
    descriptor: DescriptorKind,
    index: usize,
) -> PathBuf {
    dir.join(format!("{detector}_{descriptor}_{index}.png"))
}

static GREEN: Lazy<image::Rgb<u8>> = Lazy::new(|| *image::Rgb::from_slice(&[0, 255, 0]));
static BLUE: Lazy<image::Rgb<u8>> = Lazy::new(|| *image::Rgb::from_slice(&[0, 0, 255]));
