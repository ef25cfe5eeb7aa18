//! Spatial filtering and count limiting of detected keypoints.

use crate::features::Keypoint;

/// Axis-aligned rectangle in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionOfInterest {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionOfInterest {
    /// Preceding vehicle in the KITTI sequence
    pub const VEHICLE: RegionOfInterest = RegionOfInterest::new(535, 180, 180, 150);

    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict containment, points on the boundary are outside
    pub fn contains(&self, px: f32, py: f32) -> bool {
        let (x, y) = (self.x as f32, self.y as f32);
        x < px && px < x + self.width as f32 && y < py && py < y + self.height as f32
    }

    /// Keypoints strictly inside the region, in their original order
    pub fn filter(&self, keypoints: &[Keypoint]) -> Vec<Keypoint> {
        keypoints
            .iter()
            .filter(|kp| self.contains(kp.x(), kp.y()))
            .cloned()
            .collect()
    }
}

/// Keeps at most `max` keypoints.
///
/// With `by_response` the strongest responses win and ties keep their original order,
/// otherwise the leading `max` keypoints are kept as they are.
pub fn retain_best(keypoints: &mut Vec<Keypoint>, max: usize, by_response: bool) {
    if keypoints.len() <= max {
        return;
    }
    if by_response {
        // stable, so equal responses stay in detection order
        keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));
    }
    keypoints.truncate(max);
}
