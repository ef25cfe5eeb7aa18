use nalgebra::Vector2;

/// A detected point of interest.
///
/// Only `position` is interpreted by the pipeline. The remaining fields are
/// detector-specific payload handed back to the extractors untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Keypoint {
    /// Sub-pixel location in image coordinates `(x, y)`
    pub position: Vector2<f32>,
    /// Diameter of the meaningful neighbourhood around the keypoint
    pub size: f32,
    /// Orientation in radians, if the detector computes one
    pub angle: Option<f32>,
    /// Detector score, `0.0` for detectors that do not report one
    pub response: f32,
    /// Pyramid octave the keypoint was found on
    pub octave: Option<usize>,
    /// Scale-space layer, set only by detectors that build an evolution
    /// the matching extractor must sample from
    pub layer: Option<usize>,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            position: Vector2::new(x, y),
            size,
            angle: None,
            response: 0.0,
            octave: None,
            layer: None,
        }
    }

    pub fn with_response(mut self, response: f32) -> Self {
        self.response = response;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn with_octave(mut self, octave: usize) -> Self {
        self.octave = Some(octave);
        self
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.position.y
    }
}
