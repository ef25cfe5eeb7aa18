use image::GrayImage;

use crate::{
    config::SequenceConfig,
    error::{BenchError, Result},
};

/// Provides the grayscale frame for a sequence index
pub trait ImageSource {
    fn load(&self, index: usize) -> Result<GrayImage>;
}

/// Numbered image files on disk
#[derive(Debug, Clone)]
pub struct ImageSequence {
    config: SequenceConfig,
}

impl ImageSequence {
    pub fn new(config: SequenceConfig) -> Self {
        Self { config }
    }
}

impl ImageSource for ImageSequence {
    fn load(&self, index: usize) -> Result<GrayImage> {
        let path = self.config.path_of(index);
        if !path.is_file() {
            return Err(BenchError::ImageNotFound { index, path });
        }

        match image::open(&path) {
            Ok(image) => Ok(image.to_luma8()),
            Err(source) => Err(BenchError::ImageLoad {
                index,
                path,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn sequence_in(dir: PathBuf) -> ImageSequence {
        ImageSequence::new(SequenceConfig {
            base_path: dir,
            prefix: "frame_".to_owned(),
            fill_width: 3,
            extension: ".png".to_owned(),
            start: 0,
            end: 1,
        })
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("keypoint-bench-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_grayscale_frames() {
        let dir = scratch_dir("load");
        let rgb = image::RgbImage::from_pixel(8, 6, image::Rgb([200, 200, 200]));
        rgb.save(dir.join("frame_000.png")).unwrap();

        let frame = sequence_in(dir.clone()).load(0).unwrap();
        assert_eq!(frame.dimensions(), (8, 6));
        assert_eq!(frame.get_pixel(3, 3)[0], 200);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_frame() {
        let dir = scratch_dir("missing");
        let err = sequence_in(dir.clone()).load(1).unwrap_err();
        assert!(matches!(
            err,
            BenchError::ImageNotFound { index: 1, ref path } if path.ends_with("frame_001.png")
        ));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn corrupt_frame() {
        let dir = scratch_dir("corrupt");
        std::fs::write(dir.join("frame_000.png"), b"not a png").unwrap();

        let err = sequence_in(dir.clone()).load(0).unwrap_err();
        assert!(matches!(err, BenchError::ImageLoad { index: 0, .. }));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
